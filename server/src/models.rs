use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub(crate) struct LiveResponse {
    pub(crate) status: &'static str,
    pub(crate) uptime_ms: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadyChecks {
    pub(crate) storage_available: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadyResponse {
    pub(crate) status: &'static str,
    pub(crate) uptime_ms: u64,
    pub(crate) entry_count: usize,
    pub(crate) checks: ReadyChecks,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteEntryResponse {
    pub(crate) id: Uuid,
    pub(crate) deleted: bool,
}
