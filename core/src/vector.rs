use wide::f32x8;

// Rounding can push a self-similarity marginally past 1.0.
fn clamp_cosine(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

const SIMD_WIDTH: usize = 8;

/// Pre-packed query representation for repeated cosine computations against
/// stored embeddings of the same length.
#[derive(Debug, Clone)]
pub struct PreparedCosineQuery {
    len: usize,
    simd_query: Vec<f32x8>,
    tail: [f32; SIMD_WIDTH],
    tail_len: usize,
    query_sq_sum: f32,
}

impl PreparedCosineQuery {
    /// Builds a reusable SIMD-packed query.
    pub fn new(query: &[f32]) -> Self {
        let mut chunks = query.chunks_exact(SIMD_WIDTH);
        let simd_query = chunks.by_ref().map(load_f32x8).collect();
        let remainder = chunks.remainder();

        let mut tail = [0.0f32; SIMD_WIDTH];
        tail[..remainder.len()].copy_from_slice(remainder);

        Self {
            len: query.len(),
            simd_query,
            tail,
            tail_len: remainder.len(),
            query_sq_sum: simd_dot(query, query),
        }
    }

    /// Computes cosine similarity against a same-length vector.
    ///
    /// Returns `None` when the lengths differ or when one of the norms is at
    /// or below `zero_norm_epsilon.max(0.0)`.
    pub fn cosine(&self, right: &[f32], zero_norm_epsilon: f32) -> Option<f32> {
        if right.len() != self.len {
            return None;
        }
        let epsilon = zero_norm_epsilon.max(0.0);
        let (dot, right_sq_sum) = self.dot_and_right_sq_sum(right);
        if self.query_sq_sum <= epsilon || right_sq_sum <= epsilon {
            return None;
        }
        Some(clamp_cosine(
            dot / (self.query_sq_sum.sqrt() * right_sq_sum.sqrt()),
        ))
    }

    fn dot_and_right_sq_sum(&self, right: &[f32]) -> (f32, f32) {
        let simd_chunks = self.simd_query.len();
        let simd_prefix_len = simd_chunks * SIMD_WIDTH;
        let right_prefix = &right[..simd_prefix_len];

        let mut dot_sum0 = f32x8::ZERO;
        let mut dot_sum1 = f32x8::ZERO;
        let mut right_sq_sum0 = f32x8::ZERO;
        let mut right_sq_sum1 = f32x8::ZERO;
        let mut chunk_idx = 0usize;
        let mut offset = 0usize;

        while chunk_idx + 1 < simd_chunks {
            let right_v0 = load_f32x8(&right_prefix[offset..offset + SIMD_WIDTH]);
            dot_sum0 += self.simd_query[chunk_idx] * right_v0;
            right_sq_sum0 += right_v0 * right_v0;
            offset += SIMD_WIDTH;

            let right_v1 = load_f32x8(&right_prefix[offset..offset + SIMD_WIDTH]);
            dot_sum1 += self.simd_query[chunk_idx + 1] * right_v1;
            right_sq_sum1 += right_v1 * right_v1;
            offset += SIMD_WIDTH;

            chunk_idx += 2;
        }
        if chunk_idx < simd_chunks {
            let right_v = load_f32x8(&right_prefix[offset..offset + SIMD_WIDTH]);
            dot_sum0 += self.simd_query[chunk_idx] * right_v;
            right_sq_sum0 += right_v * right_v;
        }

        let mut dot_scalar = 0.0f32;
        let mut right_sq_scalar = 0.0f32;
        let right_tail = &right[simd_prefix_len..];
        for (index, right_value) in right_tail.iter().enumerate().take(self.tail_len) {
            dot_scalar += self.tail[index] * *right_value;
            right_sq_scalar += right_value * right_value;
        }

        (
            (dot_sum0 + dot_sum1).reduce_add() + dot_scalar,
            (right_sq_sum0 + right_sq_sum1).reduce_add() + right_sq_scalar,
        )
    }
}

fn load_f32x8(values: &[f32]) -> f32x8 {
    debug_assert_eq!(values.len(), SIMD_WIDTH);
    f32x8::from([
        values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7],
    ])
}

fn simd_scan(
    left: &[f32],
    right: &[f32],
    mut simd_step: impl FnMut(f32x8, f32x8),
    mut scalar_step: impl FnMut(f32, f32),
) {
    let mut left_chunks = left.chunks_exact(SIMD_WIDTH);
    let mut right_chunks = right.chunks_exact(SIMD_WIDTH);

    for (left_chunk, right_chunk) in left_chunks.by_ref().zip(right_chunks.by_ref()) {
        simd_step(load_f32x8(left_chunk), load_f32x8(right_chunk));
    }

    for (&left_value, &right_value) in left_chunks.remainder().iter().zip(right_chunks.remainder())
    {
        scalar_step(left_value, right_value);
    }
}

fn simd_dot(left: &[f32], right: &[f32]) -> f32 {
    let mut simd_sum = f32x8::ZERO;
    let mut scalar_sum = 0.0;

    simd_scan(
        left,
        right,
        |left_v, right_v| {
            simd_sum += left_v * right_v;
        },
        |left_value, right_value| {
            scalar_sum += left_value * right_value;
        },
    );

    simd_sum.reduce_add() + scalar_sum
}
