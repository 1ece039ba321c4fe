//! Vector similarity

/// Cosine similarity of `a` and `b`.
///
/// Only the shared prefix (the first `min(a.len(), b.len())` components) is
/// compared. Returns 0 when either prefix has zero norm. The result is clamped
/// to `[-1, 1]` to absorb floating point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a[..len].iter().zip(&b[..len]) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
