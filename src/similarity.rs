//! Cosine similarity primitives shared by the grouper and the CLI.

/// Euclidean norm of `vector`.
#[must_use]
pub fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between `a` and `b`.
///
/// Returns `0.0` when either vector has zero magnitude or when the lengths differ, so a
/// zero vector is never similar to anything, itself included.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, magnitude(a), b, magnitude(b))
}

/// Cosine similarity using precomputed norms.
#[must_use]
pub fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if a.len() != b.len() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
