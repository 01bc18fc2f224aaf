use crate::config::{Number, EPSILON};
use wide::f64x4;

/// Cosine similarity `dot(a, b) / (|a| * |b|)` using SIMD operations.
///
/// Sums are accumulated in f64 so very small or very large components neither
/// underflow nor overflow. Returns `None` when the vectors differ in length.
/// A zero-magnitude vector scores 0 against anything.
pub fn compute_cosine_similarity_simd(a: &[Number], b: &[Number]) -> Option<Number> {
    if a.len() != b.len() {
        tracing::debug!(a_len = a.len(), b_len = b.len(), "vector length mismatch");
        return None;
    }

    let mut dot_product = f64x4::splat(0.0);
    let mut mag_a = f64x4::splat(0.0);
    let mut mag_b = f64x4::splat(0.0);

    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let (rest_a, rest_b) = (chunks_a.remainder(), chunks_b.remainder());

    for (ca, cb) in chunks_a.zip(chunks_b) {
        let va = f64x4::new([ca[0] as f64, ca[1] as f64, ca[2] as f64, ca[3] as f64]);
        let vb = f64x4::new([cb[0] as f64, cb[1] as f64, cb[2] as f64, cb[3] as f64]);
        dot_product += va * vb;
        mag_a += va * va;
        mag_b += vb * vb;
    }

    let mut scalar_dot_product = dot_product.reduce_add();
    let mut scalar_mag_a = mag_a.reduce_add();
    let mut scalar_mag_b = mag_b.reduce_add();

    // Handle remaining elements
    for (&x, &y) in rest_a.iter().zip(rest_b) {
        let (x, y) = (x as f64, y as f64);
        scalar_dot_product += x * y;
        scalar_mag_a += x * x;
        scalar_mag_b += y * y;
    }

    if scalar_mag_a == 0.0 || scalar_mag_b == 0.0 {
        return Some(0.0);
    }

    let similarity = scalar_dot_product / (scalar_mag_a.sqrt() * scalar_mag_b.sqrt());
    if similarity.is_finite() {
        Some(similarity.clamp(-1.0, 1.0) as Number)
    } else {
        Some(0.0)
    }
}

pub fn normalize_vector(vector: &mut [Number]) {
    let magnitude: Number = vector.iter().map(|&x| x * x).sum::<Number>().sqrt();
    if magnitude > EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}
