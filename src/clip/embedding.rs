use crate::error::EmbedError;

/// Output width of the ViT-B/32 projection. Every document carries exactly this many floats.
pub const EMBEDDING_DIM: usize = 512;

/// CLIP embedding (512-dimensional vector for ViT-B/32)
pub type ClipEmbedding = Vec<f32>;

pub fn zero_embedding() -> ClipEmbedding {
    vec![0.0; EMBEDDING_DIM]
}

/// Scale `raw` to unit Euclidean length.
///
/// The vector must have exactly `EMBEDDING_DIM` entries and a finite,
/// non-zero norm.
pub fn l2_normalize(raw: Vec<f32>) -> Result<ClipEmbedding, EmbedError> {
    if raw.len() != EMBEDDING_DIM {
        return Err(EmbedError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual: raw.len(),
        });
    }

    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm < 1e-12 {
        return Err(EmbedError::ZeroNorm);
    }

    Ok(raw.into_iter().map(|x| x / norm).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_normalized_has_unit_length() {
        let raw: Vec<f32> = (0..512).map(|i| (i as f32 * 0.37).sin() * 12.0).collect();
        let emb = l2_normalize(raw).unwrap();
        assert_eq!(emb.len(), 512);
        assert!((norm(&emb) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_direction_is_preserved() {
        let mut raw = vec![0.0; EMBEDDING_DIM];
        raw[0] = 3.0;
        raw[511] = 4.0;
        let emb = l2_normalize(raw).unwrap();
        assert!((emb[0] - 0.6).abs() < 1e-6);
        assert!((emb[511] - 0.8).abs() < 1e-6);
        assert!(emb[1..511].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let err = l2_normalize(vec![1.0; 768]).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch { expected: 512, actual: 768 }
        ));
        assert!(matches!(
            l2_normalize(Vec::new()),
            Err(EmbedError::DimensionMismatch { expected: 512, actual: 0 })
        ));
    }

    #[test]
    fn test_zero_and_nan_rejected() {
        assert!(matches!(
            l2_normalize(zero_embedding()),
            Err(EmbedError::ZeroNorm)
        ));

        let mut raw = vec![1.0; EMBEDDING_DIM];
        raw[7] = f32::NAN;
        assert!(matches!(l2_normalize(raw), Err(EmbedError::ZeroNorm)));
    }
}
