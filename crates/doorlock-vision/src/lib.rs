//! In-process face embedding: SCRFD detection, landmark alignment and
//! ArcFace encoding on ONNX Runtime.

pub mod align;
pub mod detector;
pub mod encoder;

use doorlock_core::{EmbedError, Embedding, FaceEmbedder};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use detector::{FaceBox, FaceDetector};
pub use encoder::FaceEncoder;

/// Euclidean acceptance threshold for unit-length ArcFace embeddings
/// (cosine similarity 0.40).
pub const ARCFACE_MATCH_THRESHOLD: f32 = 1.1;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("onnx runtime: {0}")]
    Ort(#[from] ort::Error),
}

impl From<VisionError> for EmbedError {
    fn from(err: VisionError) -> Self {
        EmbedError::Inference(err.to_string())
    }
}

pub struct OnnxEmbedder {
    detector: FaceDetector,
    encoder: FaceEncoder,
}

impl OnnxEmbedder {
    pub fn load(detector_model: &Path, encoder_model: &Path) -> Result<Self, VisionError> {
        Ok(Self {
            detector: FaceDetector::load(detector_model)?,
            encoder: FaceEncoder::load(encoder_model)?,
        })
    }
}

impl FaceEmbedder for OnnxEmbedder {
    fn embed(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EmbedError> {
        let faces = self.detector.detect(image)?;

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in &faces {
            let Some(crop) = align::align_face(image, &face.landmarks) else {
                tracing::debug!(score = face.score, "degenerate landmarks; face skipped");
                continue;
            };
            embeddings.push(self.encoder.encode(&crop)?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_detector_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxEmbedder::load(&dir.path().join("det_10g.onnx"), &dir.path().join("w.onnx"))
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::ModelNotFound(p) if p.ends_with("det_10g.onnx")));
    }

    #[test]
    fn test_vision_error_becomes_embed_error() {
        let err: EmbedError = VisionError::Inference("bad tensor".into()).into();
        assert!(matches!(err, EmbedError::Inference(_)));
        assert!(err.to_string().contains("bad tensor"));
    }

    #[test]
    fn test_threshold_matches_cosine_cutoff() {
        // |a - b|² = 2 - 2·cos for unit vectors
        let cos = 1.0 - ARCFACE_MATCH_THRESHOLD.powi(2) / 2.0;
        assert!((cos - 0.395).abs() < 1e-3);
    }
}
