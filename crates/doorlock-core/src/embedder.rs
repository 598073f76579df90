//! Seam to the face embedding capability.
//!
//! Detection and encoding live behind [`FaceEmbedder`]: in process on ONNX
//! Runtime, or in a separate embedding service. This crate only consumes
//! the resulting vectors.

use crate::types::Embedding;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
    #[error("embedding service protocol error: {0}")]
    Protocol(String),
    #[error("embedding service rejected frame: {0}")]
    Rejected(String),
    #[error("face inference failed: {0}")]
    Inference(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces one embedding per detected face, in detection order.
///
/// An empty vector means no face was found in the image.
pub trait FaceEmbedder {
    fn embed(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EmbedError>;
}

impl<E: FaceEmbedder + ?Sized> FaceEmbedder for Box<E> {
    fn embed(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EmbedError> {
        (**self).embed(image)
    }
}
