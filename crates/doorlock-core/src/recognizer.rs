//! Recognizer — first detected face in a frame against the gallery.

use crate::embedder::{EmbedError, FaceEmbedder};
use crate::types::{Gallery, Matcher};
use image::RgbImage;

/// Outcome of evaluating one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// No face detected in the frame.
    NoFace,
    /// A face was detected but nobody in the gallery is close enough.
    Unknown { distance: Option<f32> },
    /// The closest gallery entry is within the acceptance threshold.
    Match { name: String, distance: f32 },
}

/// Embed `frame` and match its first face against `gallery`.
///
/// Additional faces in the same frame are ignored. An empty gallery always
/// yields [`Recognition::Unknown`] for a detected face.
pub fn recognize<E, M>(
    embedder: &mut E,
    matcher: &M,
    frame: &RgbImage,
    gallery: &Gallery,
    threshold: f32,
) -> Result<Recognition, EmbedError>
where
    E: FaceEmbedder + ?Sized,
    M: Matcher + ?Sized,
{
    let faces = embedder.embed(frame)?;
    let Some(query) = faces.first() else {
        return Ok(Recognition::NoFace);
    };

    if faces.len() > 1 {
        tracing::debug!(faces = faces.len(), "multiple faces in frame; using the first");
    }

    let result = matcher.compare(query, gallery, threshold);
    match (result.matched, result.identity, result.distance) {
        (true, Some(name), Some(distance)) => Ok(Recognition::Match { name, distance }),
        (_, _, distance) => Ok(Recognition::Unknown { distance }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{solid_image, FakeEmbedder};
    use crate::types::{Embedding, EuclideanMatcher, Identity, DEFAULT_MATCH_THRESHOLD};

    fn gallery() -> Gallery {
        Gallery::new(vec![
            Identity {
                name: "alice".into(),
                embedding: Embedding::new(vec![1.0, 0.0, 0.0]),
            },
            Identity {
                name: "bob".into(),
                embedding: Embedding::new(vec![0.0, 1.0, 0.0]),
            },
        ])
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let mut embedder =
            FakeEmbedder::default().with_faces(1, vec![Embedding::new(vec![1.0, 0.0, 0.0])]);
        let result = recognize(
            &mut embedder,
            &EuclideanMatcher,
            &solid_image(1),
            &Gallery::default(),
            DEFAULT_MATCH_THRESHOLD,
        )
        .unwrap();
        assert_eq!(result, Recognition::Unknown { distance: None });
    }

    #[test]
    fn test_known_face_within_threshold() {
        let mut embedder =
            FakeEmbedder::default().with_faces(1, vec![Embedding::new(vec![0.9, 0.1, 0.0])]);
        let result = recognize(
            &mut embedder,
            &EuclideanMatcher,
            &solid_image(1),
            &gallery(),
            DEFAULT_MATCH_THRESHOLD,
        )
        .unwrap();
        match result {
            Recognition::Match { name, distance } => {
                assert_eq!(name, "alice");
                assert!(distance < DEFAULT_MATCH_THRESHOLD);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_face_beyond_threshold_is_unknown() {
        let mut embedder =
            FakeEmbedder::default().with_faces(1, vec![Embedding::new(vec![0.0, 0.0, 1.0])]);
        let result = recognize(
            &mut embedder,
            &EuclideanMatcher,
            &solid_image(1),
            &gallery(),
            DEFAULT_MATCH_THRESHOLD,
        )
        .unwrap();
        assert!(matches!(result, Recognition::Unknown { distance: Some(d) } if d > DEFAULT_MATCH_THRESHOLD));
    }

    #[test]
    fn test_only_first_face_counts() {
        let mut embedder = FakeEmbedder::default().with_faces(
            1,
            vec![
                Embedding::new(vec![0.0, 0.0, 1.0]),
                Embedding::new(vec![1.0, 0.0, 0.0]),
            ],
        );
        let result = recognize(
            &mut embedder,
            &EuclideanMatcher,
            &solid_image(1),
            &gallery(),
            DEFAULT_MATCH_THRESHOLD,
        )
        .unwrap();
        assert!(matches!(result, Recognition::Unknown { .. }));
    }

    #[test]
    fn test_no_face() {
        let result = recognize(
            &mut FakeEmbedder::default(),
            &EuclideanMatcher,
            &solid_image(7),
            &gallery(),
            DEFAULT_MATCH_THRESHOLD,
        )
        .unwrap();
        assert_eq!(result, Recognition::NoFace);
    }

    #[test]
    fn test_embedder_error_propagates() {
        let mut embedder = FakeEmbedder::default().failing_on(3);
        let result = recognize(
            &mut embedder,
            &EuclideanMatcher,
            &solid_image(3),
            &gallery(),
            DEFAULT_MATCH_THRESHOLD,
        );
        assert!(result.is_err());
    }
}
