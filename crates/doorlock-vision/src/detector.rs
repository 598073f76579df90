//! SCRFD face detector.
//!
//! Frames are letterboxed into the 640×640 model input (anchored top-left),
//! decoded per stride, then reduced with greedy NMS.

use crate::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const INPUT_SIZE: usize = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const SCORE_THRESHOLD: f32 = 0.5;
const NMS_IOU_THRESHOLD: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

/// Output slots `[score, bbox, kps]` per stride when tensor names carry no hint.
const POSITIONAL_LAYOUT: [[usize; 3]; 3] = [[0, 3, 6], [1, 4, 7], [2, 5, 8]];

/// A detected face in frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    /// Left eye, right eye, nose, left mouth corner, right mouth corner.
    pub landmarks: [(f32, f32); 5],
}

impl FaceBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &FaceBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// Raw head outputs for one stride.
struct StrideOutput<'a> {
    stride: usize,
    scores: &'a [f32],
    boxes: &'a [f32],
    kps: &'a [f32],
}

pub struct FaceDetector {
    session: Session,
    layout: [[usize; 3]; 3],
}

impl FaceDetector {
    pub fn load(model_path: &Path) -> Result<Self, VisionError> {
        if !model_path.exists() {
            return Err(VisionError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        if names.len() < 9 {
            return Err(VisionError::Inference(format!(
                "detector needs 9 outputs (score/bbox/kps per stride), model has {}",
                names.len()
            )));
        }

        let layout = output_layout(&names);
        tracing::info!(path = %model_path.display(), outputs = ?names, ?layout, "loaded SCRFD model");

        Ok(Self { session, layout })
    }

    /// Faces in `frame`, highest score first.
    pub fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceBox>, VisionError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let (input, scale) = letterbox(frame);
        let layout = self.layout;
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut faces = Vec::new();
        for (slot, &stride) in STRIDES.iter().enumerate() {
            let [score_idx, box_idx, kps_idx] = layout[slot];
            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Inference(format!("scores/{stride}: {e}")))?;
            let (_, boxes) = outputs[box_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Inference(format!("boxes/{stride}: {e}")))?;
            let (_, kps) = outputs[kps_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Inference(format!("landmarks/{stride}: {e}")))?;

            let head = StrideOutput {
                stride,
                scores,
                boxes,
                kps,
            };
            faces.extend(decode(&head, scale, SCORE_THRESHOLD));
        }

        let faces = suppress(faces, NMS_IOU_THRESHOLD);
        tracing::trace!(faces = faces.len(), "detection done");
        Ok(faces)
    }
}

/// Map stride slots to output indices, by `score_8`-style names when present.
fn output_layout(names: &[String]) -> [[usize; 3]; 3] {
    let find = |prefix: &str, stride: usize| {
        let wanted = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == wanted)
    };

    let named: Option<Vec<[usize; 3]>> = STRIDES
        .iter()
        .map(|&s| Some([find("score", s)?, find("bbox", s)?, find("kps", s)?]))
        .collect();

    named
        .and_then(|slots| slots.try_into().ok())
        .unwrap_or(POSITIONAL_LAYOUT)
}

/// Resize to fit the model input and normalise into an NCHW RGB tensor.
///
/// Returns the tensor and the resize factor; the padding region stays at
/// zero, which is the normalised mean.
fn letterbox(frame: &RgbImage) -> (Array4<f32>, f32) {
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let scale = (INPUT_SIZE as f32 / w).min(INPUT_SIZE as f32 / h);
    let new_w = ((w * scale).round() as u32).clamp(1, INPUT_SIZE as u32);
    let new_h = ((h * scale).round() as u32).clamp(1, INPUT_SIZE as u32);

    let resized = imageops::resize(frame, new_w, new_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
        }
    }
    (tensor, scale)
}

/// Decode anchors scoring above `threshold` back into frame coordinates.
fn decode(head: &StrideOutput<'_>, scale: f32, threshold: f32) -> Vec<FaceBox> {
    let grid = INPUT_SIZE / head.stride;
    let step = head.stride as f32;
    let mut faces = Vec::new();

    for idx in 0..grid * grid * ANCHORS_PER_CELL {
        let score = head.scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }
        let (Some(d), Some(k)) = (
            head.boxes.get(idx * 4..idx * 4 + 4),
            head.kps.get(idx * 10..idx * 10 + 10),
        ) else {
            continue;
        };

        let cell = idx / ANCHORS_PER_CELL;
        let cx = (cell % grid) as f32 * step;
        let cy = (cell / grid) as f32 * step;

        let mut landmarks = [(0.0, 0.0); 5];
        for (i, point) in landmarks.iter_mut().enumerate() {
            *point = (
                (cx + k[2 * i] * step) / scale,
                (cy + k[2 * i + 1] * step) / scale,
            );
        }

        faces.push(FaceBox {
            x1: (cx - d[0] * step) / scale,
            y1: (cy - d[1] * step) / scale,
            x2: (cx + d[2] * step) / scale,
            y2: (cy + d[3] * step) / scale,
            score,
            landmarks,
        });
    }

    faces
}

/// Greedy non-maximum suppression; result is sorted by score, descending.
fn suppress(mut faces: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    faces.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<FaceBox> = Vec::with_capacity(faces.len());
    for face in faces {
        if kept.iter().all(|k| k.iou(&face) <= iou_threshold) {
            kept.push(face);
        }
    }
    kept
}
