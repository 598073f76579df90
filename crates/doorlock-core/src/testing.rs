//! In-process doubles for the device seams.
//!
//! Compiled for this crate's unit tests and, behind the `test-support`
//! feature, for downstream crates' tests.

use crate::capture::CaptureSource;
use crate::embedder::{EmbedError, FaceEmbedder};
use crate::journal::{AccessJournal, JournalError};
use crate::link::{ActuatorLink, Command, LinkEvent};
use crate::types::Embedding;
use image::{Rgb, RgbImage};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// 4x4 image filled with one grey level; the level keys [`FakeEmbedder`] lookups.
pub fn solid_image(level: u8) -> RgbImage {
    RgbImage::from_pixel(4, 4, Rgb([level, level, level]))
}

#[derive(Error, Debug)]
#[error("camera unplugged")]
pub struct CameraUnplugged;

/// Replays scripted frames, then repeats the fallback subject forever.
pub struct ScriptedCamera {
    pub frames: VecDeque<Result<RgbImage, CameraUnplugged>>,
    pub fallback: u8,
    pub captured: usize,
}

impl ScriptedCamera {
    pub fn new(levels: &[u8], fallback: u8) -> Self {
        Self {
            frames: levels.iter().map(|&l| Ok(solid_image(l))).collect(),
            fallback,
            captured: 0,
        }
    }

    /// Camera that shows the same subject on every frame.
    pub fn still(level: u8) -> Self {
        Self::new(&[], level)
    }
}

impl CaptureSource for ScriptedCamera {
    type Error = CameraUnplugged;

    fn capture(&mut self) -> Result<RgbImage, CameraUnplugged> {
        self.captured += 1;
        self.frames
            .pop_front()
            .unwrap_or_else(|| Ok(solid_image(self.fallback)))
    }
}

/// Embedder that answers by the red channel of pixel (0, 0).
#[derive(Default)]
pub struct FakeEmbedder {
    faces: HashMap<u8, Vec<Embedding>>,
    failing: Vec<u8>,
    pub calls: usize,
}

impl FakeEmbedder {
    pub fn with_faces(mut self, level: u8, faces: Vec<Embedding>) -> Self {
        self.faces.insert(level, faces);
        self
    }

    pub fn failing_on(mut self, level: u8) -> Self {
        self.failing.push(level);
        self
    }
}

impl FaceEmbedder for FakeEmbedder {
    fn embed(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EmbedError> {
        self.calls += 1;
        let level = image.get_pixel(0, 0)[0];
        if self.failing.contains(&level) {
            return Err(EmbedError::Unavailable("fake outage".into()));
        }
        Ok(self.faces.get(&level).cloned().unwrap_or_default())
    }
}

/// Link that records sent commands and replays queued inbound events.
#[derive(Default)]
pub struct RecordingLink {
    pub sent: Vec<Command>,
    pub inbound: VecDeque<LinkEvent>,
}

impl ActuatorLink for RecordingLink {
    fn send(&mut self, command: Command) {
        self.sent.push(command);
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        self.inbound.pop_front()
    }
}

/// Journal that keeps recorded identity names in memory.
#[derive(Default)]
pub struct MemoryJournal {
    pub recorded: Vec<String>,
    pub fail: bool,
}

impl AccessJournal for MemoryJournal {
    fn record(&mut self, identity: &str, _frame: &RgbImage) -> Result<(), JournalError> {
        if self.fail {
            return Err(JournalError::Snapshot(image::ImageError::IoError(
                std::io::Error::other("disk full"),
            )));
        }
        self.recorded.push(identity.to_string());
        Ok(())
    }
}
