//! Face scan window — the capture/recognize/respond loop run after the
//! fingerprint step succeeds.

use crate::capture::CaptureSource;
use crate::embedder::FaceEmbedder;
use crate::journal::AccessJournal;
use crate::link::{ActuatorLink, Command};
use crate::recognizer::{recognize, Recognition};
use crate::session::ScanOutcome;
use crate::types::{Gallery, Matcher, UNKNOWN_IDENTITY};
use std::time::{Duration, Instant};

/// Default length of the face scan window.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    pub timeout: Duration,
    pub threshold: f32,
}

/// Run one scan window to completion.
///
/// Loops until a frame yields a detected face or `settings.timeout` elapses.
/// A detected face, matched or not, is journaled once and answered with one
/// command on the link. A timeout sends [`Command::Reject`] and journals
/// nothing. Capture and embedding errors count as frames without a face.
/// Journal failures are logged and do not change the outcome.
#[allow(clippy::too_many_arguments)]
pub fn run_face_scan<C, E, M, L, J>(
    camera: &mut C,
    embedder: &mut E,
    matcher: &M,
    link: &mut L,
    journal: &mut J,
    gallery: &Gallery,
    settings: ScanSettings,
) -> ScanOutcome
where
    C: CaptureSource + ?Sized,
    E: FaceEmbedder + ?Sized,
    M: Matcher + ?Sized,
    L: ActuatorLink + ?Sized,
    J: AccessJournal + ?Sized,
{
    let started = Instant::now();
    let mut frames = 0usize;

    loop {
        let result =
            evaluate_next_frame(camera, embedder, matcher, link, journal, gallery, settings);
        if let Some(outcome) = result {
            tracing::info!(
                frames = frames + 1,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ?outcome,
                "face scan finished"
            );
            return outcome;
        }
        frames += 1;

        if started.elapsed() > settings.timeout {
            tracing::info!(frames, "face scan timed out without a face");
            link.send(Command::Reject);
            return ScanOutcome::TimedOut;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_next_frame<C, E, M, L, J>(
    camera: &mut C,
    embedder: &mut E,
    matcher: &M,
    link: &mut L,
    journal: &mut J,
    gallery: &Gallery,
    settings: ScanSettings,
) -> Option<ScanOutcome>
where
    C: CaptureSource + ?Sized,
    E: FaceEmbedder + ?Sized,
    M: Matcher + ?Sized,
    L: ActuatorLink + ?Sized,
    J: AccessJournal + ?Sized,
{
    let frame = match camera.capture() {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "frame capture failed");
            return None;
        }
    };

    let recognition = match recognize(embedder, matcher, &frame, gallery, settings.threshold) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "embedding failed; frame treated as faceless");
            return None;
        }
    };

    let (identity, command, outcome) = match recognition {
        Recognition::NoFace => return None,
        Recognition::Match { name, distance } => (
            name.clone(),
            Command::Accept,
            ScanOutcome::Accepted {
                identity: name,
                distance,
            },
        ),
        Recognition::Unknown { distance } => (
            UNKNOWN_IDENTITY.to_string(),
            Command::Reject,
            ScanOutcome::Rejected { distance },
        ),
    };

    if let Err(e) = journal.record(&identity, &frame) {
        tracing::error!(error = %e, identity = %identity, "access log write failed");
    }
    link.send(command);
    Some(outcome)
}
