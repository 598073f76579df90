//! Two-factor session state machine.
//!
//! Pure transition function: the caller feeds events and renders the
//! returned [`Screen`]. No I/O happens here.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Start was requested; waiting for the fingerprint reader.
    AwaitingSecondFactor,
    /// Fingerprint accepted; the face scan window is open.
    AwaitingFace,
}

/// How a face scan window ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Accepted { identity: String, distance: f32 },
    /// A face was detected but matched nobody.
    Rejected { distance: Option<f32> },
    /// No face was detected before the window closed.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Operator asked to begin a session.
    Start,
    FingerOk,
    FingerFail,
    ScanFinished(ScanOutcome),
}

/// Render directive for the front panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Start { message: Option<String> },
    WaitFingerprint,
    FaceScan,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { message: None } => write!(f, "Smart Doorlock — press Start"),
            Self::Start { message: Some(m) } => write!(f, "Smart Doorlock — {m}"),
            Self::WaitFingerprint => write!(f, "Please scan your fingerprint..."),
            Self::FaceScan => write!(f, "Face recognition — please look at the camera"),
        }
    }
}

pub const MSG_FINGERPRINT_FAILED: &str = "Fingerprint failed, please try again.";
pub const MSG_FACE_UNKNOWN: &str = "Face recognition failed - unknown person";
pub const MSG_FACE_TIMEOUT: &str = "Timed out! Face recognition failed.";

impl ScanOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Accepted { identity, .. } => format!("Access granted: {identity}"),
            Self::Rejected { .. } => MSG_FACE_UNKNOWN.to_string(),
            Self::TimedOut => MSG_FACE_TIMEOUT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    /// `None` leaves the current screen in place.
    pub screen: Option<Screen>,
}

impl Transition {
    fn to(next: SessionState, screen: Screen) -> Self {
        Self {
            next,
            screen: Some(screen),
        }
    }

    fn stay(state: SessionState) -> Self {
        Self {
            next: state,
            screen: None,
        }
    }
}

pub fn transition(state: SessionState, event: SessionEvent) -> Transition {
    use SessionState::*;

    match (state, event) {
        (Idle, SessionEvent::Start) => Transition::to(AwaitingSecondFactor, Screen::WaitFingerprint),
        (Idle | AwaitingSecondFactor, SessionEvent::FingerOk) => {
            Transition::to(AwaitingFace, Screen::FaceScan)
        }
        (Idle | AwaitingSecondFactor, SessionEvent::FingerFail) => Transition::to(
            Idle,
            Screen::Start {
                message: Some(MSG_FINGERPRINT_FAILED.to_string()),
            },
        ),
        (AwaitingFace, SessionEvent::ScanFinished(outcome)) => Transition::to(
            Idle,
            Screen::Start {
                message: Some(outcome.message()),
            },
        ),
        (state, _) => Transition::stay(state),
    }
}
