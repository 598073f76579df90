//! doorlock-core — decision logic for the two-factor door lock.
//!
//! Matches face embeddings against a gallery of known identities, drives the
//! fingerprint → face session state machine, and records access events in
//! SQLite. Face detection and encoding are supplied by an external service
//! through [`FaceEmbedder`].

pub mod capture;
pub mod embedder;
pub mod enroll;
pub mod gallery;
pub mod journal;
pub mod link;
pub mod recognizer;
pub mod scan;
pub mod session;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use capture::CaptureSource;
pub use embedder::{EmbedError, FaceEmbedder};
pub use journal::{AccessJournal, SqliteJournal};
pub use link::{ActuatorLink, Command, LinkEvent, NullLink};
pub use session::{ScanOutcome, Screen, SessionEvent, SessionState};
pub use types::{Embedding, EuclideanMatcher, Gallery, Identity, MatchResult, Matcher};
