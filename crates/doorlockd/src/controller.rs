use crate::console::{OperatorCommand, Panel};
use doorlock_core::scan::{run_face_scan, ScanSettings};
use doorlock_core::session::transition;
use doorlock_core::{
    AccessJournal, ActuatorLink, CaptureSource, EuclideanMatcher, FaceEmbedder, Gallery,
    LinkEvent, Screen, SessionEvent, SessionState,
};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

/// Everything the session touches, owned in one place.
pub struct Devices<C, E, L, J> {
    pub camera: C,
    pub embedder: E,
    pub link: L,
    pub journal: J,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub scan: ScanSettings,
    pub face_scan_delay: Duration,
    pub poll_interval: Duration,
}

/// Single-threaded session controller.
///
/// Each tick handles at most one operator command and one link line; when
/// the session reaches `AwaitingFace` the scan runs to completion on the
/// same thread before the next tick.
pub struct Controller<C, E, L, J, P> {
    devices: Devices<C, E, L, J>,
    gallery: Gallery,
    settings: ControllerSettings,
    panel: P,
    state: SessionState,
    screen: Screen,
}

impl<C, E, L, J, P> Controller<C, E, L, J, P>
where
    C: CaptureSource,
    E: FaceEmbedder,
    L: ActuatorLink,
    J: AccessJournal,
    P: Panel,
{
    pub fn new(
        devices: Devices<C, E, L, J>,
        gallery: Gallery,
        settings: ControllerSettings,
        panel: P,
    ) -> Self {
        Self {
            devices,
            gallery,
            settings,
            panel,
            state: SessionState::Idle,
            screen: Screen::Start { message: None },
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Poll until the operator quits.
    pub fn run(&mut self, operator: &Receiver<OperatorCommand>) {
        self.panel.show(&self.screen);
        let mut operator_open = true;

        loop {
            let mut start = false;
            if operator_open {
                match operator.try_recv() {
                    Ok(OperatorCommand::Start) => start = true,
                    Ok(OperatorCommand::Quit) => {
                        tracing::debug!(state = ?self.state(), "operator quit");
                        return;
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => operator_open = false,
                }
            }

            self.tick(start);
            std::thread::sleep(self.settings.poll_interval);
        }
    }

    pub fn tick(&mut self, start_requested: bool) {
        if start_requested {
            self.apply(SessionEvent::Start);
        }

        match self.devices.link.poll() {
            Some(LinkEvent::FingerOk) => self.apply(SessionEvent::FingerOk),
            Some(LinkEvent::FingerFail) => self.apply(SessionEvent::FingerFail),
            Some(LinkEvent::Status(text)) => tracing::info!(status = %text, "lock board"),
            None => {}
        }

        if self.state == SessionState::AwaitingFace {
            self.scan();
        }
    }

    fn scan(&mut self) {
        if !self.settings.face_scan_delay.is_zero() {
            std::thread::sleep(self.settings.face_scan_delay);
        }

        let Devices {
            camera,
            embedder,
            link,
            journal,
        } = &mut self.devices;

        let outcome = run_face_scan(
            camera,
            embedder,
            &EuclideanMatcher,
            link,
            journal,
            &self.gallery,
            self.settings.scan,
        );
        self.apply(SessionEvent::ScanFinished(outcome));
    }

    fn apply(&mut self, event: SessionEvent) {
        let t = transition(self.state, event);
        if t.next != self.state {
            tracing::info!(from = ?self.state, to = ?t.next, "session transition");
        }
        self.state = t.next;
        if let Some(screen) = t.screen {
            self.panel.show(&screen);
            self.screen = screen;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorlock_core::session::{MSG_FACE_TIMEOUT, MSG_FACE_UNKNOWN, MSG_FINGERPRINT_FAILED};
    use doorlock_core::testing::{FakeEmbedder, MemoryJournal, RecordingLink, ScriptedCamera};
    use doorlock_core::{Command, Embedding, Identity};

    const NOBODY: u8 = 0;
    const ALICE: u8 = 1;
    const STRANGER: u8 = 2;

    #[derive(Default)]
    struct RecordingPanel(Vec<Screen>);

    impl Panel for RecordingPanel {
        fn show(&mut self, screen: &Screen) {
            self.0.push(screen.clone());
        }
    }

    type TestController =
        Controller<ScriptedCamera, FakeEmbedder, RecordingLink, MemoryJournal, RecordingPanel>;

    fn controller(subject: u8, inbound: Vec<LinkEvent>) -> TestController {
        let gallery = Gallery::new(vec![Identity {
            name: "alice".into(),
            embedding: Embedding::new(vec![0.9, 0.0]),
        }]);
        let embedder = FakeEmbedder::default()
            .with_faces(ALICE, vec![Embedding::new(vec![1.0, 0.0])])
            .with_faces(STRANGER, vec![Embedding::new(vec![-1.0, 0.0])]);
        Controller::new(
            Devices {
                camera: ScriptedCamera::still(subject),
                embedder,
                link: RecordingLink {
                    inbound: inbound.into(),
                    ..Default::default()
                },
                journal: MemoryJournal::default(),
            },
            gallery,
            ControllerSettings {
                scan: ScanSettings {
                    timeout: Duration::from_millis(30),
                    threshold: 0.6,
                },
                face_scan_delay: Duration::ZERO,
                poll_interval: Duration::ZERO,
            },
            RecordingPanel::default(),
        )
    }

    #[test]
    fn test_start_then_fingerprint_then_match() {
        let mut c = controller(ALICE, vec![]);
        c.tick(true);
        assert_eq!(c.state(), SessionState::AwaitingSecondFactor);
        assert_eq!(&c.screen, &Screen::WaitFingerprint);
        assert_eq!(c.devices.camera.captured, 0);

        c.devices.link.inbound.push_back(LinkEvent::FingerOk);
        c.tick(false);

        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.devices.link.sent, vec![Command::Accept]);
        assert_eq!(c.devices.journal.recorded, vec!["alice".to_string()]);
        assert_eq!(
            c.panel.0,
            vec![
                Screen::WaitFingerprint,
                Screen::FaceScan,
                Screen::Start {
                    message: Some("Access granted: alice".into())
                },
            ]
        );
    }

    #[test]
    fn test_finger_ok_from_idle_times_out_without_face() {
        let mut c = controller(NOBODY, vec![LinkEvent::FingerOk]);
        c.tick(false);

        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.devices.link.sent, vec![Command::Reject]);
        assert!(c.devices.journal.recorded.is_empty());
        assert!(c.devices.embedder.calls > 0);
        assert_eq!(
            &c.screen,
            &Screen::Start {
                message: Some(MSG_FACE_TIMEOUT.into())
            }
        );
    }

    #[test]
    fn test_unknown_face_logged_and_rejected() {
        let mut c = controller(STRANGER, vec![LinkEvent::FingerOk]);
        c.tick(false);

        assert_eq!(c.devices.link.sent, vec![Command::Reject]);
        assert_eq!(c.devices.journal.recorded, vec!["Unknown".to_string()]);
        assert_eq!(
            &c.screen,
            &Screen::Start {
                message: Some(MSG_FACE_UNKNOWN.into())
            }
        );
    }

    #[test]
    fn test_fingerprint_failure_returns_to_start() {
        let mut c = controller(ALICE, vec![LinkEvent::FingerFail]);
        c.tick(true);

        assert_eq!(c.state(), SessionState::Idle);
        assert!(c.devices.link.sent.is_empty());
        assert_eq!(c.devices.camera.captured, 0);
        assert_eq!(
            &c.screen,
            &Screen::Start {
                message: Some(MSG_FINGERPRINT_FAILED.into())
            }
        );
    }

    #[test]
    fn test_status_lines_do_not_change_state() {
        let mut c = controller(ALICE, vec![LinkEvent::Status("door closed".into())]);
        c.tick(false);
        assert_eq!(c.state(), SessionState::Idle);
        assert!(c.panel.0.is_empty());
    }

    #[test]
    fn test_run_exits_on_quit() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(OperatorCommand::Start).unwrap();
        tx.send(OperatorCommand::Quit).unwrap();

        let mut c = controller(ALICE, vec![]);
        c.run(&rx);
        assert_eq!(c.state(), SessionState::AwaitingSecondFactor);
    }
}
