//! Actuator link protocol — newline-delimited ASCII tokens to and from the lock board.

use std::collections::VecDeque;
use std::fmt;

pub const TOKEN_FINGER_OK: &str = "FINGER_OK";
pub const TOKEN_FINGER_FAIL: &str = "FINGER_FAIL";
pub const TOKEN_FACE_OK: &str = "FACE_OK";
pub const TOKEN_FACE_FAIL: &str = "FACE_FAIL";

/// Inbound line from the microcontroller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    FingerOk,
    FingerFail,
    /// Any other non-empty line (status chatter from the board).
    Status(String),
}

impl LinkEvent {
    /// Decode one line. Surrounding whitespace (including `\r`) is ignored;
    /// blank lines decode to `None`.
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            TOKEN_FINGER_OK => Some(Self::FingerOk),
            TOKEN_FINGER_FAIL => Some(Self::FingerFail),
            other => Some(Self::Status(other.to_string())),
        }
    }
}

/// Outbound command to the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Face verified: open the lock.
    Accept,
    /// Face rejected or timed out.
    Reject,
}

impl Command {
    pub fn token(self) -> &'static str {
        match self {
            Self::Accept => TOKEN_FACE_OK,
            Self::Reject => TOKEN_FACE_FAIL,
        }
    }

    /// Wire form: token followed by a newline.
    pub fn encode(self) -> String {
        format!("{}\n", self.token())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Best-effort channel to the lock board.
///
/// `send` never fails from the caller's point of view; `poll` never blocks.
pub trait ActuatorLink {
    fn send(&mut self, command: Command);
    fn poll(&mut self) -> Option<LinkEvent>;
}

impl<L: ActuatorLink + ?Sized> ActuatorLink for Box<L> {
    fn send(&mut self, command: Command) {
        (**self).send(command)
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        (**self).poll()
    }
}

/// Stand-in used when the serial device is unavailable.
pub struct NullLink;

impl ActuatorLink for NullLink {
    fn send(&mut self, command: Command) {
        tracing::debug!(%command, "link disabled; command dropped");
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        None
    }
}

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_LEN: usize = 1024;

/// Accumulates raw bytes and yields complete decoded lines.
///
/// A line longer than [`MAX_LINE_LEN`] is dropped in full, up to and
/// including its newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
    overflowed: bool,
    ready: VecDeque<LinkEvent>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the port.
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                if std::mem::take(&mut self.overflowed) {
                    continue;
                }
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                if let Some(event) = LinkEvent::decode(&line) {
                    self.ready.push_back(event);
                }
            } else if self.overflowed {
                continue;
            } else if self.partial.len() >= MAX_LINE_LEN {
                tracing::warn!(limit = MAX_LINE_LEN, "link line too long; dropped");
                self.partial.clear();
                self.overflowed = true;
            } else {
                self.partial.push(b);
            }
        }
    }

    /// Next complete line, oldest first.
    pub fn pop(&mut self) -> Option<LinkEvent> {
        self.ready.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tokens() {
        assert_eq!(LinkEvent::decode("FINGER_OK"), Some(LinkEvent::FingerOk));
        assert_eq!(LinkEvent::decode("FINGER_FAIL\r"), Some(LinkEvent::FingerFail));
        assert_eq!(
            LinkEvent::decode("  Door locked "),
            Some(LinkEvent::Status("Door locked".into()))
        );
        assert_eq!(LinkEvent::decode("\r"), None);
    }

    #[test]
    fn test_decode_is_case_sensitive() {
        assert_eq!(
            LinkEvent::decode("finger_ok"),
            Some(LinkEvent::Status("finger_ok".into()))
        );
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::Accept.encode(), "FACE_OK\n");
        assert_eq!(Command::Reject.encode(), "FACE_FAIL\n");
    }

    #[test]
    fn test_line_buffer_split_across_reads() {
        let mut buf = LineBuffer::new();
        buf.push(b"FING");
        assert_eq!(buf.pop(), None);
        buf.push(b"ER_OK\r\nready\n\nFINGER_");
        assert_eq!(buf.pop(), Some(LinkEvent::FingerOk));
        assert_eq!(buf.pop(), Some(LinkEvent::Status("ready".into())));
        assert_eq!(buf.pop(), None);
        buf.push(b"FAIL\n");
        assert_eq!(buf.pop(), Some(LinkEvent::FingerFail));
    }

    #[test]
    fn test_line_buffer_drops_overlong_line() {
        let mut buf = LineBuffer::new();
        buf.push(&vec![b'x'; MAX_LINE_LEN + 10]);
        assert!(buf.partial.len() <= MAX_LINE_LEN);
        buf.push(&vec![b'y'; 4096]);
        assert!(buf.partial.is_empty());

        buf.push(b"tail\nFINGER_OK\n");
        assert_eq!(buf.pop(), Some(LinkEvent::FingerOk));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn test_line_buffer_accepts_line_at_limit() {
        let mut buf = LineBuffer::new();
        let mut line = vec![b'z'; MAX_LINE_LEN];
        line.push(b'\n');
        buf.push(&line);
        assert!(matches!(buf.pop(), Some(LinkEvent::Status(s)) if s.len() == MAX_LINE_LEN));
    }

    #[test]
    fn test_null_link_is_silent() {
        let mut link = NullLink;
        link.send(Command::Accept);
        assert_eq!(link.poll(), None);
    }
}
