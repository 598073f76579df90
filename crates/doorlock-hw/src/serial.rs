//! Serial link to the lock microcontroller.
//!
//! The tty is put into raw 8N1 mode at the requested baud rate and opened
//! non-blocking, so [`ActuatorLink::poll`] never stalls the control loop.

use doorlock_core::link::LineBuffer;
use doorlock_core::{ActuatorLink, Command, LinkEvent};
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("cannot open serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
    #[error("termios: {0}")]
    Termios(#[from] nix::Error),
}

fn baud_rate(baud: u32) -> Result<BaudRate, LinkError> {
    Ok(match baud {
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        other => return Err(LinkError::UnsupportedBaud(other)),
    })
}

/// Line-oriented link over any byte port.
pub struct SerialLink<P> {
    port: P,
    lines: LineBuffer,
}

impl SerialLink<File> {
    /// Open and configure a tty (e.g. "/dev/ttyUSB0").
    ///
    /// Most boards reset when the port opens; `settle` is slept before the
    /// input queue is flushed so boot chatter is discarded.
    pub fn open(path: &str, baud: u32, settle: Duration) -> Result<Self, LinkError> {
        let speed = baud_rate(baud)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits() | OFlag::O_NONBLOCK.bits())
            .open(path)
            .map_err(|source| LinkError::Open {
                path: path.to_string(),
                source,
            })?;

        let mut tio = termios::tcgetattr(&file)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, speed)?;
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB);
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio)?;

        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        termios::tcflush(&file, FlushArg::TCIFLUSH)?;

        tracing::info!(path, baud, "serial link open");
        Ok(Self::new(file))
    }
}

impl<P: Read + Write> SerialLink<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            lines: LineBuffer::new(),
        }
    }

    /// Drain whatever bytes the port has ready.
    fn fill(&mut self) {
        let mut chunk = [0u8; 256];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.lines.push(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "serial read failed");
                    break;
                }
            }
        }
    }
}

impl<P: Read + Write> ActuatorLink for SerialLink<P> {
    fn send(&mut self, command: Command) {
        let wire = command.encode();
        match self
            .port
            .write_all(wire.as_bytes())
            .and_then(|_| self.port.flush())
        {
            Ok(()) => tracing::info!(%command, "serial command sent"),
            Err(e) => tracing::error!(%command, error = %e, "serial write failed"),
        }
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        if !self.lines.has_pending() {
            self.fill();
        }
        let event = self.lines.pop()?;
        tracing::debug!(?event, "serial line received");
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Port that hands out scripted read chunks, then reports `WouldBlock`.
    #[derive(Default)]
    struct ScriptedPort {
        reads: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        fail_writes: bool,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.reads.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail_writes {
                return Err(ErrorKind::BrokenPipe.into());
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_writes_token_and_newline() {
        let mut link = SerialLink::new(ScriptedPort::default());
        link.send(Command::Accept);
        link.send(Command::Reject);
        assert_eq!(link.port.written, b"FACE_OK\nFACE_FAIL\n");
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let mut link = SerialLink::new(ScriptedPort {
            fail_writes: true,
            ..Default::default()
        });
        link.send(Command::Accept);
        assert!(link.port.written.is_empty());
    }

    #[test]
    fn test_poll_without_data_is_none() {
        let mut link = SerialLink::new(ScriptedPort::default());
        assert_eq!(link.poll(), None);
    }

    #[test]
    fn test_poll_reassembles_lines() {
        let mut port = ScriptedPort::default();
        port.reads.push_back(b"FINGER".to_vec());
        port.reads.push_back(b"_OK\r\nFINGER_FAIL\n".to_vec());
        let mut link = SerialLink::new(port);

        assert_eq!(link.poll(), Some(LinkEvent::FingerOk));
        assert_eq!(link.poll(), Some(LinkEvent::FingerFail));
        assert_eq!(link.poll(), None);
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let mut port = ScriptedPort::default();
        port.reads.push_back(b"FINGER_OK".to_vec());
        let mut link = SerialLink::new(port);

        assert_eq!(link.poll(), None);
        link.port.reads.push_back(b"\n".to_vec());
        assert_eq!(link.poll(), Some(LinkEvent::FingerOk));
    }

    #[test]
    fn test_baud_rate_mapping() {
        assert!(matches!(baud_rate(115200), Ok(BaudRate::B115200)));
        assert!(matches!(baud_rate(12345), Err(LinkError::UnsupportedBaud(12345))));
    }

    #[test]
    fn test_open_missing_device() {
        let result = SerialLink::open("/dev/does-not-exist-doorlock", 115200, Duration::ZERO);
        assert!(matches!(result, Err(LinkError::Open { .. })));
    }
}
