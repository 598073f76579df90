//! Client for the external face embedding service.
//!
//! Wire protocol over a Unix stream socket, one exchange per connection:
//! the client writes a JSON header line `{"width","height","len"}` followed
//! by `len` raw RGB8 bytes; the service answers with one JSON line, either
//! `{"faces":[[f32,..],..]}` in detection order or `{"error":"..."}`.

use doorlock_core::{EmbedError, Embedding, FaceEmbedder};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    pub len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ServiceEmbedder {
    socket_path: PathBuf,
}

impl ServiceEmbedder {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    fn connect(&self) -> Result<UnixStream, EmbedError> {
        let stream = UnixStream::connect(&self.socket_path).map_err(|e| {
            EmbedError::Unavailable(format!("{}: {e}", self.socket_path.display()))
        })?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        Ok(stream)
    }
}

impl FaceEmbedder for ServiceEmbedder {
    fn embed(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EmbedError> {
        let mut stream = self.connect()?;

        let pixels = image.as_raw();
        let header = FrameHeader {
            width: image.width(),
            height: image.height(),
            len: pixels.len(),
        };
        let mut line = serde_json::to_string(&header)
            .map_err(|e| EmbedError::Protocol(format!("encode header: {e}")))?;
        line.push('\n');

        stream.write_all(line.as_bytes())?;
        stream.write_all(pixels)?;
        stream.flush()?;

        let mut reply = String::new();
        BufReader::new(&stream).read_line(&mut reply)?;
        if reply.trim().is_empty() {
            return Err(EmbedError::Protocol("empty response".into()));
        }

        let response: EmbedResponse = serde_json::from_str(reply.trim())
            .map_err(|e| EmbedError::Protocol(format!("decode response: {e}")))?;

        match response {
            EmbedResponse {
                error: Some(message),
                ..
            } => Err(EmbedError::Rejected(message)),
            EmbedResponse {
                faces: Some(faces), ..
            } => {
                tracing::trace!(faces = faces.len(), "embedding service replied");
                Ok(faces.into_iter().map(Embedding::new).collect())
            }
            _ => Err(EmbedError::Protocol("response has neither faces nor error".into())),
        }
    }
}
