use image::RgbImage;

/// Blocking frame source (a camera, or a test double).
pub trait CaptureSource {
    type Error: std::error::Error;

    /// Block until the next frame is available.
    fn capture(&mut self) -> Result<RgbImage, Self::Error>;
}
