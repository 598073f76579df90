//! doorlock-hw — Hardware abstraction for the door lock.
//!
//! Provides V4L2 camera capture (RGB frames) and the newline-delimited
//! serial link to the lock microcontroller.

pub mod camera;
pub mod frame;
pub mod serial;

pub use camera::{Camera, CameraError, PixelFormat};
pub use serial::{LinkError, SerialLink};
