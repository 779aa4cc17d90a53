//! Shared core of the CleanSnap litter-reporting app.
//!
//! The crate is a Crux app: a pure `update()` state machine with all side
//! effects expressed as capability operations the host shell fulfils. It
//! covers the full report flow: stage a photo (live camera capture or file
//! pick), resolve the device position to a place name, and submit both to the
//! scoring service.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};

pub mod app;
pub mod arbiter;
pub mod capabilities;
pub mod capture;
pub mod event;
pub mod image_processing;
pub mod location;
pub mod model;
pub mod multipart;
pub mod submission;

pub use app::{App, Capabilities, Effect, ViewModel};
pub use event::Event;
pub use model::{EndpointConfig, Model};

/// Largest picked image file accepted for staging.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Largest accepted image side length, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Camera,
    Location,
    Image,
    Submission,
    Network,
}

/// A domain error flattened for the view layer. Keeps the kind for shell
/// branching and a message safe to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Camera => format!("Camera problem: {}", self.message),
            ErrorKind::Location => format!("Location problem: {}", self.message),
            ErrorKind::Image => format!("That image cannot be used: {}", self.message),
            ErrorKind::Submission => self.message.clone(),
            ErrorKind::Network => format!("Network problem: {}", self.message),
        }
    }
}

impl From<capture::CaptureError> for AppError {
    fn from(err: capture::CaptureError) -> Self {
        Self {
            kind: ErrorKind::Camera,
            message: err.to_string(),
        }
    }
}

impl From<image_processing::ImageError> for AppError {
    fn from(err: image_processing::ImageError) -> Self {
        Self {
            kind: ErrorKind::Image,
            message: err.to_string(),
        }
    }
}

impl From<location::LocationError> for AppError {
    fn from(err: location::LocationError) -> Self {
        Self {
            kind: ErrorKind::Location,
            message: err.to_string(),
        }
    }
}

impl From<submission::SubmitError> for AppError {
    fn from(err: submission::SubmitError) -> Self {
        Self {
            kind: ErrorKind::Submission,
            message: err.to_string(),
        }
    }
}

impl From<capabilities::http::HttpError> for AppError {
    fn from(err: capabilities::http::HttpError) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: err.to_string(),
        }
    }
}
