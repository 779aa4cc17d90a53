//! Camera stream lifecycle. The controller is a pure state machine; it tells
//! the caller which stream handles to stop but never talks to the shell
//! itself. At most one stream handle is live at any time, so every path out
//! of `Opening` or `Previewing` returns the handle that must be stopped.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::media::{MediaError, StreamHandle};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureState {
    #[default]
    Closed,
    Opening {
        generation: u64,
    },
    Previewing {
        stream: StreamHandle,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera not supported on this device")]
    Unsupported,

    #[error("camera device error: {reason}")]
    DeviceError { reason: String },

    #[error("camera stream is not ready yet")]
    NotReady,

    #[error("camera is not open")]
    NotOpen,
}

impl From<MediaError> for CaptureError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PermissionDenied => CaptureError::PermissionDenied,
            MediaError::Unsupported => CaptureError::Unsupported,
            MediaError::DeviceError { reason } => CaptureError::DeviceError { reason },
            MediaError::NotReady => CaptureError::NotReady,
        }
    }
}

/// Outcome of feeding a shell `StreamOpened` result into the controller.
#[derive(Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Accepted,
    /// The result belongs to a superseded open attempt. The handle it carries
    /// is live on the shell side and must be stopped immediately.
    Stale(StreamHandle),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureController {
    state: CaptureState,
    generation: u64,
}

impl CaptureController {
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, CaptureState::Closed)
    }

    pub fn is_opening(&self) -> bool {
        matches!(self.state, CaptureState::Opening { .. })
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.state, CaptureState::Previewing { .. })
    }

    /// Start a new open attempt. Returns the generation to tag the shell
    /// request with, plus any previously live stream that must be stopped.
    pub fn begin_open(&mut self) -> (u64, Option<StreamHandle>) {
        let displaced = self.take_live_stream();
        self.generation += 1;
        self.state = CaptureState::Opening {
            generation: self.generation,
        };
        (self.generation, displaced)
    }

    /// Apply a successful `StreamOpened` from the shell.
    pub fn stream_opened(
        &mut self,
        generation: u64,
        stream: StreamHandle,
        width: u32,
        height: u32,
    ) -> OpenOutcome {
        match &self.state {
            CaptureState::Opening { generation: current } if *current == generation => {
                self.state = CaptureState::Previewing {
                    stream,
                    width,
                    height,
                };
                OpenOutcome::Accepted
            }
            _ => {
                debug!(generation, "discarding stale stream-opened result");
                OpenOutcome::Stale(stream)
            }
        }
    }

    /// Apply a failed open. Stale failures are ignored.
    pub fn open_failed(&mut self, generation: u64) -> bool {
        match &self.state {
            CaptureState::Opening { generation: current } if *current == generation => {
                self.state = CaptureState::Closed;
                true
            }
            _ => {
                debug!(generation, "discarding stale open failure");
                false
            }
        }
    }

    /// Record the shell reporting that preview frames are flowing, with the
    /// actual frame dimensions.
    pub fn preview_ready(&mut self, width: u32, height: u32) {
        if let CaptureState::Previewing {
            width: w,
            height: h,
            ..
        } = &mut self.state
        {
            *w = width;
            *h = height;
        }
    }

    /// The stream a capture request should target, or why one is not legal.
    pub fn capture_target(&self) -> Result<StreamHandle, CaptureError> {
        match &self.state {
            CaptureState::Previewing { stream, width, height } => {
                if *width == 0 || *height == 0 {
                    Err(CaptureError::NotReady)
                } else {
                    Ok(stream.clone())
                }
            }
            CaptureState::Opening { .. } => Err(CaptureError::NotReady),
            CaptureState::Closed => Err(CaptureError::NotOpen),
        }
    }

    /// Close from any state. Idempotent. Bumps the generation so in-flight
    /// open results become stale, and returns the live stream to stop.
    pub fn close(&mut self) -> Option<StreamHandle> {
        self.generation += 1;
        let displaced = self.take_live_stream();
        self.state = CaptureState::Closed;
        displaced
    }

    fn take_live_stream(&mut self) -> Option<StreamHandle> {
        match std::mem::take(&mut self.state) {
            CaptureState::Previewing { stream, .. } => Some(stream),
            _ => None,
        }
    }
}
