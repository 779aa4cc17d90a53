//! Custom capabilities: the only channel through which the core asks the
//! shell for side effects. Each capability owns its operation and output
//! types; the shell fulfils operations and resolves each exactly once.

pub mod geolocation;
pub mod http;
pub mod media;

pub use geolocation::{Geolocation, GeolocationError, GeolocationResult, Position};
pub use http::{Http, HttpError, HttpRequest, HttpResponse, HttpResult, ValidatedUrl};
pub use media::{
    CameraFacing, Media, MediaError, MediaOutput, MediaResult, PreviewHandle, StreamHandle,
};
