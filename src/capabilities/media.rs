use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JPEG quality the shell uses when encoding a captured frame.
pub const JPEG_CAPTURE_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraFacing {
    Front,
    /// Rear camera, preferred for photographing the environment.
    #[default]
    Back,
}

/// Opaque identifier for an open camera stream on the shell side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamHandle(pub String);

/// Opaque identifier for a shell-side preview resource, such as an object URL.
/// Every handle handed to the core must eventually come back through a
/// `ReleasePreview` operation or the shell leaks the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOperation {
    OpenStream { facing: CameraFacing },
    CaptureFrame { stream: StreamHandle, quality: u8 },
    StopStream { stream: StreamHandle },
    ReleasePreview { preview: PreviewHandle },
}

impl Operation for MediaOperation {
    type Output = MediaResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOutput {
    StreamOpened {
        stream: StreamHandle,
        width: u32,
        height: u32,
    },
    Frame {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        mime_type: String,
        width: u32,
        height: u32,
        preview: Option<PreviewHandle>,
    },
    Stopped,
    PreviewReleased,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera not supported on this device")]
    Unsupported,

    #[error("camera device error: {reason}")]
    DeviceError { reason: String },

    #[error("camera stream not ready")]
    NotReady,
}

pub type MediaResult = Result<MediaOutput, MediaError>;

pub struct Media<Ev> {
    context: CapabilityContext<MediaOperation, Ev>,
}

impl<Ev> Capability<Ev> for Media<Ev> {
    type Operation = MediaOperation;
    type MappedSelf<MappedEv> = Media<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Media::new(self.context.map_event(f))
    }
}

impl<Ev> Media<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<MediaOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn open_stream<F>(&self, facing: CameraFacing, make_event: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::OpenStream { facing }, make_event);
    }

    pub fn capture_frame<F>(&self, stream: StreamHandle, make_event: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(
            MediaOperation::CaptureFrame {
                stream,
                quality: JPEG_CAPTURE_QUALITY,
            },
            make_event,
        );
    }

    pub fn stop_stream<F>(&self, stream: StreamHandle, make_event: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::StopStream { stream }, make_event);
    }

    pub fn release_preview<F>(&self, preview: PreviewHandle, make_event: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::ReleasePreview { preview }, make_event);
    }

    fn request<F>(&self, operation: MediaOperation, make_event: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
