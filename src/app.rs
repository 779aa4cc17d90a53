use crux_core::render::Render;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arbiter::{ImageSource, StagedImage};
use crate::capabilities::geolocation::Geolocation;
use crate::capabilities::http::Http;
use crate::capabilities::media::{
    CameraFacing, Media, MediaError, MediaOutput, PreviewHandle, StreamHandle,
};
use crate::capture::{CaptureError, OpenOutcome};
use crate::event::Event;
use crate::image_processing::{decode_picked_file, ImageKind};
use crate::location::{geocode_request, LocationState};
use crate::model::Model;
use crate::submission::{ScoreSummary, SubmissionState};

#[cfg_attr(feature = "typegen", derive(crux_core::macros::Export))]
#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub media: Media<Event>,
    pub geolocation: Geolocation<Event>,
}

/// Render-ready projection of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub location_text: String,
    pub location_resolved: bool,
    pub camera_opening: bool,
    pub camera_active: bool,
    pub has_image: bool,
    pub preview: Option<String>,
    pub image_source: Option<ImageSource>,
    pub can_submit: bool,
    pub is_submitting: bool,
    pub score: Option<ScoreSummary>,
    pub error_text: Option<String>,
}

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::Noop => {}

            Event::Started { config } => {
                if model.started {
                    debug!("ignoring repeated start");
                    return;
                }
                model.started = true;
                if let Some(config) = config {
                    model.config = config;
                }
                caps.geolocation
                    .get_position(|result| Event::PositionResult(Box::new(result)));
                caps.render.render();
            }

            Event::OpenCameraRequested => {
                model.active_error = None;
                let (generation, displaced) = model.capture.begin_open();
                if let Some(stream) = displaced {
                    self.stop_stream(caps, stream);
                }
                caps.media
                    .open_stream(CameraFacing::default(), move |result| {
                        Event::StreamOpenResult {
                            generation,
                            result: Box::new(result),
                        }
                    });
                caps.render.render();
            }

            Event::StreamOpenResult { generation, result } => match *result {
                Ok(MediaOutput::StreamOpened {
                    stream,
                    width,
                    height,
                }) => match model.capture.stream_opened(generation, stream, width, height) {
                    OpenOutcome::Accepted => caps.render.render(),
                    OpenOutcome::Stale(stream) => self.stop_stream(caps, stream),
                },
                Ok(other) => warn!(?other, "unexpected output for open-stream request"),
                Err(err) => {
                    if model.capture.open_failed(generation) {
                        model.active_error = Some(CaptureError::from(err).into());
                        caps.render.render();
                    }
                }
            },

            Event::PreviewReady { width, height } => {
                model.capture.preview_ready(width, height);
                caps.render.render();
            }

            Event::CaptureRequested => {
                model.active_error = None;
                match model.capture.capture_target() {
                    Ok(stream) => {
                        let generation = model.capture.generation();
                        caps.media.capture_frame(stream, move |result| Event::FrameResult {
                            generation,
                            result: Box::new(result),
                        });
                    }
                    Err(err) => {
                        // A not-ready stream stays open so the user can retry.
                        model.active_error = Some(err.into());
                        caps.render.render();
                    }
                }
            }

            Event::FrameResult { generation, result } => {
                self.handle_frame_result(generation, *result, model, caps);
            }

            Event::CancelCameraRequested => {
                if let Some(stream) = model.capture.close() {
                    self.stop_stream(caps, stream);
                }
                caps.render.render();
            }

            Event::FileSelected { data, preview } => {
                model.active_error = None;
                match decode_picked_file(&data) {
                    Ok(decoded) => {
                        if let Some(stream) = model.capture.close() {
                            self.stop_stream(caps, stream);
                        }
                        let displaced = model.arbiter.install(StagedImage {
                            data,
                            kind: decoded.kind,
                            width: decoded.width,
                            height: decoded.height,
                            source: ImageSource::File,
                            preview,
                        });
                        if let Some(handle) = displaced {
                            self.release_preview(caps, handle);
                        }
                    }
                    Err(err) => {
                        if let Some(handle) = preview {
                            self.release_preview(caps, handle);
                        }
                        model.active_error = Some(err.into());
                    }
                }
                caps.render.render();
            }

            Event::ClearImageRequested => {
                model.active_error = None;
                if let Some(handle) = model.arbiter.clear() {
                    self.release_preview(caps, handle);
                }
                caps.render.render();
            }

            Event::PositionResult(result) => match *result {
                Ok(position) => {
                    match geocode_request(&model.config, position.latitude, position.longitude) {
                        Ok(request) => caps
                            .http
                            .execute(request, |result| Event::GeocodeResult(Box::new(result))),
                        Err(err) => {
                            model.location.apply_geocode_failure(&err);
                            caps.render.render();
                        }
                    }
                }
                Err(err) => {
                    model.location.apply_position_error(err);
                    caps.render.render();
                }
            },

            Event::GeocodeResult(result) => {
                match *result {
                    Ok(response) => model.location.apply_geocode_success(&response),
                    Err(err) => model.location.apply_geocode_failure(&err),
                }
                caps.render.render();
            }

            Event::SubmitRequested => {
                model.active_error = None;
                let Model {
                    arbiter,
                    location,
                    submission,
                    config,
                    ..
                } = model;
                match submission.begin(arbiter.current(), location.place(), config) {
                    Ok((request_id, request)) => {
                        caps.http.execute(request, move |result| Event::ScoreResult {
                            request_id,
                            result: Box::new(result),
                        });
                    }
                    Err(err) => debug!(%err, "submission not started"),
                }
                caps.render.render();
            }

            Event::ScoreResult { request_id, result } => {
                model.submission.apply_result(request_id, &result);
                caps.render.render();
            }

            Event::ResetSubmission => {
                model.active_error = None;
                model.submission.reset();
                if let Some(handle) = model.arbiter.clear() {
                    self.release_preview(caps, handle);
                }
                caps.render.render();
            }

            Event::TornDown => {
                if let Some(stream) = model.capture.close() {
                    self.stop_stream(caps, stream);
                }
                if let Some(handle) = model.arbiter.clear() {
                    self.release_preview(caps, handle);
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let (location_text, location_resolved) = match model.location.state() {
            LocationState::Resolving => ("Detecting location...".to_string(), false),
            LocationState::Resolved { place } => (place.clone(), true),
            LocationState::Failed { reason } => (format!("Location unavailable: {reason}"), false),
        };

        let staged = model.arbiter.current();
        let is_submitting = model.submission.is_in_flight();

        let score = match model.submission.state() {
            SubmissionState::Succeeded(summary) => Some(summary.clone()),
            _ => None,
        };

        let error_text = model
            .active_error
            .as_ref()
            .map(crate::AppError::user_facing_message)
            .or_else(|| match model.submission.state() {
                SubmissionState::Failed(err) => Some(err.to_string()),
                _ => None,
            });

        ViewModel {
            location_text,
            location_resolved,
            camera_opening: model.capture.is_opening(),
            camera_active: model.capture.is_previewing(),
            has_image: staged.is_some(),
            preview: staged
                .and_then(|image| image.preview.as_ref())
                .map(|handle| handle.0.clone()),
            image_source: staged.map(|image| image.source),
            can_submit: staged.is_some() && location_resolved && !is_submitting,
            is_submitting,
            score,
            error_text,
        }
    }
}

impl App {
    fn handle_frame_result(
        &self,
        generation: u64,
        result: Result<MediaOutput, MediaError>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if generation != model.capture.generation() {
            debug!(generation, "discarding frame from a closed camera session");
            // The frame's preview resource was still allocated by the shell.
            if let Ok(MediaOutput::Frame {
                preview: Some(handle),
                ..
            }) = result
            {
                self.release_preview(caps, handle);
            }
            return;
        }

        match result {
            Ok(MediaOutput::Frame {
                data,
                mime_type,
                width,
                height,
                preview,
            }) => {
                if let Some(stream) = model.capture.close() {
                    self.stop_stream(caps, stream);
                }
                let kind = ImageKind::from_magic_bytes(&data).unwrap_or_else(|| {
                    warn!(%mime_type, "captured frame had unrecognised magic bytes");
                    ImageKind::Jpeg
                });
                let displaced = model.arbiter.install(StagedImage {
                    data,
                    kind,
                    width,
                    height,
                    source: ImageSource::Camera,
                    preview,
                });
                if let Some(handle) = displaced {
                    self.release_preview(caps, handle);
                }
                caps.render.render();
            }
            Ok(other) => warn!(?other, "unexpected output for capture-frame request"),
            Err(MediaError::NotReady) => {
                // Stream stays open; the user can try again.
                model.active_error = Some(CaptureError::NotReady.into());
                caps.render.render();
            }
            Err(err) => {
                if let Some(stream) = model.capture.close() {
                    self.stop_stream(caps, stream);
                }
                model.active_error = Some(CaptureError::from(err).into());
                caps.render.render();
            }
        }
    }

    fn stop_stream(&self, caps: &Capabilities, stream: StreamHandle) {
        caps.media.stop_stream(stream, |_| Event::Noop);
    }

    fn release_preview(&self, caps: &Capabilities, handle: PreviewHandle) {
        caps.media.release_preview(handle, |_| Event::Noop);
    }
}
