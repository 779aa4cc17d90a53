use serde::{Deserialize, Serialize};

use crate::capabilities::geolocation::GeolocationResult;
use crate::capabilities::http::HttpResult;
use crate::capabilities::media::{MediaResult, PreviewHandle};
use crate::model::EndpointConfig;

/// User intents and capability results. Result-carrying variants box their
/// payloads to keep the enum small; async results carry the generation or
/// request id of the attempt they belong to so stale ones can be discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Resolution of a fire-and-forget operation the app does not act on.
    Noop,

    /// Shell is up. Kicks off location resolution once; later `Started`
    /// events are ignored.
    Started { config: Option<EndpointConfig> },

    // camera
    OpenCameraRequested,
    StreamOpenResult {
        generation: u64,
        result: Box<MediaResult>,
    },
    /// Shell reports preview frames flowing at the given dimensions.
    PreviewReady { width: u32, height: u32 },
    CaptureRequested,
    FrameResult {
        generation: u64,
        result: Box<MediaResult>,
    },
    CancelCameraRequested,

    // file pick
    FileSelected {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        preview: Option<PreviewHandle>,
    },
    ClearImageRequested,

    // location
    PositionResult(Box<GeolocationResult>),
    GeocodeResult(Box<HttpResult>),

    // submission
    SubmitRequested,
    ScoreResult {
        request_id: u64,
        result: Box<HttpResult>,
    },
    ResetSubmission,

    /// Shell is going away; release everything the core holds.
    TornDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_serde() {
        let event = Event::FileSelected {
            data: vec![0xFF, 0xD8, 0xFF],
            preview: Some(PreviewHandle("blob:xyz".into())),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let back: Event = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, back);
    }
}
