//! Scoring submission: precondition checks, multipart payload assembly, and
//! a single-flight request lifecycle. Exactly one submission can be in flight
//! at a time and its response is matched by request id before it is applied.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::arbiter::StagedImage;
use crate::capabilities::http::{HttpError, HttpRequest, HttpResult};
use crate::model::EndpointConfig;
use crate::multipart::MultipartBody;

#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum SubmitError {
    #[error("no image selected")]
    MissingImage,

    #[error("location is not available yet")]
    MissingLocation,

    #[error("a submission is already in progress")]
    AlreadyInFlight,

    #[error("{0}")]
    ServerRejected(String),

    #[error("no response from server, check connectivity")]
    NoResponse,

    #[error("submission failed: {0}")]
    ClientError(String),
}

/// Wire shape of a successful scoring response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub area_name: String,
    pub marks: f64,
    pub total_garbage_items: u64,
    pub garbage_coverage_percent: f64,
}

/// Error body the scoring service returns on rejection.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeTier {
    Gold,
    Silver,
    Bronze,
    Participant,
}

impl BadgeTier {
    pub fn for_marks(marks: f64) -> Self {
        if marks >= 90.0 {
            BadgeTier::Gold
        } else if marks >= 70.0 {
            BadgeTier::Silver
        } else if marks >= 50.0 {
            BadgeTier::Bronze
        } else {
            BadgeTier::Participant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub area_name: String,
    pub marks: f64,
    pub total_garbage_items: u64,
    pub garbage_coverage_percent: f64,
    pub message: String,
    pub badge: BadgeTier,
}

impl From<ScoreResponse> for ScoreSummary {
    fn from(response: ScoreResponse) -> Self {
        let message = format!(
            "Scored {} points in {}: {} items of litter detected, {}% area coverage.",
            response.marks,
            response.area_name,
            response.total_garbage_items,
            response.garbage_coverage_percent
        );
        Self {
            badge: BadgeTier::for_marks(response.marks),
            area_name: response.area_name,
            marks: response.marks,
            total_garbage_items: response.total_garbage_items,
            garbage_coverage_percent: response.garbage_coverage_percent,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight {
        request_id: u64,
    },
    Succeeded(ScoreSummary),
    Failed(SubmitError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmissionCoordinator {
    state: SubmissionState,
    next_request_id: u64,
}

impl SubmissionCoordinator {
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SubmissionState::InFlight { .. })
    }

    /// Start a submission. Checks preconditions in order (image, then place),
    /// recording a failure state on either. A submission already in flight is
    /// rejected without touching any state. From a terminal state a new
    /// attempt starts fresh.
    pub fn begin(
        &mut self,
        image: Option<&StagedImage>,
        place: Option<&str>,
        config: &EndpointConfig,
    ) -> Result<(u64, HttpRequest), SubmitError> {
        if self.is_in_flight() {
            return Err(SubmitError::AlreadyInFlight);
        }
        self.state = SubmissionState::Idle;

        let Some(image) = image else {
            return self.fail(SubmitError::MissingImage);
        };
        let Some(place) = place else {
            return self.fail(SubmitError::MissingLocation);
        };

        let request = match build_score_request(config, image, place) {
            Ok(request) => request,
            Err(err) => return self.fail(SubmitError::ClientError(err.to_string())),
        };

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.state = SubmissionState::InFlight { request_id };
        Ok((request_id, request))
    }

    /// Apply the HTTP outcome for a given request id. Results that do not
    /// match the in-flight request are discarded.
    pub fn apply_result(&mut self, request_id: u64, result: &HttpResult) {
        match &self.state {
            SubmissionState::InFlight { request_id: current } if *current == request_id => {}
            _ => {
                debug!(request_id, "discarding score result for non-current request");
                return;
            }
        }

        self.state = match result {
            Ok(response) if response.is_success() => match response.json::<ScoreResponse>() {
                Ok(score) => SubmissionState::Succeeded(score.into()),
                Err(err) => {
                    warn!(%err, "scoring response body did not parse");
                    SubmissionState::Failed(SubmitError::ClientError(format!(
                        "unexpected response from server: {err}"
                    )))
                }
            },
            Ok(response) => {
                let detail = response
                    .json::<RejectionBody>()
                    .map(|body| body.detail)
                    .unwrap_or_else(|_| format!("server error {}", response.status()));
                SubmissionState::Failed(SubmitError::ServerRejected(detail))
            }
            Err(err) if err.is_transport() => SubmissionState::Failed(SubmitError::NoResponse),
            Err(err) => SubmissionState::Failed(SubmitError::ClientError(err.to_string())),
        };
    }

    /// Return to `Idle` so a fresh report can be started.
    pub fn reset(&mut self) {
        self.state = SubmissionState::Idle;
    }

    fn fail(&mut self, err: SubmitError) -> Result<(u64, HttpRequest), SubmitError> {
        self.state = SubmissionState::Failed(err.clone());
        Err(err)
    }
}

fn build_score_request(
    config: &EndpointConfig,
    image: &StagedImage,
    place: &str,
) -> Result<HttpRequest, HttpError> {
    let filename = match image.kind {
        crate::image_processing::ImageKind::Jpeg => "report.jpg",
        crate::image_processing::ImageKind::Png => "report.png",
        crate::image_processing::ImageKind::WebP => "report.webp",
    };

    let mut body = MultipartBody::new();
    body.add_file("image", filename, image.kind.mime_type(), &image.data);
    body.add_text("area_name", place);
    let content_type = body.content_type();

    HttpRequest::post(config.scoring_url.clone())?
        .with_header("Content-Type", content_type)?
        .with_body(body.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::ImageSource;
    use crate::capabilities::http::HttpResponse;
    use crate::image_processing::ImageKind;

    fn staged_image() -> StagedImage {
        StagedImage {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
            kind: ImageKind::Jpeg,
            width: 640,
            height: 480,
            source: ImageSource::Camera,
            preview: None,
        }
    }

    fn response(status: u16, body: &str) -> HttpResult {
        Ok(HttpResponse::new(status, vec![], body.as_bytes().to_vec(), "r"))
    }

    #[test]
    fn missing_image_is_checked_before_location() {
        let mut coordinator = SubmissionCoordinator::default();
        let result = coordinator.begin(None, None, &EndpointConfig::default());
        assert_eq!(result.unwrap_err(), SubmitError::MissingImage);
        assert_eq!(
            coordinator.state(),
            &SubmissionState::Failed(SubmitError::MissingImage)
        );
    }

    #[test]
    fn missing_location_fails_when_image_is_staged() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let result = coordinator.begin(Some(&image), None, &EndpointConfig::default());
        assert_eq!(result.unwrap_err(), SubmitError::MissingLocation);
    }

    #[test]
    fn begin_builds_a_multipart_post() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, request) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        assert!(coordinator.is_in_flight());
        assert_eq!(request_id, 1);
        assert!(request
            .header("Content-Type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(request.body());
        assert!(body.contains("name=\"image\""));
        assert!(body.contains("name=\"area_name\""));
        assert!(body.contains("Springfield"));
    }

    #[test]
    fn second_begin_while_in_flight_is_rejected_without_state_change() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        let result = coordinator.begin(Some(&image), Some("Springfield"), &EndpointConfig::default());
        assert_eq!(result.unwrap_err(), SubmitError::AlreadyInFlight);
        assert_eq!(coordinator.state(), &SubmissionState::InFlight { request_id });
    }

    #[test]
    fn success_response_becomes_a_score_summary() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        coordinator.apply_result(
            request_id,
            &response(
                200,
                r#"{"area_name":"Springfield","marks":7.0,"total_garbage_items":3,"garbage_coverage_percent":12.5}"#,
            ),
        );

        let SubmissionState::Succeeded(summary) = coordinator.state() else {
            panic!("expected success, got {:?}", coordinator.state());
        };
        assert!(summary.message.contains('7'));
        assert!(summary.message.contains("Springfield"));
        assert!(summary.message.contains('3'));
        assert!(summary.message.contains("12.5"));
        assert_eq!(summary.badge, BadgeTier::Participant);
    }

    #[test]
    fn rejection_detail_is_surfaced() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        coordinator.apply_result(request_id, &response(500, r#"{"detail":"model unavailable"}"#));
        assert_eq!(
            coordinator.state(),
            &SubmissionState::Failed(SubmitError::ServerRejected("model unavailable".into()))
        );
    }

    #[test]
    fn rejection_without_detail_gets_status_text() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        coordinator.apply_result(request_id, &response(502, "bad gateway"));
        assert_eq!(
            coordinator.state(),
            &SubmissionState::Failed(SubmitError::ServerRejected("server error 502".into()))
        );
    }

    #[test]
    fn transport_failure_is_no_response() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        coordinator.apply_result(
            request_id,
            &Err(HttpError::NoResponse { reason: "offline".into() }),
        );
        assert_eq!(
            coordinator.state(),
            &SubmissionState::Failed(SubmitError::NoResponse)
        );
        assert_eq!(
            SubmitError::NoResponse.to_string(),
            "no response from server, check connectivity"
        );
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();

        coordinator.apply_result(request_id + 1, &response(200, "{}"));
        assert_eq!(coordinator.state(), &SubmissionState::InFlight { request_id });
    }

    #[test]
    fn reset_allows_a_fresh_report() {
        let mut coordinator = SubmissionCoordinator::default();
        let image = staged_image();
        let (request_id, _) = coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .unwrap();
        coordinator.apply_result(request_id, &response(500, "{}"));

        coordinator.reset();
        assert_eq!(coordinator.state(), &SubmissionState::Idle);
        assert!(coordinator
            .begin(Some(&image), Some("Springfield"), &EndpointConfig::default())
            .is_ok());
    }

    #[test]
    fn badge_tiers_follow_mark_thresholds() {
        assert_eq!(BadgeTier::for_marks(95.0), BadgeTier::Gold);
        assert_eq!(BadgeTier::for_marks(90.0), BadgeTier::Gold);
        assert_eq!(BadgeTier::for_marks(75.0), BadgeTier::Silver);
        assert_eq!(BadgeTier::for_marks(50.0), BadgeTier::Bronze);
        assert_eq!(BadgeTier::for_marks(49.9), BadgeTier::Participant);
    }
}
