use serde::{Deserialize, Serialize};

use crate::arbiter::ImageArbiter;
use crate::capture::CaptureController;
use crate::location::LocationResolver;
use crate::submission::SubmissionCoordinator;
use crate::AppError;

/// Remote endpoints the core talks to. The shell may override these at
/// startup; the defaults point at production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub scoring_url: String,
    pub geocode_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            scoring_url: "https://api.cleansnap.app/api/v1/images/upload".to_string(),
            geocode_url: "https://api.bigdatacloud.net/data/reverse-geocode-client".to_string(),
        }
    }
}

/// All app state. Mutated only inside `App::update`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    pub config: EndpointConfig,
    pub location: LocationResolver,
    pub capture: CaptureController,
    pub arbiter: ImageArbiter,
    pub submission: SubmissionCoordinator,
    pub started: bool,
    pub active_error: Option<AppError>,
}
