//! One-shot location resolution: device position fix, then a reverse-geocode
//! lookup that turns coordinates into a human place name. The state only
//! moves forward; once resolved or failed it stays put and late results are
//! discarded.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::geolocation::GeolocationError;
use crate::capabilities::http::{HttpError, HttpRequest, HttpResponse};
use crate::model::EndpointConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationError {
    #[error("not supported")]
    NotSupported,

    #[error("permission denied")]
    PermissionDenied,

    #[error("lookup failed")]
    LookupFailed,
}

impl From<GeolocationError> for LocationError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::NotSupported => LocationError::NotSupported,
            GeolocationError::PermissionDenied => LocationError::PermissionDenied,
            GeolocationError::Unavailable { .. } => LocationError::LookupFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocationState {
    #[default]
    Resolving,
    Resolved {
        place: String,
    },
    Failed {
        reason: LocationError,
    },
}

/// Shape of the reverse-geocode response body. Only the fields used for the
/// place name are deserialized; everything else is ignored.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    locality: Option<String>,
}

impl GeocodeResponse {
    fn place_name(self) -> String {
        self.city
            .filter(|s| !s.trim().is_empty())
            .or(self.locality.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationResolver {
    state: LocationState,
}

impl LocationResolver {
    pub fn state(&self) -> &LocationState {
        &self.state
    }

    pub fn place(&self) -> Option<&str> {
        match &self.state {
            LocationState::Resolved { place } => Some(place),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, LocationState::Resolved { .. })
    }

    pub fn apply_position_error(&mut self, err: GeolocationError) {
        self.transition(LocationState::Failed { reason: err.into() });
    }

    pub fn apply_geocode_success(&mut self, response: &HttpResponse) {
        if !response.is_success() {
            debug!(status = response.status(), "reverse geocode returned non-success status");
            self.transition(LocationState::Failed {
                reason: LocationError::LookupFailed,
            });
            return;
        }
        match response.json::<GeocodeResponse>() {
            Ok(body) => self.transition(LocationState::Resolved {
                place: body.place_name(),
            }),
            Err(err) => {
                debug!(%err, "reverse geocode body did not parse");
                self.transition(LocationState::Failed {
                    reason: LocationError::LookupFailed,
                });
            }
        }
    }

    pub fn apply_geocode_failure(&mut self, err: &HttpError) {
        debug!(%err, "reverse geocode request failed");
        self.transition(LocationState::Failed {
            reason: LocationError::LookupFailed,
        });
    }

    fn transition(&mut self, next: LocationState) {
        if matches!(self.state, LocationState::Resolving) {
            self.state = next;
        } else {
            debug!("discarding location transition, already terminal");
        }
    }
}

/// Build the reverse-geocode GET request for a position fix.
pub fn geocode_request(
    config: &EndpointConfig,
    latitude: f64,
    longitude: f64,
) -> Result<HttpRequest, HttpError> {
    HttpRequest::get(format!(
        "{}?latitude={latitude}&longitude={longitude}&localityLanguage=en",
        config.geocode_url
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, vec![], body.as_bytes().to_vec(), "req-1")
    }

    #[test]
    fn city_is_preferred_over_locality() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(
            200,
            r#"{"city":"Springfield","locality":"Downtown"}"#,
        ));
        assert_eq!(resolver.place(), Some("Springfield"));
    }

    #[test]
    fn locality_is_the_fallback() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(200, r#"{"city":"","locality":"Downtown"}"#));
        assert_eq!(resolver.place(), Some("Downtown"));
    }

    #[test]
    fn missing_both_yields_unknown() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(200, r#"{"countryName":"Elbonia"}"#));
        assert_eq!(resolver.place(), Some("Unknown"));
    }

    #[test]
    fn non_success_status_is_lookup_failed() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(503, "busy"));
        assert_eq!(
            resolver.state(),
            &LocationState::Failed {
                reason: LocationError::LookupFailed
            }
        );
    }

    #[test]
    fn unparseable_body_is_lookup_failed() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(200, "<html>not json</html>"));
        assert_eq!(
            resolver.state(),
            &LocationState::Failed {
                reason: LocationError::LookupFailed
            }
        );
    }

    #[test]
    fn permission_denied_maps_to_its_own_reason() {
        let mut resolver = LocationResolver::default();
        resolver.apply_position_error(GeolocationError::PermissionDenied);
        assert_eq!(
            resolver.state(),
            &LocationState::Failed {
                reason: LocationError::PermissionDenied
            }
        );
    }

    #[test]
    fn terminal_state_ignores_late_results() {
        let mut resolver = LocationResolver::default();
        resolver.apply_geocode_success(&response(200, r#"{"city":"Springfield"}"#));
        resolver.apply_position_error(GeolocationError::PermissionDenied);
        resolver.apply_geocode_success(&response(200, r#"{"city":"Shelbyville"}"#));
        assert_eq!(resolver.place(), Some("Springfield"));
    }

    #[test]
    fn error_display_matches_user_facing_wording() {
        assert_eq!(LocationError::NotSupported.to_string(), "not supported");
        assert_eq!(LocationError::PermissionDenied.to_string(), "permission denied");
        assert_eq!(LocationError::LookupFailed.to_string(), "lookup failed");
    }

    #[test]
    fn geocode_request_carries_coordinates() {
        let request = geocode_request(&EndpointConfig::default(), 51.5072, -0.1276).unwrap();
        let url = request.url().as_str();
        assert!(url.contains("latitude=51.5072"));
        assert!(url.contains("longitude=-0.1276"));
        assert!(url.contains("localityLanguage=en"));
    }
}
