//! One-shot geolocation lookup.
//!
//! There is no platform positioning service to ask on the desktop, so the
//! initial fix comes from an IP geolocation web service instead. The lookup is
//! fire-and-forget: the caller polls the returned promise, and if the owning
//! view is dropped first the result is simply ignored.

use eyre::{Context, Result};
use log::debug;
use poll_promise::Promise;
use serde::Deserialize;
use std::sync::Arc;

use crate::MapError;
use crate::projection::GeoPos;
use crate::tiles::CLIENT;

const LOCATE_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

#[derive(Deserialize)]
struct LocateResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

fn parse_response(body: &str) -> Result<GeoPos, MapError> {
    let response: LocateResponse = serde_json::from_str(body)?;

    if response.status != "success" {
        return Err(MapError::LocateError(
            response
                .message
                .unwrap_or_else(|| "service reported failure".to_string()),
        ));
    }

    match (response.lat, response.lon) {
        (Some(lat), Some(lon)) => Ok(GeoPos::new(lat, lon)),
        _ => Err(MapError::LocateError(
            "response is missing coordinates".to_string(),
        )),
    }
}

/// Spawns a one-shot position lookup on a background thread.
pub fn locate() -> Promise<Result<GeoPos, Arc<eyre::Report>>> {
    Promise::spawn_thread("geolocate", move || {
        let result: Result<GeoPos> = (|| -> Result<GeoPos, MapError> {
            debug!("Requesting geolocation from {LOCATE_URL}");
            let response = CLIENT.get(LOCATE_URL).send().map_err(MapError::from)?;

            if !response.status().is_success() {
                return Err(MapError::DownloadError(response.status().to_string()).into());
            }

            let body = response.text().map_err(MapError::from)?;
            Ok(parse_response(&body)?)
        })()
        .with_context(|| "Geolocation lookup failed");

        result.map_err(Arc::new)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_response() {
        let body = r#"{"status":"success","lat":38.9072,"lon":-77.0369}"#;
        let pos = parse_response(body).unwrap();
        assert_eq!(pos, GeoPos::new(38.9072, -77.0369));
    }

    #[test]
    fn rejects_failed_status() {
        let body = r#"{"status":"fail","message":"private range"}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, MapError::LocateError(_)));
        assert!(err.to_string().contains("private range"));
    }

    #[test]
    fn rejects_missing_coordinates() {
        let body = r#"{"status":"success","lat":38.9072}"#;
        assert!(matches!(
            parse_response(body),
            Err(MapError::LocateError(_))
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_response("not json"),
            Err(MapError::ResponseParseError(_))
        ));
    }
}
