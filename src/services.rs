use crate::config::{AirQualityConfig, WeatherConfig};
use crate::errors::PipelineError;
use crate::models::Coordinates;
use crate::upstream_models::{AirQualityData, AirQualityEnvelope, WeatherResponse};
use reqwest::Client;
use url::Url;

/// Client for the RapidAPI open-weather host, used for both geocoding and current weather.
#[derive(Clone)]
pub struct WeatherService {
    client: Client,
    base_url: String,
    api_key: String,
    api_host: String,
}

impl WeatherService {
    pub fn new(client: Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            api_host: config.api_host.clone(),
        }
    }

    /// Look up a city by name and return its coordinates and canonical name.
    pub async fn geocode(
        &self,
        location: &str,
    ) -> Result<(Coordinates, Option<String>), PipelineError> {
        let url = build_url(&self.base_url, &["city", location])
            .map_err(PipelineError::GeocodeFailure)?;

        tracing::debug!("Geocoding '{}' via {}", location, url);

        let data = self
            .get_json(url)
            .await
            .map_err(|e| PipelineError::GeocodeFailure(format!("Weather city lookup {}", e)))?;

        let coord = data.coord.as_ref().ok_or_else(|| {
            PipelineError::GeocodeFailure(format!("no coordinates returned for '{}'", location))
        })?;

        let (lat, lon) = match (coord.lat, coord.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(PipelineError::GeocodeFailure(format!(
                    "incomplete coordinates returned for '{}'",
                    location
                )))
            }
        };

        let coordinates = Coordinates::new(lat, lon).ok_or_else(|| {
            PipelineError::GeocodeFailure(format!("coordinates out of range: ({}, {})", lat, lon))
        })?;

        let name = data
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok((coordinates, name))
    }

    /// Fetch current weather at the given coordinates.
    pub async fn current_weather(
        &self,
        coords: Coordinates,
    ) -> Result<WeatherResponse, PipelineError> {
        let lat = coords.lat().to_string();
        let lon = coords.lon().to_string();
        let url = build_url(&self.base_url, &["city", "latlon", &lat, &lon])
            .map_err(PipelineError::AggregationFailure)?;

        tracing::debug!("Fetching weather for {}", coords);

        self.get_json(url)
            .await
            .map_err(|e| PipelineError::AggregationFailure(format!("Weather lookup {}", e)))
    }

    async fn get_json(&self, url: Url) -> Result<WeatherResponse, String> {
        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", describe(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("returned status {}: {}", status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| format!("response could not be parsed: {}", describe(e)))
    }
}

/// Client for the WAQI air-quality feed.
#[derive(Clone)]
pub struct AirQualityService {
    client: Client,
    base_url: String,
    token: String,
}

impl AirQualityService {
    pub fn new(client: Client, config: &AirQualityConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    /// Fetch the nearest station feed for the given coordinates.
    ///
    /// A `status` other than `"ok"` is an error even when HTTP succeeded.
    pub async fn feed(&self, coords: Coordinates) -> Result<AirQualityData, PipelineError> {
        let geo = format!("geo:{};{}", coords.lat(), coords.lon());
        let mut url = build_url(&self.base_url, &["feed", &geo, ""])
            .map_err(PipelineError::AggregationFailure)?;

        // Redact token from logs to prevent credential exposure
        tracing::debug!("Air quality URL: {}?token=[REDACTED]", url);
        url.query_pairs_mut().append_pair("token", &self.token);

        let response = self.client.get(url).send().await.map_err(|e| {
            PipelineError::AggregationFailure(format!(
                "Air quality request failed: {}",
                describe(e)
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::AggregationFailure(format!(
                "Air quality service returned status {}",
                status
            )));
        }

        let envelope: AirQualityEnvelope = response.json().await.map_err(|e| {
            PipelineError::AggregationFailure(format!(
                "Failed to parse air quality response: {}",
                describe(e)
            ))
        })?;

        if envelope.status != "ok" {
            let reason = envelope
                .data
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| envelope.data.to_string());
            return Err(PipelineError::AggregationFailure(format!(
                "Air quality service reported status '{}': {}",
                envelope.status, reason
            )));
        }

        serde_json::from_value(envelope.data).map_err(|e| {
            PipelineError::AggregationFailure(format!("Malformed air quality data: {}", e))
        })
    }
}

/// Appends percent-encoded path segments to a base URL.
fn build_url(base_url: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url =
        Url::parse(base_url).map_err(|e| format!("Failed to build URL from {}: {}", base_url, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("{} cannot be used as a base URL", base_url))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Error text without the request URL, which carries the air-quality token.
fn describe(err: reqwest::Error) -> String {
    let err = err.without_url();
    if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_encodes_segments() {
        let url = build_url("https://example.com", &["city", "New York"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/city/New%20York");

        let url = build_url("http://127.0.0.1:8080/base", &["feed", "geo:19.076;72.8777", ""])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/base/feed/geo:19.076;72.8777/");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(build_url("not a url", &["city"]).is_err());
    }
}
