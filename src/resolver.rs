use crate::models::Coordinates;
use crate::services::WeatherService;

/// Turns free-text locations into coordinates.
///
/// Resolution never fails: whatever goes wrong, the caller gets the fallback
/// coordinates back.
#[derive(Clone)]
pub struct CoordinateResolver {
    weather: WeatherService,
    default_display_name: String,
}

impl CoordinateResolver {
    pub fn new(weather: WeatherService, default_display_name: impl Into<String>) -> Self {
        Self {
            weather,
            default_display_name: default_display_name.into(),
        }
    }

    /// Resolve `location_text`, using `fallback` when it is empty or cannot be geocoded.
    ///
    /// Empty input returns immediately without touching the network.
    pub async fn resolve(&self, location_text: &str, fallback: Coordinates) -> (Coordinates, String) {
        let location_text = location_text.trim();
        if location_text.is_empty() {
            tracing::debug!(
                "No location given, using default {} {}",
                self.default_display_name,
                fallback
            );
            return (fallback, self.default_display_name.clone());
        }

        match self.weather.geocode(location_text).await {
            Ok((coordinates, name)) => {
                let display_name = name.unwrap_or_else(|| location_text.to_string());
                tracing::info!("Resolved '{}' to {} {}", location_text, display_name, coordinates);
                (coordinates, display_name)
            }
            Err(e) => {
                tracing::warn!("{}, using default coordinates {}", e, fallback);
                (fallback, location_text.to_string())
            }
        }
    }
}
