// promptgate-core/src/plugins/weather.rs
//! Simulated weather data provider.
//!
//! Pure table lookups keyed by lowercase city name. Cannot fail, so there is
//! no retry or resilience machinery around it.

/// Simulated weather plugin covering five demo cities.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherPlugin;

impl WeatherPlugin {
    pub fn new() -> Self {
        Self
    }

    /// Current conditions for `city`, or a "not available" sentence for
    /// anything outside the demo table.
    pub fn current_weather(&self, city: &str) -> String {
        let data = match city.to_lowercase().as_str() {
            "new york" => Some((72, "Sunny")),
            "london" => Some((65, "Cloudy")),
            "tokyo" => Some((80, "Partly Cloudy")),
            "sydney" => Some((85, "Clear")),
            "paris" => Some((70, "Rainy")),
            _ => None,
        };

        match data {
            Some((temperature, condition)) => format!(
                "The current weather in {city} is {condition} with a temperature of {temperature}°F."
            ),
            None => format!("Weather data for {city} is not available."),
        }
    }

    /// Multi-day forecast text for `city`.
    pub fn forecast(&self, city: &str) -> String {
        match city.to_lowercase().as_str() {
            "new york" => {
                "Sunny today, with rain expected tomorrow. Temperatures between 65-75°F.".to_string()
            }
            "london" => {
                "Cloudy with occasional showers throughout the week. Temperatures between 60-68°F."
                    .to_string()
            }
            "tokyo" => "Warm and humid with clear skies. Temperatures between 75-85°F.".to_string(),
            "sydney" => "Hot and sunny all week. Temperatures between 80-90°F.".to_string(),
            "paris" => "Rain expected to clear by tomorrow. Temperatures between 65-72°F.".to_string(),
            _ => format!("Forecast data for {city} is not available."),
        }
    }
}
