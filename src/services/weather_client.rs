use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Could not find weather data for \"{0}\". Please check the city name.")]
    CityNotFound(String),
    #[error("Weather API Error: {0}")]
    ApiError(String),
    #[error("Weather API key is not configured")]
    NotConfigured,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmError {
    message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Temperature {
    pub current: i64,
    pub feels_like: i64,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    pub country: String,
}

/// Current conditions, rounded the way they are shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature: Temperature,
    pub condition: String,
    pub description: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub location: Location,
}

impl From<OwmResponse> for WeatherReport {
    fn from(raw: OwmResponse) -> Self {
        let (condition, description) = raw
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_default();

        Self {
            temperature: Temperature {
                current: raw.main.temp.round() as i64,
                feels_like: raw.main.feels_like.round() as i64,
                min: raw.main.temp_min.round() as i64,
                max: raw.main.temp_max.round() as i64,
            },
            condition,
            description,
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
            location: Location {
                name: raw.name,
                country: raw.sys.country,
            },
        }
    }
}

/// OpenWeatherMap current-weather client
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    units: String,
}

impl WeatherClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        units: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            units,
        }
    }

    pub async fn current_weather(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::NotConfigured)?;

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", city), ("appid", api_key), ("units", self.units.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<OwmResponse>().await?.into()),
            StatusCode::NOT_FOUND => Err(WeatherError::CityNotFound(city.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OwmError>(&text)
                    .map(|e| e.message)
                    .unwrap_or_else(|_| format!("{} {}", status.as_u16(), text));
                Err(WeatherError::ApiError(message))
            }
        }
    }
}
