use knowledge_chat::services::weather_client::{WeatherClient, WeatherError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, key: Option<&str>) -> WeatherClient {
    WeatherClient::new(
        reqwest::Client::new(),
        server.uri(),
        key.map(str::to_string),
        "metric".into(),
    )
}

#[tokio::test]
async fn test_current_weather_rounds_temperatures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("appid", "owm-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Paris",
            "sys": { "country": "FR" },
            "main": { "temp": 21.6, "feels_like": 20.4, "temp_min": 18.5, "temp_max": 23.2, "humidity": 40 },
            "weather": [{ "main": "Clear", "description": "clear sky" }],
            "wind": { "speed": 3.6 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client(&server, Some("owm-key")).current_weather("Paris").await.unwrap();

    assert_eq!(report.temperature.current, 22);
    assert_eq!(report.temperature.feels_like, 20);
    assert_eq!(report.temperature.min, 19);
    assert_eq!(report.temperature.max, 23);
    assert_eq!(report.condition, "Clear");
    assert_eq!(report.location.country, "FR");
    assert_eq!(report.humidity, 40);
}

#[tokio::test]
async fn test_unknown_city() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "cod": "404", "message": "city not found" })))
        .mount(&server)
        .await;

    let err = client(&server, Some("owm-key")).current_weather("Atlantis").await.unwrap_err();
    assert!(matches!(err, WeatherError::CityNotFound(ref city) if city == "Atlantis"));
    assert!(err.to_string().contains("Please check the city name"));
}

#[tokio::test]
async fn test_provider_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "cod": 401, "message": "Invalid API key" })))
        .mount(&server)
        .await;

    let err = client(&server, Some("bad")).current_weather("Paris").await.unwrap_err();
    assert_eq!(err.to_string(), "Weather API Error: Invalid API key");
}

#[tokio::test]
async fn test_missing_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, Some("")).current_weather("Paris").await.unwrap_err();
    assert!(matches!(err, WeatherError::NotConfigured));
}
