use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::{Tool, ToolContext, ToolError, ToolKind, ToolOutput};
use crate::services::weather_client::WeatherClient;

#[derive(Debug, Deserialize, Validate)]
pub struct WeatherArgs {
    #[validate(length(min = 1))]
    pub city: String,
}

pub struct WeatherTool {
    client: WeatherClient,
}

impl WeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    type Args = WeatherArgs;
    const KIND: ToolKind = ToolKind::WeatherLookup;

    fn description(&self) -> &'static str {
        "Get the current weather for a city: temperature, conditions, humidity and wind."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string", "description": "City name, optionally with country code (e.g. \"Paris,FR\")" }
            },
            "required": ["city"]
        })
    }

    async fn run(&self, args: WeatherArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let report = self
            .client
            .current_weather(args.city.trim())
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let data = serde_json::to_value(&report).map_err(|e| ToolError::Upstream(e.to_string()))?;
        Ok(ToolOutput::new(data).with_meta("city", args.city))
    }
}
