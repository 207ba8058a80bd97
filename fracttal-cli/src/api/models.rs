//! Request and response bodies for the Fracttal endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OAuth client-credentials response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
}

/// `GET /api/meters?serial=...`
#[derive(Debug, Deserialize)]
pub struct MeterListResponse {
    #[serde(default)]
    pub data: Option<Vec<MeterRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct MeterRecord {
    #[serde(default)]
    pub last_data: Option<LastData>,
}

#[derive(Debug, Deserialize)]
pub struct LastData {
    #[serde(default)]
    pub accumulated_value: Option<Value>,
}

impl MeterListResponse {
    /// Accumulated value of the first meter, if any
    pub fn accumulated_value(&self) -> Option<f64> {
        let meter = self.data.as_ref()?.first()?;
        let value = meter.last_data.as_ref()?.accumulated_value.as_ref()?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// Body of `PUT /api/meter_reading?code=...`
#[derive(Debug, Clone, Serialize)]
pub struct MeterReadingPayload {
    pub date: String,
    pub value: f64,
    pub serial: String,
    pub is_historical: bool,
}

/// Result of a meter update, successful or not, with a human-readable reason
#[derive(Debug, Clone, PartialEq)]
pub struct MeterUpdateResult {
    pub success: bool,
    pub message: String,
}

impl MeterUpdateResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> MeterListResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_meter_value() {
        let resp = parse(json!({
            "data": [
                { "last_data": { "accumulated_value": 1234.5 } },
                { "last_data": { "accumulated_value": 99 } }
            ]
        }));
        assert_eq!(resp.accumulated_value(), Some(1234.5));
    }

    #[test]
    fn test_numeric_string_value() {
        let resp = parse(json!({ "data": [ { "last_data": { "accumulated_value": "870" } } ] }));
        assert_eq!(resp.accumulated_value(), Some(870.0));
    }

    #[test]
    fn test_absent_cases() {
        assert_eq!(parse(json!({})).accumulated_value(), None);
        assert_eq!(parse(json!({ "data": null })).accumulated_value(), None);
        assert_eq!(parse(json!({ "data": [] })).accumulated_value(), None);
        assert_eq!(parse(json!({ "data": [ {} ] })).accumulated_value(), None);
        assert_eq!(
            parse(json!({ "data": [ { "last_data": { "accumulated_value": null } } ] }))
                .accumulated_value(),
            None
        );
    }

    #[test]
    fn test_payload_shape() {
        let payload = MeterReadingPayload {
            date: "2024-05-01T10:00:00-03:00".to_string(),
            value: 1050.0,
            serial: "ER-1022".to_string(),
            is_historical: false,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "date": "2024-05-01T10:00:00-03:00",
                "value": 1050.0,
                "serial": "ER-1022",
                "is_historical": false
            })
        );
    }
}
