//! Prediction payloads and responses.
//!
//! Required fields (`revenue`, a headcount and `industry`) are never
//! defaulted: a payload without them is rejected so that a forgotten field
//! cannot pass as a legitimately empty one. Every other field falls back to
//! the documented default.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RequestError;
use crate::features::{CategoryOutcome, Reconciliation};
use crate::record::{
    CompanyProfile, DEFAULT_FUNDING_AMOUNT, DEFAULT_FUNDING_ROUNDS, DEFAULT_MARKET_SHARE,
    DEFAULT_YEAR_FOUNDED,
};

/// Headcount may arrive under either name; `team_size` wins when both exist.
const HEADCOUNT_FIELDS: [&str; 2] = ["team_size", "employees"];

/// Largest accepted money amount, in millions of USD.
pub const MAX_AMOUNT_MILLIONS: f64 = 1e12;

/// Validate a JSON payload and reduce it to a [`CompanyProfile`].
pub fn parse_payload(payload: &Value) -> Result<CompanyProfile, RequestError> {
    let object = payload
        .as_object()
        .ok_or_else(|| RequestError::Malformed("payload must be a JSON object".to_string()))?;

    let revenue = required_number(object, "revenue")?;
    if revenue < 0.0 {
        return Err(invalid("revenue", "must not be negative"));
    }
    if revenue > MAX_AMOUNT_MILLIONS {
        return Err(invalid("revenue", "exceeds the supported range"));
    }

    let team_size = headcount(object)?;

    let industry = required_string(object, "industry")?;

    let funding_rounds = match optional_number(object, "funding_rounds")? {
        Some(value) if value < 0.0 => return Err(invalid("funding_rounds", "must not be negative")),
        Some(value) => value.round() as u32,
        None => DEFAULT_FUNDING_ROUNDS,
    };

    let funding_amount = match optional_number(object, "funding_amount")? {
        Some(value) if value < 0.0 => return Err(invalid("funding_amount", "must not be negative")),
        Some(value) if value > MAX_AMOUNT_MILLIONS => {
            return Err(invalid("funding_amount", "exceeds the supported range"))
        }
        Some(value) => value,
        None => DEFAULT_FUNDING_AMOUNT,
    };

    Ok(CompanyProfile {
        revenue,
        team_size,
        industry,
        funding_rounds,
        funding_amount,
        market_share: optional_number(object, "market_share")?.unwrap_or(DEFAULT_MARKET_SHARE),
        profitable: optional_flag(object, "profitable")?.unwrap_or(false),
        year_founded: optional_number(object, "year_founded")?
            .map(|year| year.round() as i32)
            .unwrap_or(DEFAULT_YEAR_FOUNDED),
        region: optional_string(object, "region")?,
        exit_status: optional_string(object, "exit_status")?,
    })
}

fn invalid(field: &'static str, reason: &str) -> RequestError {
    RequestError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// `None` for absent keys and explicit nulls.
fn present<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|value| !value.is_null())
}

fn number_value(field: &'static str, value: &Value) -> Result<f64, RequestError> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(invalid(field, &format!("expected a number, got {}", value))),
    }
}

fn required_number(object: &Map<String, Value>, field: &'static str) -> Result<f64, RequestError> {
    let value = present(object, field).ok_or(RequestError::MissingField(field))?;
    number_value(field, value)
}

fn optional_number(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, RequestError> {
    present(object, field)
        .map(|value| number_value(field, value))
        .transpose()
}

fn headcount(object: &Map<String, Value>) -> Result<u32, RequestError> {
    let (field, value) = HEADCOUNT_FIELDS
        .iter()
        .find_map(|field| present(object, field).map(|value| (*field, value)))
        .ok_or(RequestError::MissingField(HEADCOUNT_FIELDS[0]))?;

    let count = number_value(field, value)?.round();
    if count < 1.0 || count > f64::from(u32::MAX) {
        return Err(invalid(field, "must be at least 1"));
    }
    Ok(count as u32)
}

fn required_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, RequestError> {
    optional_string(object, field)?.ok_or(RequestError::MissingField(field))
}

fn optional_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, RequestError> {
    match present(object, field) {
        None => Ok(None),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(other) => Err(invalid(field, &format!("expected a string, got {}", other))),
    }
}

fn optional_flag(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<bool>, RequestError> {
    match present(object, field) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::Number(number)) => Ok(Some(number.as_f64().unwrap_or(0.0) != 0.0)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" | "" => Ok(Some(false)),
            _ => Err(invalid(field, &format!("expected a boolean, got {:?}", text))),
        },
        Some(other) => Err(invalid(field, &format!("expected a boolean, got {}", other))),
    }
}

/// Echo of the validated input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSummary {
    pub revenue: f64,
    pub team_size: u32,
    pub industry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<String>,
}

impl From<&CompanyProfile> for InputSummary {
    fn from(profile: &CompanyProfile) -> Self {
        Self {
            revenue: profile.revenue,
            team_size: profile.team_size,
            industry: profile.industry.clone(),
            region: profile.region.clone(),
            exit_status: profile.exit_status.clone(),
        }
    }
}

/// Which path produced the number, for callers and tests alike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub scaling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<CategoryOutcome>,
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResponse {
    /// Valuation in USD, rounded to cents.
    pub valuation: f64,
    /// Valuation in millions of USD before unit conversion.
    pub valuation_millions: f64,
    pub currency: &'static str,
    pub source: &'static str,
    pub health: &'static str,
    pub input: InputSummary,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_payload_is_parsed() {
        let payload = json!({
            "revenue": 25,
            "employees": 100,
            "industry": "FinTech",
            "region": "North America",
            "exit_status": "Private",
            "funding_amount": 50,
            "funding_rounds": 3,
            "market_share": 5,
            "profitable": false,
            "year_founded": 2018
        });

        let profile = parse_payload(&payload).expect("valid payload");
        assert_eq!(profile.revenue, 25.0);
        assert_eq!(profile.team_size, 100);
        assert_eq!(profile.industry, "FinTech");
        assert_eq!(profile.region.as_deref(), Some("North America"));
        assert_eq!(profile.funding_rounds, 3);
        assert_eq!(profile.year_founded, 2018);
        assert!(!profile.profitable);
    }

    #[test]
    fn optional_fields_take_defaults() {
        let payload = json!({"revenue": 1.5, "team_size": 4, "industry": "IoT"});
        let profile = parse_payload(&payload).expect("valid payload");

        assert_eq!(profile.funding_rounds, DEFAULT_FUNDING_ROUNDS);
        assert_eq!(profile.funding_amount, DEFAULT_FUNDING_AMOUNT);
        assert_eq!(profile.market_share, DEFAULT_MARKET_SHARE);
        assert_eq!(profile.year_founded, DEFAULT_YEAR_FOUNDED);
        assert!(!profile.profitable);
        assert_eq!(profile.region, None);
    }

    #[test]
    fn missing_industry_is_rejected_by_name() {
        let payload = json!({"revenue": 25, "employees": 100});
        let err = parse_payload(&payload).unwrap_err();
        assert_eq!(err, RequestError::MissingField("industry"));
        assert_eq!(err.field(), Some("industry"));
    }

    #[test]
    fn missing_headcount_and_revenue_are_rejected() {
        let err = parse_payload(&json!({"revenue": 1, "industry": "IoT"})).unwrap_err();
        assert_eq!(err, RequestError::MissingField("team_size"));

        let err = parse_payload(&json!({"team_size": 2, "industry": "IoT", "revenue": null}))
            .unwrap_err();
        assert_eq!(err, RequestError::MissingField("revenue"));
    }

    #[test]
    fn wrong_types_are_invalid_fields() {
        let err = parse_payload(&json!({"revenue": "lots", "team_size": 2, "industry": "IoT"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("revenue"));

        let err = parse_payload(&json!({"revenue": 1, "team_size": 0, "industry": "IoT"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("team_size"));

        let err = parse_payload(&json!({"revenue": 1, "team_size": 2, "industry": 7}))
            .unwrap_err();
        assert_eq!(err.field(), Some("industry"));
    }

    #[test]
    fn numeric_strings_and_flag_variants_are_accepted() {
        let payload = json!({
            "revenue": " 2.5 ",
            "team_size": "12",
            "industry": "Gaming",
            "profitable": "yes"
        });
        let profile = parse_payload(&payload).expect("valid payload");
        assert_eq!(profile.revenue, 2.5);
        assert_eq!(profile.team_size, 12);
        assert!(profile.profitable);
    }

    #[test]
    fn amounts_beyond_supported_range_are_rejected() {
        let err = parse_payload(&json!({"revenue": 1e303, "team_size": 5, "industry": "IoT"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("revenue"));

        let err = parse_payload(&json!({
            "revenue": 1,
            "team_size": 5,
            "industry": "IoT",
            "funding_amount": 1e300
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("funding_amount"));

        let profile = parse_payload(&json!({
            "revenue": MAX_AMOUNT_MILLIONS,
            "team_size": 5,
            "industry": "IoT"
        }))
        .expect("upper bound is accepted");
        assert_eq!(profile.revenue, MAX_AMOUNT_MILLIONS);
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let err = parse_payload(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }
}
