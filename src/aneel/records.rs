//! CKAN datastore response envelope and record field helpers.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::domain::TariffFlag;
use crate::error::{Result, TariffError};

/// Records are heterogeneous field/value maps; the fields we care about are
/// pulled out by name below.
pub(crate) type Record = serde_json::Map<String, Value>;

#[derive(Debug, Deserialize)]
pub(crate) struct DatastoreResponse {
    #[serde(default)]
    pub success: bool,
    pub result: Option<DatastoreResult>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatastoreResult {
    #[serde(default)]
    pub records: Vec<Record>,
}

impl DatastoreResponse {
    /// Unwrap the envelope, treating `success: false` as an upstream
    /// failure. The error payload is opaque diagnostic text, never parsed.
    pub(crate) fn into_records(self) -> Result<Vec<Record>> {
        if !self.success {
            let detail = self
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(TariffError::UpstreamUnavailable(format!(
                "upstream reported failure: {detail}"
            )));
        }
        Ok(self.result.map(|r| r.records).unwrap_or_default())
    }
}

/// Normalize decimal-comma notation ("123,45") and parse as a float.
pub(crate) fn parse_decimal_comma(raw: &str) -> Result<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| TariffError::UpstreamFormat(format!("invalid numeric value: {raw:?}")))
}

/// Best-effort numeric field: JSON numbers pass through, strings go through
/// decimal-comma normalization, anything else (or absent) is 0.0.
pub(crate) fn field_or_zero(record: &Record, field: &str) -> f64 {
    match record.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_decimal_comma(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Strict numeric field for the base-tariff components; a missing or
/// unparsable component fails the whole fetch.
pub(crate) fn require_decimal(record: &Record, field: &str) -> Result<f64> {
    match record.get(field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| TariffError::UpstreamFormat(format!("field {field} is not a float"))),
        Some(Value::String(s)) => parse_decimal_comma(s),
        Some(other) => Err(TariffError::UpstreamFormat(format!(
            "field {field} has unexpected type: {other}"
        ))),
        None => Err(TariffError::UpstreamFormat(format!(
            "field {field} missing from record"
        ))),
    }
}

/// Extract the four per-flag surcharges from a bandeiras record. Green
/// carries no surcharge and is fixed at zero regardless of upstream content.
pub(crate) fn surcharges_from_record(record: &Record) -> HashMap<TariffFlag, f64> {
    TariffFlag::iter()
        .map(|flag| {
            let value = match flag {
                TariffFlag::Green => 0.0,
                TariffFlag::Yellow => field_or_zero(record, "VlrBandeiraAmarela"),
                TariffFlag::RedLevel1 => field_or_zero(record, "VlrBandeiraVermelhaPatamar1"),
                TariffFlag::RedLevel2 => field_or_zero(record, "VlrBandeiraVermelhaPatamar2"),
            };
            (flag, value)
        })
        .collect()
}
