//! JSON Wire Records
//!
//! Flattened JSON shapes for ticks, models and errors. Prices are encoded as
//! JSON numbers; timestamps as RFC 3339 in UTC.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::pair::Pair;
use crate::domain::price::{Parameters, PriceModel, PriceTick};

/// Flattened price tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Tick kind.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Base symbol.
    pub base: String,
    /// Quote symbol.
    pub quote: String,
    /// Price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Best bid.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub bid: Option<Decimal>,
    /// Best ask.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub ask: Option<Decimal>,
    /// 24h volume.
    #[serde(rename = "vol24h", default, with = "rust_decimal::serde::float_option")]
    pub volume_24h: Option<Decimal>,
    /// Observation time (UTC).
    pub ts: DateTime<Utc>,
    /// Provider parameters.
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub params: Parameters,
    /// Constituent ticks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<PriceRecord>,
    /// Error marker.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl From<&PriceTick> for PriceRecord {
    fn from(tick: &PriceTick) -> Self {
        Self {
            kind: tick.kind.clone(),
            base: tick.pair.base.clone(),
            quote: tick.pair.quote.clone(),
            price: tick.price,
            bid: tick.bid,
            ask: tick.ask,
            volume_24h: tick.volume_24h,
            ts: tick.timestamp,
            params: tick.parameters.clone(),
            prices: tick.ticks.iter().map(Self::from).collect(),
            error: tick.error.clone().unwrap_or_default(),
        }
    }
}

impl From<PriceRecord> for PriceTick {
    fn from(record: PriceRecord) -> Self {
        Self {
            kind: record.kind,
            pair: Pair::new(record.base, record.quote),
            price: record.price,
            bid: record.bid,
            ask: record.ask,
            volume_24h: record.volume_24h,
            timestamp: record.ts,
            parameters: record.params,
            ticks: record.prices.into_iter().map(Self::from).collect(),
            error: Some(record.error).filter(|e| !e.is_empty()),
        }
    }
}

/// Flattened provider model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Base symbol.
    pub base: String,
    /// Quote symbol.
    pub quote: String,
    /// Node parameters.
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub params: Parameters,
    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelRecord>,
}

impl From<&PriceModel> for ModelRecord {
    fn from(model: &PriceModel) -> Self {
        Self {
            kind: model.kind.clone(),
            base: model.pair.base.clone(),
            quote: model.pair.quote.clone(),
            params: model.parameters.clone(),
            models: model.models.iter().map(Self::from).collect(),
        }
    }
}

/// In-band error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn serializes_wire_field_names() {
        let mut tick = PriceTick::new(
            Pair::new("BTC", "USD"),
            Decimal::new(6_500_025, 2),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
        .with_kind("origin");
        tick.volume_24h = Some(Decimal::new(1200, 0));

        let value = serde_json::to_value(PriceRecord::from(&tick)).unwrap();

        assert_eq!(value["type"], "origin");
        assert_eq!(value["base"], "BTC");
        assert_eq!(value["quote"], "USD");
        assert_eq!(value["price"], 65000.25);
        assert_eq!(value["vol24h"], 1200.0);
        assert!(value["bid"].is_null());
        assert_eq!(value["ts"], "2024-03-01T12:00:00Z");
        assert!(value.get("params").is_none());
        assert!(value.get("prices").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_marker_maps_both_ways() {
        let tick = PriceTick::new(Pair::new("BTC", "USD"), Decimal::ONE, Utc::now())
            .with_error("stale");
        let record = PriceRecord::from(&tick);
        assert_eq!(record.error, "stale");
        assert_eq!(PriceTick::from(record).error.as_deref(), Some("stale"));

        let clean = PriceRecord::from(&PriceTick::new(Pair::new("BTC", "USD"), Decimal::ONE, Utc::now()));
        assert_eq!(PriceTick::from(clean).error, None);
    }

    #[test]
    fn model_record_nests_children() {
        let model = PriceModel {
            kind: "median".into(),
            pair: Pair::new("ETH", "USD"),
            parameters: Parameters::new(),
            models: vec![PriceModel {
                kind: "origin".into(),
                pair: Pair::new("ETH", "USD"),
                parameters: [("origin".to_string(), "static".to_string())].into(),
                models: vec![],
            }],
        };

        let value = serde_json::to_value(ModelRecord::from(&model)).unwrap();
        assert_eq!(value["type"], "median");
        assert_eq!(value["models"][0]["type"], "origin");
        assert_eq!(value["models"][0]["params"]["origin"], "static");
    }
}
