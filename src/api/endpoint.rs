//! Remote endpoints, request parameters and cache keys
//!
//! Each SolarEdge site resource is an [`Endpoint`] with a fixed freshness
//! window. Parameters are kept in a sorted map so the cache key derived from
//! them does not depend on the order callers inserted them in.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cache;

/// Time format expected by the API for `startTime`/`endTime`
pub const API_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// TTL applied when an endpoint has no entry in the freshness table
pub const DEFAULT_TTL_MINUTES: i64 = 15;

/// A site resource exposed by the monitoring API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Details,
    Overview,
    Power,
    Energy,
    EnergyDetails,
    CurrentPowerFlow,
    EnvBenefits,
    Inventory,
    PowerDetails,
}

impl Endpoint {
    /// All known endpoints
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Details,
        Endpoint::Overview,
        Endpoint::Power,
        Endpoint::Energy,
        Endpoint::EnergyDetails,
        Endpoint::CurrentPowerFlow,
        Endpoint::EnvBenefits,
        Endpoint::Inventory,
        Endpoint::PowerDetails,
    ];

    /// Path segment used in the request URL and in cache keys
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Details => "details",
            Endpoint::Overview => "overview",
            Endpoint::Power => "power",
            Endpoint::Energy => "energy",
            Endpoint::EnergyDetails => "energyDetails",
            Endpoint::CurrentPowerFlow => "currentPowerFlow",
            Endpoint::EnvBenefits => "envBenefits",
            Endpoint::Inventory => "inventory",
            Endpoint::PowerDetails => "powerDetails",
        }
    }

    /// Parses an endpoint from its path segment (case-sensitive)
    pub fn from_name(name: &str) -> Option<Endpoint> {
        Self::ALL.iter().copied().find(|e| e.name() == name)
    }

    /// How long a cached payload is served without a network call
    ///
    /// Aggregate `energy` is kept for a day. `energyDetails` backs charts that
    /// end on today, so it is refreshed as often as the dashboard reloads.
    pub fn ttl(&self) -> Duration {
        match self {
            Endpoint::Details => Duration::hours(1),
            Endpoint::Overview => Duration::minutes(15),
            Endpoint::Power => Duration::minutes(15),
            Endpoint::Energy => Duration::hours(24),
            Endpoint::EnergyDetails => Duration::minutes(DEFAULT_TTL_MINUTES),
            Endpoint::CurrentPowerFlow => Duration::minutes(10),
            Endpoint::EnvBenefits => Duration::hours(12),
            Endpoint::Inventory => Duration::hours(12),
            Endpoint::PowerDetails => Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    /// Parameter names the API requires for this endpoint
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Endpoint::Power => &["startTime", "endTime"],
            Endpoint::Energy | Endpoint::EnergyDetails => &["startTime", "endTime", "timeUnit"],
            Endpoint::PowerDetails => &["startTime", "endTime"],
            _ => &[],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter value: the API only takes strings and numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Float(n)
    }
}

/// Query parameters for one request, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams(BTreeMap<String, ParamValue>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs for a query string, in key order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Canonical JSON form (sorted keys, no whitespace)
    pub fn canonical_json(&self) -> String {
        // A map of strings and finite numbers always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RequestParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Stable storage key for one endpoint + parameter set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: Endpoint, params: &RequestParams) -> Self {
        Self(cache::data_key(endpoint.name(), &params.canonical_json()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats a timestamp the way the API expects (`YYYY-MM-DD HH:MM:SS`)
pub fn format_api_time(time: NaiveDateTime) -> String {
    time.format(API_TIME_FORMAT).to_string()
}

/// First second of `date` in API format
pub fn day_start(date: NaiveDate) -> String {
    format_api_time(date.and_time(NaiveTime::MIN))
}

/// Last second of `date` in API format
pub fn day_end(date: NaiveDate) -> String {
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    format_api_time(date.and_time(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_names_roundtrip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.name()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_name("Overview"), None);
        assert_eq!(Endpoint::from_name("bogus"), None);
    }

    #[test]
    fn test_ttl_table() {
        assert_eq!(Endpoint::Details.ttl(), Duration::hours(1));
        assert_eq!(Endpoint::Overview.ttl(), Duration::minutes(15));
        assert_eq!(Endpoint::CurrentPowerFlow.ttl(), Duration::minutes(10));
        assert_eq!(Endpoint::EnergyDetails.ttl(), Duration::minutes(15));
        assert_eq!(Endpoint::Energy.ttl(), Duration::hours(24));
        assert_eq!(Endpoint::Inventory.ttl(), Duration::hours(12));
    }

    #[test]
    fn test_cache_key_ignores_insertion_order() {
        let a = RequestParams::new()
            .with("startTime", "2024-07-01 00:00:00")
            .with("endTime", "2024-07-01 23:59:59");
        let b = RequestParams::new()
            .with("endTime", "2024-07-01 23:59:59")
            .with("startTime", "2024-07-01 00:00:00");

        assert_eq!(CacheKey::new(Endpoint::Power, &a), CacheKey::new(Endpoint::Power, &b));
        assert_eq!(
            CacheKey::new(Endpoint::Power, &a).as_str(),
            r#"solar_data_power_{"endTime":"2024-07-01 23:59:59","startTime":"2024-07-01 00:00:00"}"#
        );
    }

    #[test]
    fn test_cache_key_without_params() {
        let key = CacheKey::new(Endpoint::Overview, &RequestParams::new());
        assert_eq!(key.as_str(), "solar_data_overview_{}");
    }

    #[test]
    fn test_cache_key_differs_by_endpoint_and_values() {
        let p = RequestParams::new().with("timeUnit", "DAY");
        let q = RequestParams::new().with("timeUnit", "MONTH");
        assert_ne!(CacheKey::new(Endpoint::Energy, &p), CacheKey::new(Endpoint::EnergyDetails, &p));
        assert_ne!(CacheKey::new(Endpoint::Energy, &p), CacheKey::new(Endpoint::Energy, &q));
    }

    #[test]
    fn test_numeric_params_serialize_as_numbers() {
        let params = RequestParams::new().with("limit", 5i64).with("ratio", 0.5);
        assert_eq!(params.canonical_json(), r#"{"limit":5,"ratio":0.5}"#);
        assert_eq!(
            params.query_pairs(),
            vec![
                ("limit".to_string(), "5".to_string()),
                ("ratio".to_string(), "0.5".to_string())
            ]
        );
    }

    #[test]
    fn test_day_bounds_use_api_format() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        assert_eq!(day_start(date), "2024-07-15 00:00:00");
        assert_eq!(day_end(date), "2024-07-15 23:59:59");
    }

    #[test]
    fn test_required_params() {
        assert!(Endpoint::Overview.required_params().is_empty());
        assert_eq!(Endpoint::Power.required_params(), &["startTime", "endTime"]);
        assert!(Endpoint::EnergyDetails.required_params().contains(&"timeUnit"));
    }
}
