//! Response schemas for the SolarEdge site endpoints
//!
//! The cached client stores payloads as raw JSON, but every live response is
//! checked against the schema of its endpoint before it is cached, so a
//! payload of the wrong shape is treated like a failed request. The typed
//! structs are also what the dashboard reads through [`SolarSite`].

pub mod demo;
pub mod site;

pub use site::{Sourced, SolarSite, TimeUnit};

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, Endpoint, API_TIME_FORMAT};

/// `details` response
#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub details: SiteDetails,
}

/// Static site information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDetails {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub status: Option<String>,
    /// Installed peak power in kW
    pub peak_power: Option<f64>,
    pub installation_date: Option<String>,
}

/// `overview` response
#[derive(Debug, Clone, Deserialize)]
pub struct OverviewResponse {
    pub overview: Overview,
}

/// Energy totals and current output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub last_update_time: Option<String>,
    pub life_time_data: Option<EnergyTotal>,
    pub last_year_data: Option<EnergyTotal>,
    pub last_month_data: Option<EnergyTotal>,
    pub last_day_data: Option<EnergyTotal>,
    pub current_power: Option<CurrentPower>,
}

impl Overview {
    pub fn is_empty(&self) -> bool {
        self == &Overview::default()
    }
}

/// Energy produced over a period, in Wh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTotal {
    pub energy: Option<f64>,
    pub revenue: Option<f64>,
}

/// Instantaneous output, in W
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentPower {
    pub power: Option<f64>,
}

/// One sample of a time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sample time as `YYYY-MM-DD HH:MM:SS`
    pub date: String,
    /// Missing samples come back as `null`
    pub value: Option<f64>,
}

impl Reading {
    pub fn time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, API_TIME_FORMAT).ok()
    }

    /// Value with missing samples read as zero
    pub fn value_or_zero(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// A single-series response body (`power`, `energy`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub time_unit: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub values: Vec<Reading>,
}

/// `power` response
#[derive(Debug, Clone, Deserialize)]
pub struct PowerResponse {
    pub power: TimeSeries,
}

/// `energy` response
#[derive(Debug, Clone, Deserialize)]
pub struct EnergyResponse {
    pub energy: TimeSeries,
}

/// A per-meter response body (`energyDetails`, `powerDetails`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterSeries {
    pub time_unit: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub meters: Vec<Meter>,
}

impl MeterSeries {
    /// Finds a meter by type, ignoring case (`Production`, `PRODUCTION`)
    pub fn meter(&self, meter_type: &str) -> Option<&Meter> {
        self.meters
            .iter()
            .find(|m| m.meter_type.eq_ignore_ascii_case(meter_type))
    }

    /// Readings of a meter, or an empty slice if the meter is absent
    pub fn values(&self, meter_type: &str) -> &[Reading] {
        self.meter(meter_type)
            .map(|m| m.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    #[serde(rename = "type")]
    pub meter_type: String,
    #[serde(default)]
    pub values: Vec<Reading>,
}

/// `energyDetails` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyDetailsResponse {
    pub energy_details: MeterSeries,
}

/// `powerDetails` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerDetailsResponse {
    pub power_details: MeterSeries,
}

/// `currentPowerFlow` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerFlowResponse {
    pub site_current_power_flow: RawPowerFlow,
}

/// Power flow as the API names it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPowerFlow {
    pub unit: Option<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(rename = "PV")]
    pub pv: Option<FlowNode>,
    #[serde(rename = "GRID")]
    pub grid: Option<FlowNode>,
    #[serde(rename = "LOAD")]
    pub load: Option<FlowNode>,
    #[serde(rename = "STORAGE")]
    pub storage: Option<FlowNode>,
}

/// Power flow with lower-case node names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerFlow {
    pub unit: Option<String>,
    pub pv: FlowNode,
    pub grid: FlowNode,
    pub load: FlowNode,
    pub storage: Option<FlowNode>,
    pub connections: Vec<Connection>,
}

impl PowerFlow {
    pub fn is_empty(&self) -> bool {
        self == &PowerFlow::default()
    }
}

impl From<RawPowerFlow> for PowerFlow {
    fn from(raw: RawPowerFlow) -> Self {
        Self {
            unit: raw.unit,
            pv: raw.pv.unwrap_or_default(),
            grid: raw.grid.unwrap_or_default(),
            load: raw.load.unwrap_or_default(),
            storage: raw.storage,
            connections: raw.connections,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub status: Option<String>,
    pub current_power: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

/// `envBenefits` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvBenefitsResponse {
    pub env_benefits: EnvBenefits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvBenefits {
    pub gas_emission_saved: Option<GasEmissions>,
    pub trees_planted: Option<f64>,
    pub light_bulbs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasEmissions {
    pub units: Option<String>,
    pub co2: Option<f64>,
    pub so2: Option<f64>,
    pub nox: Option<f64>,
}

/// `inventory` response
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryResponse {
    #[serde(rename = "Inventory")]
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub inverters: Vec<Inverter>,
}

impl Inventory {
    /// Inverters reporting an online status
    pub fn online_count(&self) -> usize {
        self.inverters.iter().filter(|i| i.is_online()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inverter {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "SN")]
    pub serial_number: Option<String>,
    /// Reported as either `1` or `"1"` when online
    pub status: Option<Value>,
}

impl Inverter {
    pub fn is_online(&self) -> bool {
        match &self.status {
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => s == "1",
            _ => false,
        }
    }
}

/// Checks that a payload has the shape expected for `endpoint`
pub fn validate(endpoint: Endpoint, payload: &Value) -> Result<(), serde_json::Error> {
    match endpoint {
        Endpoint::Details => check::<DetailsResponse>(payload),
        Endpoint::Overview => check::<OverviewResponse>(payload),
        Endpoint::Power => check::<PowerResponse>(payload),
        Endpoint::Energy => check::<EnergyResponse>(payload),
        Endpoint::EnergyDetails => check::<EnergyDetailsResponse>(payload),
        Endpoint::PowerDetails => check::<PowerDetailsResponse>(payload),
        Endpoint::CurrentPowerFlow => check::<PowerFlowResponse>(payload),
        Endpoint::EnvBenefits => check::<EnvBenefitsResponse>(payload),
        Endpoint::Inventory => check::<InventoryResponse>(payload),
    }
}

fn check<T: DeserializeOwned>(payload: &Value) -> Result<(), serde_json::Error> {
    T::deserialize(payload).map(|_| ())
}

/// Decodes a payload returned by the client into its typed response
pub fn decode<T: DeserializeOwned>(endpoint: Endpoint, payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::InvalidPayload {
        endpoint: endpoint.name().to_string(),
        reason: e.to_string(),
    })
}
