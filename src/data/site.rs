//! Typed per-endpoint access to one site
//!
//! Thin layer over [`CachedApiClient`]: builds each endpoint's parameters,
//! decodes the payload into its schema, and unwraps the response envelope
//! (`siteCurrentPowerFlow` becomes a [`PowerFlow`] with lower-case nodes,
//! `Inventory` becomes [`Inventory`], and so on).

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{
    decode, DetailsResponse, EnergyDetailsResponse, EnergyResponse, EnvBenefits,
    EnvBenefitsResponse, Inventory, InventoryResponse, MeterSeries, Overview, OverviewResponse,
    PowerDetailsResponse, PowerFlow, PowerFlowResponse, PowerResponse, SiteDetails, TimeSeries,
};
use crate::api::{
    day_end, day_start, format_api_time, ApiError, CachedApiClient, DataSource, Endpoint,
    RequestParams,
};

/// Meters requested for energy breakdowns
pub const ENERGY_METERS: &str = "PRODUCTION,PURCHASED";

/// Meters requested for the daily power curve
pub const POWER_METERS: &str = "PRODUCTION,CONSUMPTION,PURCHASED";

/// Aggregation period for energy queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    QuarterOfAnHour,
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::QuarterOfAnHour => "QUARTER_OF_AN_HOUR",
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
            TimeUnit::Year => "YEAR",
        }
    }
}

/// Parameters for a start/end window spanning whole days
fn day_range(start: NaiveDate, end: NaiveDate) -> RequestParams {
    RequestParams::new()
        .with("startTime", day_start(start))
        .with("endTime", day_end(end))
}

/// Parameters for `power`
pub fn power_params(start: NaiveDateTime, end: NaiveDateTime) -> RequestParams {
    RequestParams::new()
        .with("startTime", format_api_time(start))
        .with("endTime", format_api_time(end))
}

/// Parameters for `energy`
pub fn energy_params(start: NaiveDate, end: NaiveDate, unit: TimeUnit) -> RequestParams {
    day_range(start, end).with("timeUnit", unit.as_str())
}

/// Parameters for `energyDetails`
pub fn energy_details_params(start: NaiveDate, end: NaiveDate, unit: TimeUnit) -> RequestParams {
    energy_params(start, end, unit).with("meters", ENERGY_METERS)
}

/// Parameters for `powerDetails` covering one day
pub fn power_details_params(date: NaiveDate) -> RequestParams {
    day_range(date, date).with("meters", POWER_METERS)
}

/// Parameters for `endpoint` scoped to a single day, as the dashboard uses it
pub fn default_params(endpoint: Endpoint, date: NaiveDate) -> RequestParams {
    match endpoint {
        Endpoint::Power => day_range(date, date),
        Endpoint::Energy => energy_params(date, date, TimeUnit::Day),
        Endpoint::EnergyDetails => energy_details_params(date, date, TimeUnit::Day),
        Endpoint::PowerDetails => power_details_params(date),
        _ => RequestParams::new(),
    }
}

/// A decoded response and the place the client found it
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: DataSource,
}

/// One monitored site, read through the cached client
#[derive(Debug, Clone)]
pub struct SolarSite {
    client: Arc<CachedApiClient>,
}

impl SolarSite {
    pub fn new(client: Arc<CachedApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CachedApiClient {
        &self.client
    }

    /// Fetches `endpoint` and decodes it, keeping where the payload came from
    async fn load<R, T>(
        &self,
        endpoint: Endpoint,
        params: &RequestParams,
        unwrap: impl FnOnce(R) -> T,
    ) -> Result<Sourced<T>, ApiError>
    where
        R: DeserializeOwned,
    {
        let fetched = self.client.fetch(endpoint, params).await?;
        let response = decode::<R>(endpoint, fetched.payload)?;
        Ok(Sourced {
            value: unwrap(response),
            source: fetched.source,
        })
    }

    pub async fn details(&self) -> Result<Sourced<SiteDetails>, ApiError> {
        self.load(Endpoint::Details, &RequestParams::new(), |r: DetailsResponse| r.details)
            .await
    }

    pub async fn overview(&self) -> Result<Sourced<Overview>, ApiError> {
        self.load(Endpoint::Overview, &RequestParams::new(), |r: OverviewResponse| r.overview)
            .await
    }

    pub async fn power(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Sourced<TimeSeries>, ApiError> {
        let params = power_params(start, end);
        self.load(Endpoint::Power, &params, |r: PowerResponse| r.power)
            .await
    }

    pub async fn energy(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        unit: TimeUnit,
    ) -> Result<Sourced<TimeSeries>, ApiError> {
        let params = energy_params(start, end, unit);
        self.load(Endpoint::Energy, &params, |r: EnergyResponse| r.energy)
            .await
    }

    /// Production and purchased energy between two days
    pub async fn energy_details(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        unit: TimeUnit,
    ) -> Result<Sourced<MeterSeries>, ApiError> {
        let params = energy_details_params(start, end, unit);
        self.load(Endpoint::EnergyDetails, &params, |r: EnergyDetailsResponse| {
            r.energy_details
        })
        .await
    }

    pub async fn power_flow(&self) -> Result<Sourced<PowerFlow>, ApiError> {
        self.load(
            Endpoint::CurrentPowerFlow,
            &RequestParams::new(),
            |r: PowerFlowResponse| PowerFlow::from(r.site_current_power_flow),
        )
        .await
    }

    pub async fn env_benefits(&self) -> Result<Sourced<EnvBenefits>, ApiError> {
        self.load(Endpoint::EnvBenefits, &RequestParams::new(), |r: EnvBenefitsResponse| {
            r.env_benefits
        })
        .await
    }

    pub async fn inventory(&self) -> Result<Sourced<Inventory>, ApiError> {
        self.load(Endpoint::Inventory, &RequestParams::new(), |r: InventoryResponse| r.inventory)
            .await
    }

    /// Production, consumption and purchased power over one day
    pub async fn power_details(&self, date: NaiveDate) -> Result<Sourced<MeterSeries>, ApiError> {
        let params = power_details_params(date);
        self.load(Endpoint::PowerDetails, &params, |r: PowerDetailsResponse| r.power_details)
            .await
    }
}
