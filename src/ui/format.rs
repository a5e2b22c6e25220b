//! Display formatting for power, energy and emissions figures

use chrono::{DateTime, Local, NaiveDate};

use crate::data::Inventory;

/// Formats a power reading as kW
///
/// `unit` is the unit the API reported (`W` or `kW`); readings are assumed to
/// be in W when it is missing. Two decimals below 10 kW, none above.
pub fn format_power(value: Option<f64>, unit: Option<&str>) -> String {
    let Some(value) = value else {
        return "0 kW".to_string();
    };
    let kw = match unit {
        Some(u) if u.eq_ignore_ascii_case("kw") => value,
        _ => value / 1000.0,
    };
    let decimals = if kw.abs() < 10.0 { 2 } else { 0 };
    format!("{:.*} kW", decimals, kw)
}

/// Formats Wh as kWh with one decimal
pub fn format_energy(wh: Option<f64>) -> String {
    match wh {
        Some(wh) => format!("{:.1} kWh", wh / 1000.0),
        None => "0.0 kWh".to_string(),
    }
}

/// Formats Wh as MWh with one decimal
pub fn format_energy_mwh(wh: Option<f64>) -> String {
    match wh {
        Some(wh) => format!("{:.1} MWh", wh / 1_000_000.0),
        None => "0.0 MWh".to_string(),
    }
}

/// Formats kg of CO2, switching to tonnes from 1000 kg
pub fn format_co2(kg: Option<f64>) -> String {
    match kg {
        Some(kg) if kg >= 1000.0 => format!("{:.2} t", kg / 1000.0),
        Some(kg) if kg != 0.0 => format!("{:.2} kg", kg),
        _ => "0 kg".to_string(),
    }
}

/// `online/total` inverter count
pub fn inverter_summary(inventory: &Inventory) -> String {
    format!("{}/{}", inventory.online_count(), inventory.inverters.len())
}

/// `15-Jul-2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// `15-Jul-2024 | 14:05:09`
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format("%d-%b-%Y | %H:%M:%S").to_string()
}
