//! Placeholder data shown when nothing real is available
//!
//! Only used while throttled with an empty dashboard. Callers must flag the
//! dashboard as demo so it is never mistaken for live readings.

use chrono::{NaiveDate, NaiveTime};

use super::{
    Connection, CurrentPower, EnergyTotal, FlowNode, Meter, MeterSeries, Overview, PowerFlow,
    Reading,
};
use crate::api::format_api_time;

/// Quarter-hour slots in a day
const SLOTS_PER_DAY: u32 = 96;

/// Peak production of the synthetic curve, in W
const DEMO_PEAK_W: f64 = 7000.0;

pub fn overview() -> Overview {
    Overview {
        last_update_time: None,
        life_time_data: Some(energy(15_400_000.0)),
        last_year_data: None,
        last_month_data: Some(energy(1_250_000.0)),
        last_day_data: Some(energy(45_200.0)),
        current_power: Some(CurrentPower {
            power: Some(5200.0),
        }),
    }
}

fn energy(wh: f64) -> EnergyTotal {
    EnergyTotal {
        energy: Some(wh),
        revenue: None,
    }
}

pub fn power_flow() -> PowerFlow {
    let node = |w: f64| FlowNode {
        status: Some("Active".to_string()),
        current_power: Some(w),
    };
    PowerFlow {
        unit: Some("W".to_string()),
        pv: node(5200.0),
        grid: node(1200.0),
        load: node(4000.0),
        storage: None,
        connections: vec![
            Connection {
                from: "PV".to_string(),
                to: "LOAD".to_string(),
            },
            Connection {
                from: "GRID".to_string(),
                to: "LOAD".to_string(),
            },
        ],
    }
}

/// A sunny-day production curve with a steady household load, in 15-minute steps
pub fn power_details(date: NaiveDate) -> MeterSeries {
    let mut production = Vec::with_capacity(SLOTS_PER_DAY as usize);
    let mut consumption = Vec::with_capacity(SLOTS_PER_DAY as usize);
    let mut purchased = Vec::with_capacity(SLOTS_PER_DAY as usize);

    for slot in 0..SLOTS_PER_DAY {
        let time = NaiveTime::from_hms_opt(slot / 4, (slot % 4) * 15, 0).unwrap_or(NaiveTime::MIN);
        let date_str = format_api_time(date.and_time(time));

        // Production between 07:00 and 17:00
        let prod = if slot > 28 && slot < 68 {
            ((slot - 28) as f64 / 40.0 * std::f64::consts::PI).sin() * DEMO_PEAK_W
        } else {
            0.0
        };
        let load = 2500.0 + 1000.0 * (slot as f64 / 8.0).sin();

        production.push(reading(&date_str, prod));
        consumption.push(reading(&date_str, load));
        purchased.push(reading(&date_str, (load - prod).max(0.0)));
    }

    MeterSeries {
        time_unit: Some("QUARTER_OF_AN_HOUR".to_string()),
        unit: Some("W".to_string()),
        meters: vec![
            meter("Production", production),
            meter("Consumption", consumption),
            meter("Purchased", purchased),
        ],
    }
}

fn reading(date: &str, value: f64) -> Reading {
    Reading {
        date: date.to_string(),
        value: Some(value),
    }
}

fn meter(meter_type: &str, values: Vec<Reading>) -> Meter {
    Meter {
        meter_type: meter_type.to_string(),
        values,
    }
}
