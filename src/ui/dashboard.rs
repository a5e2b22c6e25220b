//! Dashboard screen rendering
//!
//! One screen: a header with site name, selected day and connection status,
//! headline figures, the current power flow, the day's power curve, and
//! 30-day / 12-month production bars.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Paragraph},
    Frame,
};

use super::format::{
    format_co2, format_date, format_energy, format_energy_mwh, format_power, format_timestamp,
    inverter_summary,
};
use super::widgets::PowerSparkline;
use crate::app::{App, ConnectionStatus};
use crate::data::{MeterSeries, Reading};

/// Color for the connection status indicator
fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Online => Color::Green,
        ConnectionStatus::Throttled => Color::Yellow,
        ConnectionStatus::Offline => Color::Red,
    }
}

/// Renders the dashboard
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Length(4), // Headline cards
            Constraint::Length(7), // Power flow + daily curve
            Constraint::Min(6),    // Energy bars
            Constraint::Length(1), // Help text
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_cards(frame, app, chunks[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[2]);
    render_power_flow(frame, app, middle[0]);
    render_power_curve(frame, app, middle[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[3]);
    render_energy_bars(
        frame,
        bottom[0],
        " Last 30 days (kWh) ",
        &daily_bars(&app.energy_30d),
    );
    render_energy_bars(
        frame,
        bottom[1],
        " Last 12 months (MWh) ",
        &monthly_bars(&app.energy_12m),
    );

    render_help(frame, chunks[4]);
}

/// Site name, selected day, status and last update
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let site_name = app
        .details
        .name
        .clone()
        .unwrap_or_else(|| "SOLARDASH".to_string());
    let updated = app
        .last_refresh
        .map(format_timestamp)
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![
        Span::styled(
            site_name,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format_date(app.selected_date), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(
            format!("● {}", app.status_text()),
            Style::default().fg(status_color(app.status)),
        ),
    ];
    if app.is_demo {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            " DEMO DATA ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let lines = vec![
        Line::from(spans),
        Line::from(Span::styled(
            format!("Updated {}", updated),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

/// Headline figures, one bordered card each
fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let overview = &app.overview;
    let energy = |total: &Option<crate::data::EnergyTotal>| total.as_ref().and_then(|t| t.energy);

    let co2 = app
        .env_benefits
        .gas_emission_saved
        .as_ref()
        .and_then(|g| g.co2);

    let cards = [
        (
            "Current power",
            format_power(
                overview.current_power.as_ref().and_then(|p| p.power),
                Some("W"),
            ),
        ),
        ("Today", format_energy(energy(&overview.last_day_data))),
        ("This month", format_energy(energy(&overview.last_month_data))),
        ("Lifetime", format_energy_mwh(energy(&overview.life_time_data))),
        ("CO2 saved", format_co2(co2)),
        ("Inverters", inverter_summary(&app.inventory)),
    ];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, cards.len() as u32); cards.len()])
        .split(area);

    for ((title, value), column) in cards.iter().zip(columns.iter()) {
        let card = Paragraph::new(Line::from(Span::styled(
            value.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(format!(" {} ", title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(card, *column);
    }
}

/// Current PV, grid and load power
fn render_power_flow(frame: &mut Frame, app: &App, area: Rect) {
    let flow = &app.power_flow;
    let unit = flow.unit.as_deref();

    let row = |label: &str, power: Option<f64>, color: Color| {
        Line::from(vec![
            Span::styled(format!("  {:<8}", label), Style::default().fg(color)),
            Span::raw(format_power(power, unit)),
        ])
    };

    let mut lines = vec![
        row("Solar", flow.pv.current_power, Color::Cyan),
        row("Grid", flow.grid.current_power, Color::LightRed),
        row("Load", flow.load.current_power, Color::Green),
    ];
    if let Some(storage) = &flow.storage {
        lines.push(row("Battery", storage.current_power, Color::Magenta));
    }
    if !flow.connections.is_empty() {
        let arrows: Vec<String> = flow
            .connections
            .iter()
            .map(|c| format!("{}→{}", c.from, c.to))
            .collect();
        lines.push(Line::from(Span::styled(
            format!("  {}", arrows.join("  ")),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default()
        .title(" Power flow ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Values of a meter in time order, in W
fn meter_values(series: &MeterSeries, meter_type: &str) -> Vec<f64> {
    let mut readings: Vec<&Reading> = series.values(meter_type).iter().collect();
    readings.sort_by(|a, b| a.date.cmp(&b.date));
    readings.iter().map(|r| r.value_or_zero()).collect()
}

/// Production, consumption and purchased power over the selected day
fn render_power_curve(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Power today ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let series = [
        ("Solar", Color::Cyan, meter_values(&app.power_details, "Production")),
        ("Usage", Color::LightRed, meter_values(&app.power_details, "Consumption")),
        ("Bought", Color::Green, meter_values(&app.power_details, "Purchased")),
    ];
    let max = series
        .iter()
        .flat_map(|(_, _, values)| values.iter().copied())
        .fold(0.0_f64, f64::max);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 3])
        .split(inner);

    for ((label, color, values), row) in series.iter().zip(rows.iter()) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(8), Constraint::Min(1)])
            .split(*row);
        frame.render_widget(
            Paragraph::new(Span::styled(*label, Style::default().fg(*color))),
            cols[0],
        );
        if values.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("no data", Style::default().fg(Color::DarkGray))),
                cols[1],
            );
        } else {
            frame.render_widget(
                PowerSparkline::new(values, max).style(Style::default().fg(*color)),
                cols[1],
            );
        }
    }
}

/// Production readings bucketed into labelled bars, scaled by `divisor`
fn production_bars(series: &MeterSeries, label_format: &str, divisor: f64) -> Vec<(String, u64)> {
    let mut readings: Vec<&Reading> = series.values("Production").iter().collect();
    readings.sort_by(|a, b| a.date.cmp(&b.date));
    readings
        .iter()
        .map(|r| {
            let label = r
                .time()
                .map(|t| t.format(label_format).to_string())
                .unwrap_or_default();
            (label, (r.value_or_zero() / divisor).round().max(0.0) as u64)
        })
        .collect()
}

/// Daily production in kWh, labelled by day of month
pub fn daily_bars(series: &MeterSeries) -> Vec<(String, u64)> {
    production_bars(series, "%d", 1000.0)
}

/// Monthly production in MWh, labelled by month
pub fn monthly_bars(series: &MeterSeries) -> Vec<(String, u64)> {
    production_bars(series, "%b", 1_000_000.0)
}

fn render_energy_bars(frame: &mut Frame, area: Rect, title: &str, bars: &[(String, u64)]) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if bars.is_empty() {
        let empty = Paragraph::new(Span::styled("no data", Style::default().fg(Color::DarkGray)))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let data: Vec<(&str, u64)> = bars.iter().map(|(l, v)| (l.as_str(), *v)).collect();
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width = (inner_width / data.len()).saturating_sub(1).clamp(1, 5) as u16;

    let chart = BarChart::default()
        .block(block)
        .data(data.as_slice())
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    frame.render_widget(chart, area);
}

/// Renders the key hints at the bottom
fn render_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(Line::from(vec![
        Span::styled("←/→", Style::default().fg(Color::Yellow)),
        Span::raw(" day  "),
        Span::styled("t", Style::default().fg(Color::Yellow)),
        Span::raw(" today  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" reload  "),
        Span::styled("f", Style::default().fg(Color::Yellow)),
        Span::raw(" force refresh  "),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::raw(" help  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CachedApiClient, ClientConfig, ReqwestTransport};
    use crate::app::AppState;
    use crate::cache::MemoryStore;
    use crate::data::{demo, Meter, SolarSite};
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn test_app() -> App {
        let client = CachedApiClient::new(
            ClientConfig::new("KEY", "1"),
            Arc::new(MemoryStore::new()),
            Arc::new(ReqwestTransport::new()),
        );
        let mut app = App::new(SolarSite::new(Arc::new(client)))
            .with_date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        app.state = AppState::Dashboard;
        app
    }

    fn render_to_string(app: &App) -> String {
        let backend = TestBackend::new(120, 32);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn reading(date: &str, value: f64) -> Reading {
        Reading {
            date: date.to_string(),
            value: Some(value),
        }
    }

    #[test]
    fn test_daily_bars_sorted_and_scaled() {
        let series = MeterSeries {
            meters: vec![Meter {
                meter_type: "Production".into(),
                values: vec![
                    reading("2024-07-02 00:00:00", 32_600.0),
                    reading("2024-07-01 00:00:00", 41_200.0),
                ],
            }],
            ..Default::default()
        };

        let bars = daily_bars(&series);

        assert_eq!(bars, vec![("01".to_string(), 41), ("02".to_string(), 33)]);
    }

    #[test]
    fn test_monthly_bars_use_month_labels() {
        let series = MeterSeries {
            meters: vec![Meter {
                meter_type: "PRODUCTION".into(),
                values: vec![reading("2024-06-01 00:00:00", 1_400_000.0)],
            }],
            ..Default::default()
        };

        assert_eq!(monthly_bars(&series), vec![("Jun".to_string(), 1)]);
    }

    #[test]
    fn test_render_empty_dashboard() {
        let app = test_app();
        let content = render_to_string(&app);

        assert!(content.contains("SOLARDASH"));
        assert!(content.contains("15-Jul-2024"));
        assert!(content.contains("Online"));
        assert!(content.contains("no data"));
        assert!(!content.contains("DEMO"));
    }

    #[test]
    fn test_render_flags_demo_data() {
        let mut app = test_app();
        app.overview = demo::overview();
        app.power_flow = demo::power_flow();
        app.power_details = demo::power_details(app.selected_date);
        app.is_demo = true;
        app.status = ConnectionStatus::Throttled;

        let content = render_to_string(&app);

        assert!(content.contains("DEMO DATA"));
        assert!(content.contains("Rate Limited"));
        assert!(content.contains("45.2 kWh"));
    }
}
