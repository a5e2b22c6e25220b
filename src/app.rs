//! Dashboard state for solardash
//!
//! Holds the site data currently on screen, the selected day, and the
//! connection status derived from the last load. All data is read through
//! [`SolarSite`], so caching, throttling and fallbacks happen below this layer.

use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent};

use crate::api::{ApiError, DataSource};
use crate::data::{
    demo, EnvBenefits, Inventory, MeterSeries, Overview, PowerFlow, SiteDetails, SolarSite,
    Sourced, TimeUnit,
};

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Initial loading state while fetching data
    Loading,
    /// Main dashboard
    Dashboard,
}

/// Health of the link to the monitoring API after the last load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    /// The provider is rate limiting us; data shown is cached
    Throttled,
    /// At least one request failed for another reason
    Offline,
}

/// Failures seen during one dashboard load
#[derive(Debug, Default)]
struct LoadOutcome {
    throttled: bool,
    failed: bool,
}

impl LoadOutcome {
    /// Stores a successful result in `slot`; a failure keeps the previous value
    ///
    /// Data served from a fallback still fills the panel but counts against
    /// the connection status.
    fn absorb<T>(&mut self, what: &str, slot: &mut T, result: Result<Sourced<T>, ApiError>) {
        match result {
            Ok(loaded) => {
                if loaded.source.is_fallback() {
                    tracing::warn!(data = what, source = ?loaded.source, "showing fallback data");
                }
                match loaded.source {
                    DataSource::ThrottledCache => self.throttled = true,
                    DataSource::LastSuccess => self.failed = true,
                    DataSource::Live | DataSource::Cache => {}
                }
                *slot = loaded.value;
            }
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(data = what, error = %e, "throttled");
                self.throttled = true;
            }
            Err(e) => {
                tracing::error!(data = what, error = %e, "error loading data");
                self.failed = true;
            }
        }
    }
}

/// Panels currently holding placeholder data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoPanels {
    pub overview: bool,
    pub power_flow: bool,
    pub power_details: bool,
}

impl DemoPanels {
    pub fn any(&self) -> bool {
        self.overview || self.power_flow || self.power_details
    }
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Day shown by the power curve; energy charts end on this day
    pub selected_date: NaiveDate,
    pub status: ConnectionStatus,
    /// Cooldown deadline observed after the last load
    pub throttled_until: Option<DateTime<Utc>>,
    pub details: SiteDetails,
    pub overview: Overview,
    pub power_flow: PowerFlow,
    pub env_benefits: EnvBenefits,
    pub inventory: Inventory,
    /// Production/consumption/purchased power for the selected day
    pub power_details: MeterSeries,
    /// Daily energy for the 30 days ending on the selected day
    pub energy_30d: MeterSeries,
    /// Monthly energy for the 12 months ending on the selected day
    pub energy_12m: MeterSeries,
    /// Placeholder data is on screen
    pub is_demo: bool,
    /// Which panels the placeholders are in
    pub demo_panels: DemoPanels,
    /// Timestamp of last data refresh
    pub last_refresh: Option<DateTime<Local>>,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag indicating a reload has been requested
    pub refresh_requested: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    site: SolarSite,
}

impl App {
    /// Creates a new App showing today
    pub fn new(site: SolarSite) -> Self {
        Self {
            state: AppState::Loading,
            selected_date: Local::now().date_naive(),
            status: ConnectionStatus::Online,
            throttled_until: None,
            details: SiteDetails::default(),
            overview: Overview::default(),
            power_flow: PowerFlow::default(),
            env_benefits: EnvBenefits::default(),
            inventory: Inventory::default(),
            power_details: MeterSeries::default(),
            energy_30d: MeterSeries::default(),
            energy_12m: MeterSeries::default(),
            is_demo: false,
            demo_panels: DemoPanels::default(),
            last_refresh: None,
            should_quit: false,
            refresh_requested: false,
            show_help: false,
            site,
        }
    }

    /// Starts on a specific day instead of today
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.selected_date = date;
        self
    }

    /// Loads every dashboard panel concurrently
    ///
    /// Each request is independent: a failure keeps that panel's previous
    /// data and only affects the connection status.
    pub async fn load_all_data(&mut self) {
        // Drop placeholders so only real data survives this load
        if self.demo_panels.overview {
            self.overview = Overview::default();
        }
        if self.demo_panels.power_flow {
            self.power_flow = PowerFlow::default();
        }
        if self.demo_panels.power_details {
            self.power_details = MeterSeries::default();
        }
        self.demo_panels = DemoPanels::default();
        self.is_demo = false;

        let day = self.selected_date;
        let start_30d = day - Duration::days(29);
        let start_12m = day
            .checked_sub_months(Months::new(11))
            .and_then(|d| d.with_day(1))
            .unwrap_or(day);

        let site = &self.site;
        let (details, overview, power_flow, env_benefits, inventory, power_details, energy_30d, energy_12m) = futures::join!(
            site.details(),
            site.overview(),
            site.power_flow(),
            site.env_benefits(),
            site.inventory(),
            site.power_details(day),
            site.energy_details(start_30d, day, TimeUnit::Day),
            site.energy_details(start_12m, day, TimeUnit::Month),
        );

        let mut outcome = LoadOutcome::default();
        outcome.absorb("details", &mut self.details, details);
        outcome.absorb("overview", &mut self.overview, overview);
        outcome.absorb("power flow", &mut self.power_flow, power_flow);
        outcome.absorb("environmental benefits", &mut self.env_benefits, env_benefits);
        outcome.absorb("inventory", &mut self.inventory, inventory);
        outcome.absorb("power details", &mut self.power_details, power_details);
        outcome.absorb("30-day energy", &mut self.energy_30d, energy_30d);
        outcome.absorb("12-month energy", &mut self.energy_12m, energy_12m);

        self.throttled_until = self.site.client().rate_limited_until();
        self.status = if outcome.throttled || self.throttled_until.is_some() {
            ConnectionStatus::Throttled
        } else if outcome.failed {
            ConnectionStatus::Offline
        } else {
            ConnectionStatus::Online
        };

        if self.status == ConnectionStatus::Throttled
            && (self.overview.is_empty() || self.power_details.is_empty())
        {
            self.fill_demo_data();
        }

        self.last_refresh = Some(Local::now());
        self.state = AppState::Dashboard;
    }

    /// Fills the empty headline panels with flagged placeholder data
    fn fill_demo_data(&mut self) {
        tracing::info!("no data while throttled, showing demo data");
        if self.overview.is_empty() {
            self.overview = demo::overview();
            self.demo_panels.overview = true;
        }
        if self.power_flow.is_empty() {
            self.power_flow = demo::power_flow();
            self.demo_panels.power_flow = true;
        }
        if self.power_details.is_empty() {
            self.power_details = demo::power_details(self.selected_date);
            self.demo_panels.power_details = true;
        }
        self.is_demo = self.demo_panels.any();
    }

    /// Clears the cooldown and reloads, bypassing fresh cache entries
    pub fn force_refresh(&mut self) {
        self.site.client().force_refresh();
        self.refresh_requested = true;
    }

    /// Text for the status indicator
    pub fn status_text(&self) -> String {
        match self.status {
            ConnectionStatus::Online => "Online".to_string(),
            ConnectionStatus::Offline => "Offline".to_string(),
            ConnectionStatus::Throttled => match self.throttled_until {
                Some(until) => format!(
                    "Throttled (until {})",
                    until.with_timezone(&Local).format("%H:%M")
                ),
                None => "Rate Limited".to_string(),
            },
        }
    }

    /// Moves the selected day, never past today
    fn shift_date(&mut self, days: i64) {
        let today = Local::now().date_naive();
        let target = (self.selected_date + Duration::days(days)).min(today);
        if target != self.selected_date {
            self.selected_date = target;
            self.refresh_requested = true;
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q` or `Esc`: Quit the application
    /// - `Left`/`h`, `Right`/`l`: Previous / next day
    /// - `t`: Jump to today
    /// - `r`: Reload (cache permitting)
    /// - `f`: Force refresh, clearing any cooldown
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        match self.state {
            AppState::Loading => {
                if key_event.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::Dashboard => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    self.shift_date(-1);
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    self.shift_date(1);
                }
                KeyCode::Char('t') => {
                    let today = Local::now().date_naive();
                    if self.selected_date != today {
                        self.selected_date = today;
                        self.refresh_requested = true;
                    }
                }
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                KeyCode::Char('f') => {
                    self.force_refresh();
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
        }
    }
}
