//! Access to the SolarEdge monitoring API
//!
//! [`CachedApiClient`] is the only component that talks to the remote host.
//! It layers TTL caching, 429 cooldown tracking and last-success fallback over
//! a pluggable [`Transport`], persisting its state through a
//! [`KeyValueStore`](crate::cache::KeyValueStore).

mod client;
mod clock;
mod endpoint;
mod error;
mod transport;

pub use client::{
    CachedApiClient, ClientConfig, DataSource, Fetched, DEFAULT_COOLDOWN_MINUTES,
    PRODUCTION_BASE_URL,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use endpoint::{
    day_end, day_start, format_api_time, CacheKey, Endpoint, ParamValue, RequestParams,
    API_TIME_FORMAT,
};
pub use error::{ApiError, ErrorKind};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
