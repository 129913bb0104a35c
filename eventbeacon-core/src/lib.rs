//! # eventbeacon-core
//!
//! Core library for eventbeacon - a client-side event telemetry agent.
//!
//! This library provides:
//! - Event, page and lifecycle types plus their wire-code tables
//! - Page tracking with implicit page exits
//! - Asynchronous enrichment and delivery to a collection endpoint
//! - An in-memory retry queue drained when connectivity returns
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! The host application owns one [`Beacon`] and feeds it three kinds of input:
//! - **Events** via [`Beacon::record`] (clicks, page transitions, errors)
//! - **Lifecycle signals** via [`Beacon::on_lifecycle`] or [`Beacon::attach_lifecycle`]
//! - **Reachability signals** via [`Beacon::on_reachable`] or [`Beacon::attach_reachability`]
//!
//! Delivery is fire-and-forget: nothing is reported back to the host, and
//! queued events live in process memory only.
//!
//! ## Example
//!
//! ```rust,no_run
//! use eventbeacon_core::{Beacon, Config, EventKind, NewEvent, StaticLocation};
//! use std::sync::Arc;
//!
//! # async fn run() -> eventbeacon_core::Result<()> {
//! let config = Config::load()?;
//! let resolver = Arc::new(StaticLocation::from(&config.location));
//! let beacon = Beacon::initialize(config.agent, resolver)?;
//!
//! beacon.record(NewEvent::new("home", "Home", EventKind::PageEnter));
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use beacon::{Beacon, BeaconBuilder, DeliveryStats};
pub use config::{AgentConfig, Config, Environment};
pub use enrichment::{CallbackResolver, Location, LocationCompletion, LocationResolver, StaticLocation};
pub use error::{Error, Result};
pub use payload::Payload;
pub use sink::{LogSink, SecondarySink};
pub use transport::{HttpTransport, Transport};
pub use types::*;

// Public modules
pub mod beacon;
pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod payload;
pub mod retry;
pub mod session;
pub mod sink;
pub mod transport;
pub mod types;
