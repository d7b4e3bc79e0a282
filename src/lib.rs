//! CO2SIM - Simulated CO2 sensor publishing to an MQTT broker
//!
//! A bounded random walk of CO2 readings (ppm) is advanced once per
//! interval and each reading is published as decimal text to a broker topic.
//! Readings at or above a threshold raise an alert.
//!
//! # Feature Flags
//!
//! - `mqtt` (default): [`MqttConnector`] backed by `rumqttc`. Without it only
//!   the in-process [`DryRunBroker`] and [`MemoryBroker`] are available.
//!
//! # Examples
//!
//! ```rust,no_run
//! use co2sim::{
//!     Config, DryRunBroker, FormInput, LogAlertSink, PublishController,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> co2sim::Result<()> {
//! let config = Config::from_file("co2sim.yaml")?;
//! let form = FormInput::from(&config.simulation);
//!
//! let mut controller = PublishController::new(
//!     Arc::new(DryRunBroker::new()),
//!     Arc::new(LogAlertSink),
//! );
//! controller.start_from_form(&form, &config.simulation).await?;
//! controller.stop();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// CORE MODULES (always available)
// ============================================================================

/// Error types shared by every module
pub mod error;

/// Bounded random walk generator
pub mod simulation;

/// YAML configuration and operator form parsing
pub mod config;

/// Threshold alerts and alert sinks
pub mod alarms;

/// Publisher and connector seams, plus the in-process broker
pub mod broker;

/// Start/stop controller and the publish loop
pub mod controller;

/// Interactive operator console
pub mod console;

// ============================================================================
// PROTOCOL MODULES (feature-gated)
// ============================================================================

#[cfg(feature = "mqtt")]
#[cfg_attr(docsrs, doc(cfg(feature = "mqtt")))]
/// MQTT broker session built on rumqttc
pub mod mqtt;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use alarms::{Alert, AlertSink, ChannelAlertSink, LogAlertSink};
pub use broker::{
    ConnectionStatus, Connector, DryRunBroker, MemoryBroker, PublishedMessage, Publisher,
};
pub use config::{BrokerConfig, Config, FormInput, MqttQos, SimulationConfig, SimulationSettings};
pub use console::{Command, Console, Flow};
pub use controller::{ControllerState, ControllerStatus, PublishController, PublishLoop, StopSignal};
pub use error::{Result, SimError, ValidationError};
pub use simulation::{advance, next_value, Bounds, Draw, SimulationState, ValueGenerator};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConnector, MqttPublisher};

/// Crate version, logged at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
