// src/config.rs - Broker and simulation configuration, plus operator form parsing

use crate::error::{Result, ValidationError};
use crate::simulation::Bounds;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

/// Top level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// MQTT broker to publish to
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Values the operator form is pre-filled with
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

// ============================================================================
// BROKER CONFIGURATION
// ============================================================================

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host
    #[serde(default = "default_broker_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// Client ID, generated per session when absent
    #[serde(default)]
    pub client_id: Option<String>,

    /// Keep alive in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// QoS level used for readings
    #[serde(default)]
    pub qos: MqttQos,
}

impl BrokerConfig {
    /// Configured client id or a fresh `co2sim-<n>` one.
    pub fn client_id(&self) -> String {
        match &self.client_id {
            Some(id) => id.clone(),
            None => format!("co2sim-{}", rand::thread_rng().gen_range(0..=1000)),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id: None,
            keepalive_secs: default_keepalive(),
            qos: MqttQos::default(),
        }
    }
}

/// MQTT QoS levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MqttQos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl Default for MqttQos {
    fn default() -> Self {
        MqttQos::AtMostOnce
    }
}

// ============================================================================
// SIMULATION CONFIGURATION
// ============================================================================

/// Unvalidated simulation parameters, as read from a file or a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Starting reading in ppm
    #[serde(default = "default_initial_value")]
    pub initial_value: i64,

    /// Change applied per tick
    #[serde(default = "default_step")]
    pub step: i64,

    /// Seconds between two publishes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Readings at or above this raise an alert
    #[serde(default = "default_threshold")]
    pub threshold: i64,

    #[serde(default = "default_lower_bound")]
    pub lower_bound: i64,

    #[serde(default = "default_upper_bound")]
    pub upper_bound: i64,

    /// Fixed seed for a reproducible walk
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            initial_value: default_initial_value(),
            step: default_step(),
            interval_secs: default_interval_secs(),
            threshold: default_threshold(),
            lower_bound: default_lower_bound(),
            upper_bound: default_upper_bound(),
            seed: None,
        }
    }
}

/// Longest accepted publish interval (one day).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Validated parameters of one publishing session
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub topic: String,
    pub initial_value: i64,
    pub step: i64,
    pub interval: Duration,
    pub threshold: i64,
    pub bounds: Bounds,
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Parse the operator form on top of `base`, then validate.
    pub fn from_form(
        form: &FormInput,
        base: &SimulationSettings,
    ) -> std::result::Result<Self, ValidationError> {
        Self::try_from(form.apply_to(base.clone())?)
    }
}

impl TryFrom<SimulationSettings> for SimulationConfig {
    type Error = ValidationError;

    fn try_from(settings: SimulationSettings) -> std::result::Result<Self, Self::Error> {
        if settings.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if settings.initial_value < 0 {
            return Err(ValidationError::NegativeInitial(settings.initial_value));
        }
        if settings.step <= 0 {
            return Err(ValidationError::NotPositive {
                field: "step",
                value: settings.step.to_string(),
            });
        }
        if !(settings.interval_secs > 0.0) {
            return Err(ValidationError::NotPositive {
                field: "interval",
                value: settings.interval_secs.to_string(),
            });
        }
        let interval = Duration::try_from_secs_f64(settings.interval_secs).map_err(|_| {
            ValidationError::NotANumber {
                field: "interval",
                expected: "duration in seconds",
                input: settings.interval_secs.to_string(),
            }
        })?;
        if interval.is_zero() {
            return Err(ValidationError::NotPositive {
                field: "interval",
                value: settings.interval_secs.to_string(),
            });
        }
        if interval > MAX_INTERVAL {
            return Err(ValidationError::IntervalTooLong {
                secs: settings.interval_secs,
                max_secs: MAX_INTERVAL.as_secs(),
            });
        }
        if settings.threshold <= 0 {
            return Err(ValidationError::NotPositive {
                field: "threshold",
                value: settings.threshold.to_string(),
            });
        }

        let bounds = Bounds::new(settings.lower_bound, settings.upper_bound);
        if bounds.lower >= bounds.upper {
            return Err(ValidationError::InvertedBounds {
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }
        if !bounds.contains(settings.initial_value) {
            return Err(ValidationError::InitialOutOfRange {
                value: settings.initial_value,
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }
        if settings.step > bounds.width() {
            return Err(ValidationError::StepTooLarge {
                step: settings.step,
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }

        Ok(Self {
            topic: settings.topic.trim().to_string(),
            initial_value: settings.initial_value,
            step: settings.step,
            interval,
            threshold: settings.threshold,
            bounds,
            seed: settings.seed,
        })
    }
}

// ============================================================================
// OPERATOR FORM
// ============================================================================

/// The five text fields an operator fills in before starting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    pub topic: String,
    pub initial_value: String,
    pub step: String,
    pub interval: String,
    pub threshold: String,
}

impl FormInput {
    /// Overlay the parsed fields onto `settings`.
    pub fn apply_to(
        &self,
        mut settings: SimulationSettings,
    ) -> std::result::Result<SimulationSettings, ValidationError> {
        settings.topic = self.topic.trim().to_string();
        settings.initial_value = parse_field("initial value", "integer", &self.initial_value)?;
        settings.step = parse_field("step", "integer", &self.step)?;
        settings.interval_secs = parse_field("interval", "number", &self.interval)?;
        settings.threshold = parse_field("threshold", "integer", &self.threshold)?;
        Ok(settings)
    }

    /// Set a field by its console name. Returns false for unknown names.
    pub fn set(&mut self, field: &str, value: &str) -> bool {
        let slot = match field {
            "topic" => &mut self.topic,
            "initial" | "initial_value" => &mut self.initial_value,
            "step" => &mut self.step,
            "interval" | "delay" => &mut self.interval,
            "threshold" | "limit" => &mut self.threshold,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

impl From<&SimulationSettings> for FormInput {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            topic: settings.topic.clone(),
            initial_value: settings.initial_value.to_string(),
            step: settings.step.to_string(),
            interval: settings.interval_secs.to_string(),
            threshold: settings.threshold.to_string(),
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    expected: &'static str,
    input: &str,
) -> std::result::Result<T, ValidationError> {
    input
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber {
            field,
            expected,
            input: input.to_string(),
        })
}

// ============================================================================
// DEFAULT VALUE FUNCTIONS
// ============================================================================

fn default_broker_host() -> String { "broker.hivemq.com".to_string() }
fn default_broker_port() -> u16 { 1883 }
fn default_keepalive() -> u64 { 60 }
fn default_topic() -> String { "classe/hayder/co2".to_string() }
fn default_initial_value() -> i64 { 1000 }
fn default_step() -> i64 { 10 }
fn default_interval_secs() -> f64 { 1.0 }
fn default_threshold() -> i64 { 6000 }
fn default_lower_bound() -> i64 { 0 }
fn default_upper_bound() -> i64 { 10_000 }
