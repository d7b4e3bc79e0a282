use thiserror::Error;

/// Reasons a simulation configuration is refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A form field could not be parsed as the expected number type
    #[error("{field} is not a valid {expected}: {input:?}")]
    NotANumber {
        field: &'static str,
        expected: &'static str,
        input: String,
    },

    /// A field that must be strictly positive was zero or negative
    #[error("{field} must be strictly positive, got {value}")]
    NotPositive { field: &'static str, value: String },

    /// Interval longer than the scheduler accepts
    #[error("interval of {secs} s exceeds the maximum of {max_secs} s")]
    IntervalTooLong { secs: f64, max_secs: u64 },

    /// The initial value is below zero
    #[error("initial value must not be negative, got {0}")]
    NegativeInitial(i64),

    /// The initial value lies outside the simulated range
    #[error("initial value {value} is outside [{lower}, {upper}]")]
    InitialOutOfRange { value: i64, lower: i64, upper: i64 },

    /// The step cannot fit inside the simulated range
    #[error("step {step} is wider than the range [{lower}, {upper}]")]
    StepTooLarge { step: i64, lower: i64, upper: i64 },

    /// Lower bound is not below the upper bound
    #[error("lower bound {lower} must be below upper bound {upper}")]
    InvertedBounds { lower: i64, upper: i64 },

    /// No topic to publish to
    #[error("topic must not be empty")]
    EmptyTopic,
}

/// Application level error type used throughout the crate.
#[derive(Error, Debug)]
pub enum SimError {
    /// I/O related failure
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration rejected before publishing could start
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// Start requested while a publishing session is active
    #[error("Publishing is already running")]
    AlreadyRunning,

    /// Broker client failure
    #[error("MQTT error: {0}")]
    Mqtt(String),
}

/// Convenient alias over [`Result`] using [`SimError`]
pub type Result<T> = std::result::Result<T, SimError>;
