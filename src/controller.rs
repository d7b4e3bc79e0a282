// src/controller.rs
use crate::{
    alarms::{Alert, AlertSink},
    broker::{Connector, Publisher},
    config::{FormInput, SimulationConfig, SimulationSettings},
    error::*,
    simulation::{SimulationState, ValueGenerator},
};
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub state: ControllerState,
    pub topic: Option<String>,
    pub ticks: u64,
    pub alerts: u64,
    pub publish_errors: u64,
    pub last_value: Option<i64>,
}

/// Counters shared between a publish loop and its controller
#[derive(Debug, Default)]
pub struct LoopStats {
    ticks: AtomicU64,
    alerts: AtomicU64,
    publish_errors: AtomicU64,
    last_value: RwLock<Option<i64>>,
}

impl LoopStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn publish_errors(&self) -> u64 {
        self.publish_errors.load(Ordering::Relaxed)
    }

    pub fn last_value(&self) -> Option<i64> {
        self.last_value.read().map(|v| *v).unwrap_or(None)
    }

    fn record(&self, value: i64) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_value.write() {
            *last = Some(value);
        }
    }
}

/// Stop request shared between a controller and its publish loop.
///
/// The flag stops the next tick; the wake-up cuts short an interval wait.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        // Stores a permit when the loop is not waiting yet
        self.inner.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        self.inner.wake.notified().await
    }
}

/// Body of one Running session: advance, alert, publish, once per interval.
pub struct PublishLoop<R> {
    config: SimulationConfig,
    generator: ValueGenerator<R>,
    publisher: Arc<dyn Publisher>,
    alerts: Arc<dyn AlertSink>,
    stats: Arc<LoopStats>,
    stop: StopSignal,
}

impl<R: Rng + Send> PublishLoop<R> {
    pub fn new(
        config: SimulationConfig,
        generator: ValueGenerator<R>,
        publisher: Arc<dyn Publisher>,
        alerts: Arc<dyn AlertSink>,
        stats: Arc<LoopStats>,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            generator,
            publisher,
            alerts,
            stats,
            stop,
        }
    }

    /// Tick until stopped.
    ///
    /// A stop issued during the wait between ticks ends the loop at once; a
    /// tick already in progress always completes.
    pub async fn run(mut self) {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stop.is_stopped() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.stop.wait() => break,
            }
            if self.stop.is_stopped() {
                break;
            }
            self.tick().await;
        }

        debug!("Publish loop for '{}' exited", self.config.topic);
    }

    /// One tick. Returns the published reading.
    pub async fn tick(&mut self) -> i64 {
        let value = self.generator.next();
        let payload = value.to_string();

        if let Some(alert) = Alert::check(value, self.config.threshold, &self.config.topic) {
            self.stats.alerts.fetch_add(1, Ordering::Relaxed);
            self.alerts.raise(&alert);
        }

        match self.publisher.publish(&self.config.topic, payload.clone()).await {
            Ok(()) => info!("Send `{}`ppm to topic `{}`", payload, self.config.topic),
            Err(e) => {
                self.stats.publish_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Publish of {} to '{}' failed: {}", payload, self.config.topic, e);
            }
        }

        self.stats.record(value);
        value
    }
}

struct Session {
    topic: String,
    stop: StopSignal,
    handle: JoinHandle<()>,
}

/// Start/stop front for the publish loop.
///
/// Idle until [`start`](Self::start) validates a configuration and opens a
/// broker session; Running until [`stop`](Self::stop).
pub struct PublishController {
    connector: Arc<dyn Connector>,
    alerts: Arc<dyn AlertSink>,
    session: Option<Session>,
    stats: Arc<LoopStats>,
}

impl PublishController {
    pub fn new(connector: Arc<dyn Connector>, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            connector,
            alerts,
            session: None,
            stats: Arc::new(LoopStats::default()),
        }
    }

    pub fn state(&self) -> ControllerState {
        match &self.session {
            Some(_) => ControllerState::Running,
            None => ControllerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Idle → Running with an already validated configuration.
    pub async fn start(&mut self, config: SimulationConfig) -> Result<()> {
        if self.session.is_some() {
            return Err(SimError::AlreadyRunning);
        }

        let publisher = self.connector.connect().await?;

        let state = SimulationState::new(config.initial_value, config.step, config.bounds);
        let generator = ValueGenerator::with_seed(state, config.seed);
        let stop = StopSignal::new();
        let stats = Arc::new(LoopStats::default());

        info!(
            "Publishing to '{}' every {:?} from {} ppm (step {}, threshold {})",
            config.topic, config.interval, config.initial_value, config.step, config.threshold
        );

        let topic = config.topic.clone();
        let publish_loop = PublishLoop::new(
            config,
            generator,
            publisher,
            self.alerts.clone(),
            stats.clone(),
            stop.clone(),
        );
        let handle = tokio::spawn(publish_loop.run());

        self.stats = stats;
        self.session = Some(Session { topic, stop, handle });
        Ok(())
    }

    /// Validate operator input against `base`, then start.
    ///
    /// Invalid input is logged and leaves the controller Idle.
    pub async fn start_from_form(&mut self, form: &FormInput, base: &SimulationSettings) -> Result<()> {
        let config = SimulationConfig::from_form(form, base).map_err(|e| {
            warn!("Please enter valid values for initial value, step, interval and threshold: {}", e);
            SimError::from(e)
        })?;
        self.start(config).await
    }

    /// Running → Idle. Returns false, doing nothing, when already Idle.
    pub fn stop(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.stop.stop();
                info!("Stopping publishing to '{}'", session.topic);
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the loop task to exit, letting a tick in progress finish.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop.stop();
            if let Err(e) = session.handle.await {
                warn!("Publish loop ended abnormally: {}", e);
            }
            info!("Publishing to '{}' shut down", session.topic);
        }
    }

    /// Start when Idle, stop when Running. Returns the resulting state.
    pub async fn toggle(&mut self, form: &FormInput, base: &SimulationSettings) -> Result<ControllerState> {
        if self.stop() {
            return Ok(ControllerState::Idle);
        }
        self.start_from_form(form, base).await?;
        Ok(ControllerState::Running)
    }

    /// Current state plus the counters of the latest session.
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state(),
            topic: self.session.as_ref().map(|s| s.topic.clone()),
            ticks: self.stats.ticks(),
            alerts: self.stats.alerts(),
            publish_errors: self.stats.publish_errors(),
            last_value: self.stats.last_value(),
        }
    }
}

impl Drop for PublishController {
    fn drop(&mut self) {
        self.stop();
    }
}
