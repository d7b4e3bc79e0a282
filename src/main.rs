use anyhow::Context;
use clap::Parser;
use co2sim::{
    ChannelAlertSink, Config, Connector, Console, DryRunBroker, Flow, MqttConnector,
    PublishController,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "co2sim")]
#[command(about = "Publish simulated CO2 readings to an MQTT broker", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MQTT topic
    #[arg(short, long)]
    topic: Option<String>,

    /// Initial CO2 level (ppm)
    #[arg(short, long)]
    initial: Option<i64>,

    /// Change applied per tick (ppm)
    #[arg(short, long)]
    step: Option<i64>,

    /// Seconds between publishes
    #[arg(short = 'd', long)]
    interval: Option<f64>,

    /// Alert threshold (ppm)
    #[arg(short = 'l', long)]
    threshold: Option<i64>,

    /// Broker host
    #[arg(long)]
    host: Option<String>,

    /// Broker port
    #[arg(long)]
    port: Option<u16>,

    /// Seed for a reproducible walk
    #[arg(long)]
    seed: Option<u64>,

    /// Start publishing immediately
    #[arg(long)]
    autostart: bool,

    /// Log readings instead of connecting to a broker
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        let sim = &mut config.simulation;
        if let Some(topic) = &self.topic {
            sim.topic = topic.clone();
        }
        if let Some(initial) = self.initial {
            sim.initial_value = initial;
        }
        if let Some(step) = self.step {
            sim.step = step;
        }
        if let Some(interval) = self.interval {
            sim.interval_secs = interval;
        }
        if let Some(threshold) = self.threshold {
            sim.threshold = threshold;
        }
        if self.seed.is_some() {
            sim.seed = self.seed;
        }
        if let Some(host) = &self.host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("co2sim=info")),
        )
        .init();

    info!("co2sim v{} starting", co2sim::VERSION);

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    let connector: Arc<dyn Connector> = if cli.dry_run {
        info!("Dry run: readings are not sent to a broker");
        Arc::new(DryRunBroker::new())
    } else {
        info!("Broker {}:{}", config.broker.host, config.broker.port);
        Arc::new(MqttConnector::new(config.broker.clone()))
    };

    let (alert_sink, mut alerts) = ChannelAlertSink::channel();
    let controller = PublishController::new(connector, Arc::new(alert_sink));
    let mut console = Console::new(controller, config.simulation.clone());

    if cli.autostart {
        let (_, reply) = console.handle_line("start").await;
        println!("{}", reply);
    } else {
        println!("{}", console.handle_line("help").await.1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                console.handle_line("quit").await;
                break;
            }
            Some(alert) = alerts.recv() => {
                println!("{}", Console::render_alert(&alert));
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) if console.controller().is_running() => {
                        // Input closed after autostart: keep publishing until Ctrl+C
                        stdin_open = false;
                        continue;
                    }
                    Ok(None) => {
                        console.handle_line("quit").await;
                        break;
                    }
                    Err(e) => {
                        warn!("Reading console input failed: {}", e);
                        console.handle_line("quit").await;
                        break;
                    }
                };
                let (flow, reply) = console.handle_line(&line).await;
                println!("{}", reply);
                if flow == Flow::Quit {
                    break;
                }
            }
        }
    }

    let status = console.controller().status();
    info!(
        "Final stats: {} readings, {} alerts, {} publish errors",
        status.ticks, status.alerts, status.publish_errors
    );

    Ok(())
}
