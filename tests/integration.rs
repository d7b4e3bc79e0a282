use co2sim::*;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn controller(broker: &MemoryBroker) -> (PublishController, tokio::sync::mpsc::UnboundedReceiver<Alert>) {
    let (sink, alerts) = ChannelAlertSink::channel();
    (PublishController::new(Arc::new(broker.clone()), Arc::new(sink)), alerts)
}

#[test]
fn test_config_file_feeds_form() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
broker:
  host: "test.mosquitto.org"
  port: 1884
  client_id: "co2sim-bench"
  qos: at_least_once
simulation:
  topic: "lab/room1/co2"
  initial_value: 400
  step: 5
  interval_secs: 0.5
  threshold: 1200
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.broker.host, "test.mosquitto.org");
    assert_eq!(config.broker.port, 1884);
    assert_eq!(config.broker.qos, MqttQos::AtLeastOnce);
    assert_eq!(config.broker.client_id(), "co2sim-bench");

    let form = FormInput::from(&config.simulation);
    assert_eq!(form.topic, "lab/room1/co2");
    assert_eq!(form.interval, "0.5");

    let sim = SimulationConfig::from_form(&form, &config.simulation).unwrap();
    assert_eq!(sim.initial_value, 400);
    assert_eq!(sim.step, 5);
    assert_eq!(sim.interval, Duration::from_millis(500));
    assert_eq!(sim.threshold, 1200);
    assert_eq!(sim.bounds, Bounds::new(0, 10_000));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, SimError::Io(_)));
}

#[test]
fn test_malformed_config_is_yaml_error() {
    let err = Config::from_yaml("simulation: [1, 2").unwrap_err();
    assert!(matches!(err, SimError::Yaml(_)));
}

#[tokio::test(start_paused = true)]
async fn test_session_publishes_walk_and_alerts() {
    let broker = MemoryBroker::new();
    let (mut controller, mut alerts) = controller(&broker);

    let settings = SimulationSettings {
        topic: "lab/co2".into(),
        initial_value: 5990,
        step: 10,
        interval_secs: 0.1,
        threshold: 6000,
        seed: Some(5),
        ..SimulationSettings::default()
    };
    let form = FormInput::from(&settings);
    controller.start_from_form(&form, &settings).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2050)).await;
    controller.shutdown().await;

    let messages = broker.messages();
    assert_eq!(messages.len(), 20);

    let values: Vec<i64> = messages
        .iter()
        .map(|m| {
            assert_eq!(m.topic, "lab/co2");
            m.payload.parse().unwrap()
        })
        .collect();

    let mut previous = 5990;
    for value in &values {
        assert!(*value == previous || *value == previous + 10, "{} after {}", value, previous);
        previous = *value;
    }

    let mut alerted = Vec::new();
    while let Ok(alert) = alerts.try_recv() {
        assert!(alert.message.contains(&alert.value.to_string()));
        alerted.push(alert.value);
    }
    let expected: Vec<i64> = values.iter().copied().filter(|v| *v >= 6000).collect();
    assert_eq!(alerted, expected);

    let status = controller.status();
    assert_eq!(status.state, ControllerState::Idle);
    assert_eq!(status.ticks, 20);
    assert_eq!(status.alerts, expected.len() as u64);
    assert_eq!(status.last_value, values.last().copied());
}

#[tokio::test(start_paused = true)]
async fn test_restart_opens_new_session_from_initial_value() {
    let broker = MemoryBroker::new();
    let (mut controller, _alerts) = controller(&broker);
    let settings = SimulationSettings {
        initial_value: 0,
        interval_secs: 1.0,
        ..SimulationSettings::default()
    };
    let form = FormInput::from(&settings);

    controller.start_from_form(&form, &settings).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    controller.stop();
    controller.start_from_form(&form, &settings).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    controller.shutdown().await;

    assert_eq!(broker.sessions(), 2);
    let payloads: Vec<String> = broker.messages().into_iter().map(|m| m.payload).collect();
    // Each session starts at the lower bound, so its first reading is one step up
    assert_eq!(payloads, vec!["10".to_string(), "10".to_string()]);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let broker = MemoryBroker::new();
    let (mut controller, _alerts) = controller(&broker);
    assert!(!controller.stop());
    assert_eq!(controller.status().state, ControllerState::Idle);
    assert!(broker.messages().is_empty());
}
