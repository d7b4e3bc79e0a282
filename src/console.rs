//! Line-oriented operator console standing in for the original form window.
//!
//! Each line is one command; the form fields persist between commands and
//! are re-validated every time publishing starts.

use crate::alarms::Alert;
use crate::config::{FormInput, SimulationSettings};
use crate::controller::{ControllerState, PublishController};

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Set { field: String, value: String },
    Show,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let command = match verb.as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "toggle" | "t" => Command::Toggle,
            "show" | "form" => Command::Show,
            "status" | "s" => Command::Status,
            "help" | "?" | "" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "set" => {
                let field = words.next().ok_or("usage: set <field> <value>")?;
                let value = words.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    return Err("usage: set <field> <value>".to_string());
                }
                Command::Set {
                    field: field.to_ascii_lowercase(),
                    value,
                }
            }
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(command)
    }
}

/// Whether the console should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
commands:
  start | stop | toggle        control publishing
  set <field> <value>          fields: topic, initial, step, interval, threshold
  show                         print the form
  status                       print publishing state
  quit                         stop and exit";

pub struct Console {
    controller: PublishController,
    base: SimulationSettings,
    form: FormInput,
}

impl Console {
    pub fn new(controller: PublishController, base: SimulationSettings) -> Self {
        let form = FormInput::from(&base);
        Self {
            controller,
            base,
            form,
        }
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn controller(&self) -> &PublishController {
        &self.controller
    }

    /// Run one input line, returning the reply to print.
    pub async fn handle_line(&mut self, line: &str) -> (Flow, String) {
        match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(message) => (Flow::Continue, message),
        }
    }

    pub async fn execute(&mut self, command: Command) -> (Flow, String) {
        let reply = match command {
            Command::Toggle if self.controller.is_running() => self.stop_reply(),
            Command::Start | Command::Toggle => {
                if self.controller.is_running() {
                    "already publishing".to_string()
                } else {
                    match self.controller.start_from_form(&self.form, &self.base).await {
                        Ok(()) => format!("publishing to '{}' [Stop Publishing]", self.form.topic.trim()),
                        Err(e) => e.to_string(),
                    }
                }
            }
            Command::Stop => self.stop_reply(),
            Command::Set { field, value } => {
                if self.form.set(&field, &value) {
                    format!("{} = {}", field, value)
                } else {
                    format!("unknown field '{}'", field)
                }
            }
            Command::Show => format!(
                "topic: {}\ninitial: {}\nstep: {}\ninterval: {}\nthreshold: {}",
                self.form.topic,
                self.form.initial_value,
                self.form.step,
                self.form.interval,
                self.form.threshold
            ),
            Command::Status => {
                let status = self.controller.status();
                let state = match status.state {
                    ControllerState::Idle => "idle",
                    ControllerState::Running => "running",
                };
                format!(
                    "{} | ticks {} | alerts {} | publish errors {} | last {}",
                    state,
                    status.ticks,
                    status.alerts,
                    status.publish_errors,
                    status
                        .last_value
                        .map(|v| format!("{} ppm", v))
                        .unwrap_or_else(|| "-".to_string())
                )
            }
            Command::Help => HELP.to_string(),
            Command::Quit => {
                self.controller.shutdown().await;
                return (Flow::Quit, "bye".to_string());
            }
        };
        (Flow::Continue, reply)
    }

    fn stop_reply(&mut self) -> String {
        if self.controller.stop() {
            "stopped [Start Publishing]".to_string()
        } else {
            "not publishing".to_string()
        }
    }

    /// Text for the alert line under the form.
    pub fn render_alert(alert: &Alert) -> String {
        format!("ALERT: {}", alert.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarms::LogAlertSink;
    use crate::broker::MemoryBroker;
    use std::sync::Arc;

    fn console(broker: &MemoryBroker) -> Console {
        let controller = PublishController::new(Arc::new(broker.clone()), Arc::new(LogAlertSink));
        Console::new(controller, SimulationSettings::default())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("start"), Ok(Command::Start));
        assert_eq!(Command::parse("  TOGGLE "), Ok(Command::Toggle));
        assert_eq!(Command::parse(""), Ok(Command::Help));
        assert_eq!(
            Command::parse("set topic lab/room 2"),
            Ok(Command::Set {
                field: "topic".into(),
                value: "lab/room 2".into()
            })
        );
        assert!(Command::parse("set step").is_err());
        assert!(Command::parse("launch").is_err());
    }

    #[tokio::test]
    async fn test_invalid_form_blocks_start() {
        let broker = MemoryBroker::new();
        let mut console = console(&broker);

        console.handle_line("set initial -1").await;
        let (flow, reply) = console.handle_line("start").await;
        assert_eq!(flow, Flow::Continue);
        assert!(reply.contains("negative"), "{}", reply);
        assert!(!console.controller().is_running());
        assert_eq!(broker.sessions(), 0);
    }

    #[tokio::test]
    async fn test_toggle_and_quit() {
        let broker = MemoryBroker::new();
        let mut console = console(&broker);

        console.handle_line("set interval 0.5").await;
        assert_eq!(console.form().interval, "0.5");

        let (_, reply) = console.handle_line("toggle").await;
        assert!(reply.starts_with("publishing"), "{}", reply);
        let (_, reply) = console.handle_line("start").await;
        assert_eq!(reply, "already publishing");
        let (_, reply) = console.handle_line("status").await;
        assert!(reply.starts_with("running"), "{}", reply);

        let (_, reply) = console.handle_line("toggle").await;
        assert!(reply.starts_with("stopped"));
        let (_, reply) = console.handle_line("stop").await;
        assert_eq!(reply, "not publishing");

        let (flow, _) = console.handle_line("quit").await;
        assert_eq!(flow, Flow::Quit);
    }

    #[test]
    fn test_render_alert() {
        let alert = Alert::new(6009, 6000, "t");
        assert_eq!(
            Console::render_alert(&alert),
            "ALERT: CO2 level has reached 6009 ppm, exceeding the limit!"
        );
    }
}
