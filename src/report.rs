use crate::alerts::{evaluate, Alert};
use crate::collectors::Readings;
use crate::config::Thresholds;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::message::AlertMessage;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use tracing::{info, warn};

pub enum Sink<'a> {
    Dispatch(&'a Dispatcher),
    /// Print the rendered message to stdout instead of sending it.
    DryRun,
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    AllClear,
    Dispatched(Vec<Alert>),
    Printed(Vec<Alert>),
}

pub async fn report<Tz>(
    readings: &Readings,
    thresholds: &Thresholds,
    hostname: Option<String>,
    now: DateTime<Tz>,
    sink: Sink<'_>,
) -> Result<Outcome, DispatchError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let alerts = evaluate(readings, thresholds);
    if alerts.is_empty() {
        info!("превышений порогов не обнаружено");
        return Ok(Outcome::AllClear);
    }

    for alert in &alerts {
        warn!(kind = ?alert.kind, "{}", alert.text);
    }
    let message = AlertMessage::new(hostname, now, alerts);
    let text = message.render();
    match sink {
        Sink::Dispatch(dispatcher) => {
            dispatcher.send(&text).await?;
            Ok(Outcome::Dispatched(message.alerts))
        }
        Sink::DryRun => {
            println!("{text}");
            Ok(Outcome::Printed(message.alerts))
        }
    }
}
