use crate::alerts::Alert;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use sysinfo::{System, SystemExt};
use tracing::debug;

const UNKNOWN_HOST: &str = "unknown";

#[derive(Debug, Clone)]
pub struct AlertMessage<Tz: TimeZone> {
    pub hostname: String,
    pub timestamp: DateTime<Tz>,
    pub alerts: Vec<Alert>,
}

impl<Tz> AlertMessage<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(hostname: Option<String>, timestamp: DateTime<Tz>, alerts: Vec<Alert>) -> Self {
        let hostname = hostname
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| UNKNOWN_HOST.to_string());
        Self {
            hostname,
            timestamp,
            alerts,
        }
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.alerts.len() + 3);
        lines.push(format!("Мониторинг сервера: {}", self.hostname));
        lines.push(format!(
            "Время: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S %Z")
        ));
        lines.push("Проблемы:".to_string());
        lines.extend(self.alerts.iter().map(|a| format!("- {}", a.text)));
        lines.join("\n")
    }
}

pub fn resolve_hostname() -> Option<String> {
    System::new().host_name()
}

/// Current time in the host's named zone, so `%Z` renders an abbreviation
/// such as `MSK` rather than a bare offset.
pub fn local_now() -> DateTime<chrono_tz::Tz> {
    let zone = zone_from(
        std::env::var("TZ").ok(),
        iana_time_zone::get_timezone().ok(),
    );
    Utc::now().with_timezone(&zone)
}

/// `TZ` wins when it names an IANA zone (a leading `:` is allowed), then the
/// system zone, then UTC.
fn zone_from(tz_var: Option<String>, system: Option<String>) -> chrono_tz::Tz {
    let from_var = tz_var.and_then(|raw| {
        let name = raw.trim().trim_start_matches(':');
        let zone = name.parse::<chrono_tz::Tz>().ok();
        if zone.is_none() {
            debug!(tz = %raw, "TZ не распознан, используется системный пояс");
        }
        zone
    });
    from_var
        .or_else(|| system.and_then(|name| name.trim().parse::<chrono_tz::Tz>().ok()))
        .unwrap_or(chrono_tz::UTC)
}

/// Binary-prefixed size with one decimal, e.g. `1.5 KiB`.
pub fn format_bytes(v: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if v < UNIT {
        return format!("{v} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = v / UNIT;
    while n >= UNIT && exp < SUFFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}", v as f64 / div as f64, SUFFIXES[exp])
}
