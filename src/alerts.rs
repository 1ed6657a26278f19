use crate::collectors::Readings;
use crate::config::Thresholds;
use crate::message::format_bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Cpu,
    Ram,
    Disk,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub text: String,
}

impl Alert {
    fn new(kind: AlertKind, text: String) -> Self {
        Self { kind, text }
    }
}

/// Compares every reading against its threshold (inclusive). Read failures
/// become alerts too, so a missing metric is always explained. Order: CPU,
/// RAM, then disks in scan order.
pub fn evaluate(readings: &Readings, thresholds: &Thresholds) -> Vec<Alert> {
    let mut out = Vec::new();

    match &readings.cpu {
        Err(err) => out.push(Alert::new(
            AlertKind::Cpu,
            format!("CPU: ошибка чтения ({err})"),
        )),
        Ok(usage) if *usage >= thresholds.cpu_percent => out.push(Alert::new(
            AlertKind::Cpu,
            format!("CPU: {:.1}% (порог {:.0}%)", usage, thresholds.cpu_percent),
        )),
        Ok(_) => {}
    }

    match &readings.memory {
        Err(err) => out.push(Alert::new(
            AlertKind::Ram,
            format!("RAM: ошибка чтения ({err})"),
        )),
        Ok(usage) if *usage >= thresholds.ram_percent => out.push(Alert::new(
            AlertKind::Ram,
            format!("RAM: {:.1}% (порог {:.0}%)", usage, thresholds.ram_percent),
        )),
        Ok(_) => {}
    }

    match &readings.disks {
        Err(err) => out.push(Alert::new(
            AlertKind::Disk,
            format!("Диск: ошибка чтения ({err})"),
        )),
        Ok(disks) => {
            for usage in disks {
                match usage {
                    Err(err) => out.push(Alert::new(
                        AlertKind::Disk,
                        format!("Диск {}: ошибка чтения ({err})", err.mount_point),
                    )),
                    Ok(d) if d.used_percent >= thresholds.disk_percent => out.push(Alert::new(
                        AlertKind::Disk,
                        format!(
                            "Диск {}: {:.1}% (использовано {} из {}, порог {:.0}%)",
                            d.mount_point,
                            d.used_percent,
                            format_bytes(d.used_bytes),
                            format_bytes(d.total_bytes),
                            thresholds.disk_percent
                        ),
                    )),
                    Ok(_) => {}
                }
            }
        }
    }

    out
}
