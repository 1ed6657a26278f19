mod alerts;
mod collectors;
mod config;
mod dispatch;
mod message;
mod report;

use clap::Parser;
use collectors::cpu::DEFAULT_SAMPLE_INTERVAL;
use collectors::disk::{FsTypeExclusions, Statvfs};
use collectors::procfs::ProcFs;
use collectors::Probe;
use config::Config;
use dispatch::Dispatcher;
use report::{Outcome, Sink};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostprobe")]
#[command(version, about = "Разовая проверка CPU, RAM и дисков с отправкой оповещения")]
struct Cli {
    /// Print the alert message instead of sending it.
    #[arg(long)]
    dry_run: bool,
    /// CPU sampling window, e.g. `300ms` or `1s` [default: 300ms].
    #[arg(long, value_parser = humantime::parse_duration)]
    sample_interval: Option<Duration>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };

    let dispatcher = if cli.dry_run {
        None
    } else {
        match Dispatcher::new(&cfg) {
            Ok(d) => Some(d),
            Err(err) => {
                error!(error = %err, "не удалось подготовить отправку оповещений");
                std::process::exit(1);
            }
        }
    };

    let sample_interval = cli.sample_interval.unwrap_or(DEFAULT_SAMPLE_INTERVAL);
    info!(
        sample_interval_ms = sample_interval.as_millis() as u64,
        cpu_threshold = cfg.thresholds.cpu_percent,
        ram_threshold = cfg.thresholds.ram_percent,
        disk_threshold = cfg.thresholds.disk_percent,
        "запуск проверки"
    );

    let probe = Probe {
        reader: ProcFs::default(),
        fs: Statvfs,
        exclusions: FsTypeExclusions::default(),
        sample_interval,
    };
    let readings = match tokio::task::spawn_blocking(move || probe.collect()).await {
        Ok(readings) => readings,
        Err(err) => {
            error!(error = %err, "сбор метрик завершился аварийно");
            std::process::exit(1);
        }
    };

    let sink = match &dispatcher {
        Some(d) => Sink::Dispatch(d),
        None => Sink::DryRun,
    };
    let hostname = message::resolve_hostname();
    match report::report(&readings, &cfg.thresholds, hostname, message::local_now(), sink).await {
        Ok(Outcome::AllClear) => {}
        Ok(Outcome::Dispatched(alerts)) | Ok(Outcome::Printed(alerts)) => {
            info!(alerts = alerts.len(), dry_run = cli.dry_run, "проверка завершена");
        }
        Err(err) => {
            error!(error = %err, "не удалось отправить оповещение");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
