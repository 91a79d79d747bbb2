use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use audio_lifecycle::config::{AppConfig, DeviceBackendKind};
use audio_lifecycle::host::Transition;
use audio_lifecycle::telemetry::{TelemetryCollector, TelemetrySnapshot};
use audio_lifecycle::{init_logging, AudioDeviceGuard, EventLoopHost, GuardState};
use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "lifecycle_sim",
    about = "Drive an audio device guard through scripted host lifecycle transitions"
)]
struct Cli {
    /// Configuration file (defaults to $AUDIO_LIFECYCLE_CONFIG or assets/lifecycle_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the device backend from the config file
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    /// Resume the host before the guard is created
    #[arg(long)]
    late: bool,
    /// Milliseconds to wait after each transition
    #[arg(long, default_value_t = 250)]
    dwell_ms: u64,
    /// Comma-separated transitions applied after the guard is created
    #[arg(long, value_enum, value_delimiter = ',', default_value = "resume,pause")]
    script: Vec<Step>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Stub,
    Platform,
}

impl From<Backend> for DeviceBackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Stub => DeviceBackendKind::Stub,
            Backend::Platform => DeviceBackendKind::Platform,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    Resume,
    Pause,
}

impl From<Step> for Transition {
    fn from(step: Step) -> Self {
        match step {
            Step::Resume => Transition::Resume,
            Step::Pause => Transition::Pause,
        }
    }
}

#[derive(Serialize)]
struct StepReport {
    step: Step,
    state: GuardState,
}

#[derive(Serialize)]
struct SimulationReport {
    backend: DeviceBackendKind,
    late: bool,
    initial_state: GuardState,
    steps: Vec<StepReport>,
    final_state: GuardState,
    telemetry: TelemetrySnapshot,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(backend) = cli.backend {
        config.device.backend = backend.into();
    }
    init_logging(&config.logging);

    let report = simulate(&config, &cli)?;
    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{json}");

    Ok(if report.final_state == GuardState::Detached {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn simulate(config: &AppConfig, cli: &Cli) -> Result<SimulationReport> {
    let telemetry = std::sync::Arc::new(TelemetryCollector::default());
    let host = EventLoopHost::spawn_with_telemetry(&config.host, telemetry.clone())
        .context("spawning host event loop")?;
    let dwell = Duration::from_millis(cli.dwell_ms);

    if cli.late {
        host.resume().context("resuming host before guard creation")?;
        host.flush().context("flushing early resume")?;
    }

    let guard =
        AudioDeviceGuard::from_config(&host, &config.device).context("scheduling guard")?;
    host.flush().context("flushing guard initialisation")?;
    let initial_state = guard.state();

    let mut steps = Vec::with_capacity(cli.script.len());
    for &step in &cli.script {
        host.transition(step.into())
            .with_context(|| format!("applying {step:?}"))?;
        host.flush().context("flushing transition")?;
        steps.push(StepReport {
            step,
            state: guard.state(),
        });
        thread::sleep(dwell);
    }

    guard.unregister();
    let final_state = guard.state();
    drop(guard);
    host.shutdown();

    Ok(SimulationReport {
        backend: config.device.backend,
        late: cli.late,
        initial_state,
        steps,
        final_state,
        telemetry: telemetry.snapshot(),
    })
}
