//! Reflow station host simulator.
//!
//! Runs the control core against the simulated thermal plant, either
//! accelerated (default) or in real time.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  SimulatedStation    LogEventSink    FeedbackSink   HostClock│
//! │  (TC+Heater+Fan)     (EventSink)     (EventSink)             │
//! │  RingProcessLog / CsvProcessLog (ProcessLog)                 │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              AppService (pure logic)                   │  │
//! │  │  Sensors · Safety · FSM · PID · SSR · Fans             │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  SnapshotCell (status readers) · FeedbackQueue (cues)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use reflowstation::adapters::feedback_sink::FeedbackSink;
use reflowstation::adapters::log_sink::LogEventSink;
use reflowstation::adapters::process_log::{CsvProcessLog, RingProcessLog};
use reflowstation::adapters::sim::SimulatedStation;
use reflowstation::adapters::time::{Clock, HostClock, ManualClock};
use reflowstation::app::events::{AppEvent, LogRow};
use reflowstation::app::ports::{EventSink, ProcessLog};
use reflowstation::app::service::AppService;
use reflowstation::app::snapshot::SnapshotCell;
use reflowstation::config::{validate_config, ControllerConfig};
use reflowstation::control::Zone;
use reflowstation::error::{Error, ThermocoupleError};
use reflowstation::feedback::FeedbackQueue;
use reflowstation::fsm::RunState;
use reflowstation::profile::Profile;
use reflowstation::sensors::ChannelId;

/// Rows kept in RAM for the end-of-run summary.
const RING_ROWS: usize = 512;

/// Hard stop for a simulated session (simulated time).
const MAX_SESSION_MS: u64 = 30 * 60 * 1000;

static FEEDBACK: FeedbackQueue = FeedbackQueue::new();

// ── CLI ───────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "reflowstation")]
#[command(about = "Reflow station controller driving a simulated thermal plant", long_about = None)]
struct Cli {
    /// Controller configuration JSON (defaults if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pace ticks on the wall clock instead of running accelerated
    #[arg(long, global = true)]
    realtime: bool,
    /// Print a status snapshot every N ticks
    #[arg(long, global = true, default_value_t = 25)]
    status_every: u64,
    /// Stream the process log to this CSV file
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reflow profile
    Run {
        /// Profile JSON (built-in lead-free BGA profile if omitted)
        #[arg(long)]
        profile: Option<PathBuf>,
        #[command(flatten)]
        faults: FaultArgs,
    },
    /// Autotune one heating zone
    Autotune {
        #[arg(value_enum)]
        zone: ZoneArg,
        /// Target temperature (°C)
        target: f32,
        #[command(flatten)]
        faults: FaultArgs,
    },
    /// Print the built-in profile as JSON
    Profile,
}

#[derive(clap::Args)]
struct FaultArgs {
    /// Open-circuit a thermocouple channel (repeatable)
    #[arg(long = "open-circuit", value_enum)]
    open_circuit: Vec<ChannelArg>,
    /// Force the external probe to read this temperature
    #[arg(long)]
    overheat: Option<f32>,
    /// Seconds into the session at which the faults appear
    #[arg(long, default_value_t = 0)]
    fault_at: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoneArg {
    Top,
    Bottom,
    Ir,
}

impl From<ZoneArg> for Zone {
    fn from(z: ZoneArg) -> Self {
        match z {
            ZoneArg::Top => Zone::Top,
            ZoneArg::Bottom => Zone::Bottom,
            ZoneArg::Ir => Zone::Ir,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Top,
    Bottom,
    Ir,
    External,
}

impl From<ChannelArg> for ChannelId {
    fn from(c: ChannelArg) -> Self {
        match c {
            ChannelArg::Top => ChannelId::Top,
            ChannelArg::Bottom => ChannelId::Bottom,
            ChannelArg::Ir => ChannelId::Ir,
            ChannelArg::External => ChannelId::External,
        }
    }
}

// ── Process log fan-out ───────────────────────────────────────

struct SessionLog {
    ring: RingProcessLog<RING_ROWS>,
    csv: Option<CsvProcessLog<BufWriter<File>>>,
}

impl ProcessLog for SessionLog {
    fn append_row(&mut self, row: &LogRow) {
        self.ring.append_row(row);
        if let Some(csv) = self.csv.as_mut() {
            csv.append_row(row);
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Profile => {
            println!("{}", Profile::lead_free_bga().to_json().map_err(Error::from)?);
            Ok(())
        }
        Commands::Run { ref profile, ref faults } => {
            let profile = match profile {
                Some(path) => load_profile(path)?,
                None => Profile::lead_free_bga(),
            };
            run_session(&cli, config, Session::Run(profile), faults)
        }
        Commands::Autotune {
            zone,
            target,
            ref faults,
        } => run_session(&cli, config, Session::Autotune(zone.into(), target), faults),
    }
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    let Some(path) = path else {
        return Ok(ControllerConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let config: ControllerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    validate_config(&config)?;
    info!("Config loaded from {}", path.display());
    Ok(config)
}

fn load_profile(path: &Path) -> Result<Profile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let profile = Profile::from_json(&bytes).map_err(Error::from)?;
    profile.validate().map_err(Error::from)?;
    Ok(profile)
}

enum Session {
    Run(Profile),
    Autotune(Zone, f32),
}

fn run_session(cli: &Cli, config: ControllerConfig, session: Session, faults: &FaultArgs) -> Result<()> {
    let period_ms = u64::from(config.sample_period_ms);
    let mut app = AppService::new(config);
    let mut plant = SimulatedStation::default();
    let cell = SnapshotCell::new();

    let csv = match &cli.csv {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Some(CsvProcessLog::new(BufWriter::new(file))?)
        }
        None => None,
    };
    let mut log = SessionLog {
        ring: RingProcessLog::new(),
        csv,
    };
    let mut sink = (LogEventSink::new(), FeedbackSink::new(&FEEDBACK));
    app.announce(&mut sink);

    match session {
        Session::Run(profile) => app.start(profile, &mut sink)?,
        Session::Autotune(zone, target) => app.start_autotune(zone, target, &mut sink)?,
    }

    let wall = HostClock::new();
    let mut sim_clock = ManualClock::new();
    let fault_at_ms = faults.fault_at.saturating_mul(1000);
    let mut faults_applied = false;

    loop {
        let now = if cli.realtime {
            wall.uptime_ms()
        } else {
            sim_clock.uptime_ms()
        };

        if !faults_applied && now >= fault_at_ms {
            inject_faults(&mut plant, faults);
            faults_applied = true;
        }

        app.tick(now, &mut plant, &mut log, &mut sink);
        cell.publish(app.snapshot());
        FEEDBACK.drain(|cue| info!("feedback: {:?}", cue));

        if cli.status_every > 0 && app.tick_count() % cli.status_every == 0 {
            let status = cell.latest();
            println!("{}", status.to_json()?);
            sink.emit(&AppEvent::Telemetry(status));
        }

        let state = app.state();
        let settled = match state {
            RunState::Done | RunState::Aborted => !app.snapshot().cooling,
            RunState::Idle => true,
            _ => false,
        };
        if settled {
            break;
        }
        if now >= MAX_SESSION_MS {
            warn!("session time limit reached in {:?}", state);
            break;
        }

        if cli.realtime {
            wall.sleep_until(now + period_ms);
            plant.advance(wall.uptime_ms().saturating_sub(now));
        } else {
            sim_clock.advance(period_ms);
            plant.advance(period_ms);
        }
    }

    if let Some(csv) = log.csv.as_mut() {
        csv.flush()?;
    }
    println!("{}", cell.latest().to_json()?);
    info!(
        "Session ended in {:?} after {} ticks ({} rows logged, {} evicted)",
        app.state(),
        app.tick_count(),
        log.ring.len(),
        log.ring.evicted()
    );
    for zone in Zone::ALL {
        let gains = app.zone_gains(zone);
        info!(
            "{:?} gains: Kp={:.3} Ki={:.4} Kd={:.3}",
            zone, gains.kp, gains.ki, gains.kd
        );
    }

    if app.state() == RunState::Aborted {
        bail!("run aborted (faults 0b{:08b})", app.fault_flags());
    }
    Ok(())
}

fn inject_faults(plant: &mut SimulatedStation, faults: &FaultArgs) {
    for &channel in &faults.open_circuit {
        let channel = ChannelId::from(channel);
        warn!("sim: open-circuit on {:?}", channel);
        plant.inject_error(channel, ThermocoupleError::OpenCircuit);
    }
    if let Some(celsius) = faults.overheat {
        warn!("sim: external probe forced to {celsius}\u{00b0}C");
        plant.inject_reading(ChannelId::External, celsius);
    }
}
