// src/main.rs
use clap::Parser;
use guiminer_rs::miner::{SessionRegistry, WorkerLauncher};
use guiminer_rs::stats::StatsReporter;
use guiminer_rs::stats::reporter::format_row;
use guiminer_rs::{EventLog, MinerError, cli, config, init_logging};
use std::time::{Duration, Instant};

/// Main entry point for the supervisor
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::List(opts) => list_profiles(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Launches the selected profiles and supervises them until they all
/// stop or the requested duration elapses
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads profiles
/// 3. Optionally launches the solo-mining client
/// 4. Starts the named (or autostart) profiles
/// 5. Drains worker events and reports periodically
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    init_logging(opts.log_file.as_deref())?;
    let log = EventLog::global("guiminer");

    let stored = config::load(opts.config.clone())?;
    let working_dir = opts
        .workdir
        .clone()
        .unwrap_or_else(WorkerLauncher::default_working_dir);
    let launcher = WorkerLauncher::from_command_line(&opts.executable, working_dir)?;

    let mut registry = SessionRegistry::new(launcher, log.scoped("guiminer::session"));
    registry.load_profiles(stored.profiles);

    if opts.solo_server {
        registry.launch_solo_server(&stored.bitcoin_executable)?;
    }

    if opts.profiles.is_empty() {
        for (id, e) in registry.start_autostart() {
            log::error!("Autostart of {} failed: {}", id, e);
        }
    } else {
        for name in &opts.profiles {
            let id = registry
                .find_by_name(name)
                .map(|s| s.id())
                .ok_or_else(|| MinerError::ConfigError(format!("No profile named \"{}\"", name)))?;
            registry.start(id)?;
        }
    }

    if !registry.any_running() {
        return Err(MinerError::ConfigError(
            "No profile was started; pass --profile or set autostart".into(),
        ));
    }

    let mut reporter = StatsReporter::new(
        Duration::from_secs(opts.report_interval),
        log.scoped("guiminer::stats"),
    );
    let deadline = opts.duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    while registry.any_running() {
        registry.wait_and_dispatch(Duration::from_millis(500));
        reporter.tick(&registry);
        if deadline.is_some_and(|d| Instant::now() >= d) {
            log::info!("Duration elapsed, stopping all workers");
            break;
        }
    }

    registry.stop_all();
    reporter.report(&registry);
    log::logger().flush();
    Ok(())
}

/// Prints stored profiles with their connection settings
fn list_profiles(opts: cli::ListOptions) -> Result<(), MinerError> {
    let stored = config::load(opts.config)?;
    if stored.profiles.is_empty() {
        println!("No profiles stored");
        return Ok(());
    }

    let registry = {
        let mut registry =
            SessionRegistry::new(WorkerLauncher::default(), EventLog::global("guiminer"));
        registry.load_profiles(stored.profiles);
        registry
    };
    for session in registry.iter() {
        let profile = session.config();
        println!(
            "{}  {}:{} user={} device={}",
            format_row(&session.summary_row()),
            profile.hostname,
            profile.port,
            profile.username,
            profile.device_index()
        );
    }
    Ok(())
}

/// Writes a configuration template to the requested path
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(opts.output, config)?;
    Ok(())
}
