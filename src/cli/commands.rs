// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// guiminer-rs - supervise external mining workers from the command line
#[derive(Parser, Debug)]
#[command(name = "guiminer-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, list profiles, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the supervisor
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Launch workers for the selected profiles and supervise them
    Start(StartOptions),

    /// Print the stored profiles
    List(ListOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the supervisor
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to the profile file (default: ~/.poclbm or %APPDATA%\poclbm\poclbm.ini)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Profiles to start by name (default: those flagged autostart)
    #[arg(short, long = "profile")]
    pub profiles: Vec<String>,

    /// Worker command, e.g. "python poclbm.py"
    #[arg(short, long, default_value = "poclbm")]
    pub executable: String,

    /// Working directory for workers (default: this program's directory)
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Seconds between status reports
    #[arg(short, long, default_value_t = 30)]
    pub report_interval: u64,

    /// Stop all workers after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Launch the configured Bitcoin client with -server before mining
    #[arg(short, long)]
    pub solo_server: bool,

    /// Write logs to this file instead of stdout
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
}

/// Options for listing profiles
#[derive(Parser, Debug)]
pub struct ListOptions {
    /// Path to the profile file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "guiminer.json")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_repeated_profiles() {
        let cli = Commands::try_parse_from([
            "guiminer-rs",
            "start",
            "-p",
            "alpha",
            "-p",
            "beta",
            "--executable",
            "python poclbm.py",
            "--duration",
            "60",
            "--solo-server",
        ])
        .unwrap();

        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.profiles, ["alpha", "beta"]);
                assert_eq!(opts.executable, "python poclbm.py");
                assert_eq!(opts.duration, Some(60));
                assert_eq!(opts.report_interval, 30);
                assert!(opts.solo_server);
                assert!(opts.config.is_none());
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
