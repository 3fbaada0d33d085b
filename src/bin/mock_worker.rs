// src/bin/mock_worker.rs
//! Scripted stand-in for a mining worker
//!
//! Accepts the same arguments a real worker gets and prints a predictable
//! stream of status lines, so the supervisor can be exercised without a
//! GPU. Extra flags after `--verbose` select what gets printed.

use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Rate lines followed by accepted shares
    Pool,
    /// Rate lines followed by difficulty-1 checks
    Solo,
}

#[derive(Parser, Debug)]
#[command(name = "mock_worker", about = "Prints worker-style status lines")]
struct Args {
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    pass: Option<String>,

    #[arg(short = 'o')]
    host: Option<String>,

    #[arg(short = 'p')]
    port: Option<String>,

    #[arg(short = 'd')]
    device: Option<String>,

    #[arg(long)]
    verbose: bool,

    /// What kind of progress to report
    #[arg(long, value_enum, default_value_t = Mode::Pool)]
    mode: Mode,

    /// Number of rate/progress rounds
    #[arg(long, default_value_t = 3)]
    rounds: u64,

    /// Rate reported in the first round, in khash/s
    #[arg(long, default_value_t = 300)]
    rate: u64,

    /// Stale shares printed after the rounds (pool mode)
    #[arg(long, default_value_t = 0)]
    rejects: u64,

    /// Free-form line printed before the rounds
    #[arg(long)]
    banner: Option<String>,

    /// Delay between lines in milliseconds
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Keep running after the script until terminated
    #[arg(long)]
    hold: bool,

    /// Exit code once the script is done
    #[arg(long, default_value_t = 0)]
    exit_code: i32,
}

fn emit(out: &mut impl Write, line: &str, interval: Duration) -> io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()?;
    if !interval.is_zero() {
        thread::sleep(interval);
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let interval = Duration::from_millis(args.interval_ms);
    let mut out = io::stdout().lock();

    if let Some(banner) = &args.banner {
        emit(&mut out, banner, interval)?;
    }

    for round in 0..args.rounds {
        emit(&mut out, &format!("{} khash/s", args.rate + round), interval)?;
        match args.mode {
            Mode::Pool => emit(&mut out, &format!("{:08x}, accepted", round), interval)?,
            Mode::Solo => emit(&mut out, &format!("checking {}", round), interval)?,
        }
    }

    if args.mode == Mode::Pool {
        for _ in 0..args.rejects {
            emit(&mut out, "invalid or stale", interval)?;
        }
    }

    if args.hold {
        loop {
            thread::sleep(Duration::from_secs(1));
        }
    }

    drop(out);
    std::process::exit(args.exit_code);
}
