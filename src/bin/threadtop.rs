//! threadtop - live per-thread CPU and allocation monitor.
//!
//! Usage:
//!   threadtop 1234                # top 10 threads by CPU, refresh every 10s
//!   threadtop 1234 -m syscpu -i 2 # order by kernel CPU, refresh every 2s
//!   threadtop 1234 -m 3 -n 5      # cumulative CPU, stop after 5 refreshes
//!
//! While running, type a command and press Enter (`h` lists them).

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use clap::Parser;
use crossterm::{cursor, execute, terminal};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use threadtop::collector::{ProcfsSource, RealFs, TelemetrySource};
use threadtop::command::{self, Command};
use threadtop::engine::{DetailMode, EngineConfig, ThreadMonitor};

/// Live per-thread resource monitor.
#[derive(Parser)]
#[command(name = "threadtop", about = "Per-thread CPU and allocation monitor", version)]
struct Args {
    /// Process to monitor.
    #[arg(value_name = "PID")]
    pid: u32,

    /// Refresh interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Order by: 1/cpu, 2/syscpu, 3/totalcpu, 4/totalsyscpu, 5/memory, 6/totalmemory.
    #[arg(short, long, default_value = "cpu")]
    mode: DetailMode,

    /// Number of threads shown.
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Report width in columns (minimum 80, default 100).
    #[arg(short, long)]
    width: Option<usize>,

    /// Stop after this many refreshes.
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Disable warning colors.
    #[arg(long)]
    no_color: bool,

    /// Do not clear the screen between refreshes.
    #[arg(long)]
    no_clear: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes stderr logging; stdout carries the report.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("threadtop={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads commands from stdin. Configuration changes are applied here; the
/// rest is forwarded to the poll loop.
fn spawn_command_reader(config: Arc<EngineConfig>, tx: Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let forwarded = command::parse_command(&line)
                .and_then(|cmd| command::apply(cmd, &config));
            match forwarded {
                Ok(Some(cmd)) => {
                    let quit = cmd == Command::Quit;
                    if tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => println!(" Applied, takes effect at next refresh."),
                Err(e) => println!(" {}", e),
            }
        }
        debug!("command reader finished");
    });
}

fn clear_screen() {
    let mut stdout = std::io::stdout();
    if let Err(e) = execute!(
        stdout,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    ) {
        debug!(error = %e, "failed to clear screen");
    }
}

fn print_flush(text: &str) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Handles forwarded commands. Returns `false` when the user asked to quit.
fn drain_commands<S: TelemetrySource>(
    rx: &Receiver<Command>,
    monitor: &mut ThreadMonitor<S>,
) -> bool {
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            Command::Quit => return false,
            Command::Reset => {
                monitor.reset();
                println!(" History reset.");
            }
            Command::Help => print_flush(&command::help_text()),
            Command::Stack(tid) => print_flush(&monitor.render_stack(tid)),
            Command::AllThreads => print_flush(&monitor.render_all_threads()),
            // Applied by the reader thread.
            Command::Mode(_) | Command::Limit(_) | Command::Interval(_) => {}
        }
    }
    true
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = match EngineConfig::new(args.mode, args.width, args.interval) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = config.set_limit(args.limit) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let interactive = std::io::stdin().is_terminal();
    config.set_command_hints(interactive);

    let source = ProcfsSource::new(RealFs::new(), &args.proc_path, args.pid);
    let mut monitor = ThreadMonitor::new(source, Arc::clone(&config))
        .with_color(!args.no_color && std::io::stdout().is_terminal());

    info!(
        pid = args.pid,
        mode = %args.mode,
        interval = args.interval,
        "starting monitor"
    );

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let (tx, rx) = mpsc::channel();
    if interactive {
        spawn_command_reader(Arc::clone(&config), tx);
    } else {
        drop(tx);
    }

    let mut ticks: u64 = 0;
    while running.load(Ordering::SeqCst) {
        if !args.no_clear {
            clear_screen();
        }
        let report = monitor.tick();
        print_flush(&report.text);
        ticks += 1;

        if monitor.should_exit() {
            error!(pid = args.pid, "process is gone");
            break;
        }
        if args.iterations.is_some_and(|n| ticks >= n) {
            break;
        }

        // Sleep with periodic checks for shutdown signal and commands.
        // The interval is re-read so a change shortens or extends this wait.
        let sleep_interval = Duration::from_millis(100);
        let mut slept = Duration::ZERO;
        while running.load(Ordering::SeqCst)
            && slept < Duration::from_secs(config.interval_secs())
        {
            if !drain_commands(&rx, &mut monitor) {
                running.store(false, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(sleep_interval);
            slept += sleep_interval;
        }
    }

    println!();
    info!(ticks, "monitor stopped");
    if monitor.should_exit() {
        std::process::exit(1);
    }
}
