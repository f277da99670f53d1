use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use env_logger::Env;
use ping_toolkit::targets::sanitize_target;
use ping_toolkit::{
    AppConfig, ContinuousProbeLoop, Error, JsonPresenter, MultiTargetComparator, Presenter,
    SingleTargetProbeLoop, StopSignal, SystemPingExecutor, TargetList, TerminalPresenter,
};

/// Measure reachability and latency of network hosts with ping
#[derive(Parser, Debug)]
#[command(name = "ping-toolkit", version, about, long_about = None)]
struct Cli {
    /// Print final reports as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true, env = "PING_TOOLKIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Ping one host a fixed number of times
    Single {
        /// Host to ping (prompted for when omitted)
        target: Option<String>,

        /// Number of pings (prompted for when omitted)
        #[arg(short, long)]
        count: Option<u32>,

        /// Remember the target as the default
        #[arg(long)]
        save: bool,
    },
    /// Monitor one host live until Enter or Ctrl+C
    Monitor {
        /// Host to monitor (prompted for when omitted)
        target: Option<String>,

        /// Remember the target as the default
        #[arg(long)]
        save: bool,
    },
    /// Ping many hosts concurrently and rank them
    Compare {
        /// Extra hosts; when omitted, custom hosts are prompted for
        targets: Vec<String>,

        /// Skip the configured default targets
        #[arg(long)]
        no_defaults: bool,

        /// Number of hosts probed at the same time
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

/// Asks a question on stdout; `None` on an empty answer or end of input.
fn prompt(question: &str) -> io::Result<Option<String>> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Asks for a ping count until the answer is a positive integer.
fn prompt_count(default: u32) -> io::Result<u32> {
    let question = format!("Number of pings (default: {default}): ");
    loop {
        let Some(answer) = prompt(&question)? else {
            return Ok(default);
        };
        match parse_count(&answer) {
            Ok(count) => return Ok(count),
            Err(e) => println!("❌ {e}"),
        }
    }
}

fn parse_count(answer: &str) -> Result<u32, Error> {
    match answer.parse::<i64>() {
        Ok(count) if count > 0 => u32::try_from(count)
            .map_err(|_| Error::InvalidConfiguration(format!("{count} pings is too many"))),
        Ok(_) => Err(Error::InvalidConfiguration("ping count must be a positive number".into())),
        Err(_) => Err(Error::InvalidConfiguration("ping count must be a number".into())),
    }
}

fn resolve_target(given: Option<String>, config: &AppConfig, interactive: bool) -> io::Result<String> {
    if let Some(target) = given {
        return Ok(target);
    }
    if !interactive {
        return Ok(config.target.clone());
    }
    let question = format!("Enter target host (default: {}): ", config.target);
    Ok(prompt(&question)?.unwrap_or_else(|| config.target.clone()))
}

/// Ctrl+C always stops; in monitor mode so does Enter or end of input.
fn spawn_stop_listeners(stop: &StopSignal, watch_stdin: bool) {
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.stop();
        }
    });

    if watch_stdin {
        let on_enter = stop.clone();
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            on_enter.stop();
        });
    }
}

fn save_target(config: &mut AppConfig, target: &str, path: Option<&PathBuf>) {
    config.target = target.to_string();
    let saved = match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(e) = saved {
        log::warn!("Could not save settings: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let mut presenter: Box<dyn Presenter> = if cli.json {
        Box::new(JsonPresenter::stdout())
    } else {
        Box::new(TerminalPresenter::stdout())
    };
    let interactive = !cli.json;
    let executor = Arc::new(SystemPingExecutor::new());
    let stop = StopSignal::new();

    match cli.mode {
        Mode::Single { target, count, save } => {
            if interactive {
                println!("🏓 Ping Test\n{}", "=".repeat(40));
            }
            let target = sanitize_target(&resolve_target(target, &config, interactive)?)?;
            config.single.count = match count {
                Some(count) => count,
                None if interactive => prompt_count(config.single.count)?,
                None => config.single.count,
            };
            config.validate()?;
            if save {
                save_target(&mut config, &target, cli.config.as_ref());
            }

            spawn_stop_listeners(&stop, false);
            let report = SingleTargetProbeLoop::new(executor.as_ref(), config.single)
                .with_bands(config.display_bands, config.single_connection_bands)
                .run(&target, &stop, presenter.as_mut())
                .await?;
            if report.cancelled && interactive {
                println!("\n⏹️  Ping test stopped by user");
            }
            presenter.single_finished(&report);
        }

        Mode::Monitor { target, save } => {
            if interactive {
                println!("🔍 Real-time Ping Monitor\n{}", "=".repeat(40));
            }
            let target = sanitize_target(&resolve_target(target, &config, interactive)?)?;
            config.validate()?;
            if save {
                save_target(&mut config, &target, cli.config.as_ref());
            }
            if interactive {
                println!("\n🎯 Monitoring: {target}");
                println!(
                    "📊 Live statistics will update every {} seconds",
                    config.monitor.interval().as_secs_f64()
                );
                println!("⏹️  Press Ctrl+C or Enter to stop\n");
            }

            spawn_stop_listeners(&stop, true);
            let mut monitor = ContinuousProbeLoop::new(executor.as_ref(), config.monitor)
                .with_bands(config.display_bands, config.monitor_connection_bands);
            let summary = monitor.run(&target, &stop, presenter.as_mut()).await?;
            if interactive {
                println!("\n🛑 Stopping monitoring...");
            }
            presenter.monitor_finished(&summary);
        }

        Mode::Compare {
            targets,
            no_defaults,
            workers,
        } => {
            if let Some(workers) = workers {
                config.compare.workers = workers;
            }
            config.validate()?;

            let mut list = if no_defaults {
                TargetList::new()
            } else {
                config.compare_target_list()
            };

            if interactive {
                println!("🌐 Multi-Target Ping Comparator\n{}", "=".repeat(55));
                println!("\n📋 Default Targets:");
                for (i, target) in list.iter().enumerate() {
                    println!("  {:2}. {target}", i + 1);
                }
            }

            for target in &targets {
                list.push(target)?;
            }

            if targets.is_empty() && interactive {
                println!("\n🎯 Add Custom Targets (press Enter to skip):");
                while let Some(custom) = prompt("Enter custom target (or 'done' to finish): ")? {
                    if custom.eq_ignore_ascii_case("done") {
                        break;
                    }
                    match list.push(&custom) {
                        Ok(true) => println!("✅ Added: {custom}"),
                        Ok(false) => println!("↩️  Already listed: {custom}"),
                        Err(e) => println!("⚠️  {e}"),
                    }
                }
            }

            if interactive {
                println!("\n🎯 Final target list ({} targets):", list.len());
                for target in list.iter() {
                    println!("  • {target}");
                }
            }

            spawn_stop_listeners(&stop, false);
            let comparator = MultiTargetComparator::new(Arc::clone(&executor), config.compare)
                .with_bands(config.ranking_bands);
            presenter.comparison_started(&list);

            let outcome = tokio::select! {
                report = comparator.run_comparison(&list, presenter.as_mut()) => Some(report?),
                _ = stop.stopped() => None,
            };
            match outcome {
                Some(report) => presenter.comparison_finished(&report),
                None if interactive => println!("\n\n⏹️  Comparison stopped by user"),
                None => log::warn!("Comparison stopped before all targets finished"),
            }
        }
    }

    Ok(())
}
