// src/main.rs
//! Cardiac monitoring pipeline entry point

use clap::Parser;
use ecg_core::config::constants::paths;
use ecg_core::{Application, FilePlayback, PipelineConfig, SyntheticEcg, SyntheticEcgConfig};
use env_logger::Env;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "ecg-core",
    version,
    about = "Real-time ECG acquisition, analysis and persistence pipeline"
)]
struct Cli {
    /// Force file-playback mode
    #[arg(short = 's', long)]
    simulate: bool,

    /// Acquisition window in seconds
    #[arg(short = 'd', long, default_value_t = 60)]
    duration: u64,

    /// Playback input path
    #[arg(default_value = paths::DEFAULT_INPUT_FILE)]
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = PipelineConfig {
        acquisition_duration: Duration::from_secs(cli.duration),
        // The TCP push server only runs in the live-source configuration
        tcp_port: if cli.simulate {
            None
        } else {
            Some(ecg_core::config::constants::network::DEFAULT_PORT)
        },
        ..Default::default()
    };

    init_logging(&config);

    println!("==================================");
    println!("Cardiac Monitoring System Starting");
    println!("==================================");

    let source: Box<dyn ecg_core::SampleSource> = if cli.simulate {
        match FilePlayback::new(&cli.file, config.voltage_range_v, false) {
            Ok(playback) => Box::new(playback),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        // No converter attached in this build; the synthetic source stands
        // in for the hardware front end
        Box::new(SyntheticEcg::new(SyntheticEcgConfig {
            sample_rate_sps: config.sample_rate_sps,
            ..Default::default()
        }))
    };

    let mut application = Application::new(config, source);
    register_signal_hooks(&application);

    if let Err(e) = application.start() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    application.run();
    ExitCode::SUCCESS
}

fn init_logging(config: &PipelineConfig) {
    let builder = || env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    match File::create(&config.log_file) {
        Ok(log_file) => builder()
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init(),
        Err(e) => {
            eprintln!(
                "warning: could not open log file {}: {}; logging to stderr",
                config.log_file.display(),
                e
            );
            builder().init();
        }
    }
}

#[cfg(unix)]
fn register_signal_hooks(application: &Application) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::flag;

    // The handler only sets the flag; every loop observes it cooperatively
    let shutdown = application.shutdown_flag();
    if let Err(e) = flag::register(SIGINT, shutdown.clone()) {
        eprintln!("warning: failed to register SIGINT hook: {}", e);
    }
    if let Err(e) = flag::register(SIGTERM, shutdown) {
        eprintln!("warning: failed to register SIGTERM hook: {}", e);
    }
}

#[cfg(not(unix))]
fn register_signal_hooks(_application: &Application) {}
