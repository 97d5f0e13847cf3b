use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkwire::audio::{FRAME_PERIOD, FrameReader, MicSource, SAMPLE_RATE};
use talkwire::button::{ButtonSource, Debouncer, HotkeyButton, Level};
use talkwire::discovery::AddressResolver;
use talkwire::{Config, client};

/// Talkwire - push-to-talk voice client
#[derive(Parser)]
#[command(name = "talkwire", version, about)]
struct Cli {
    /// Path to a config file (default: platform config dir)
    #[arg(short, long, env = "TALKWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test the talk key and its debouncing
    TestButton {
        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
    /// Run backend discovery once and print the chosen address
    Resolve,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,talkwire=info",
        1 => "info,talkwire=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration),
            Command::TestButton { duration } => test_button(&config, duration),
            Command::Resolve => resolve(&config),
        };
    }

    client::run(config)?;
    Ok(())
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut reader = FrameReader::new(MicSource::new()?);
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    let frames_per_second = (1000 / FRAME_PERIOD.as_millis()) as usize;
    for second in 0..duration {
        let mut sum_squares = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut samples = 0_usize;

        for _ in 0..frames_per_second {
            let frame = reader.read_frame()?;
            for &s in frame.samples() {
                let norm = f64::from(s) / f64::from(i16::MAX);
                sum_squares += norm * norm;
                peak = peak.max(norm.abs());
                samples += 1;
            }
        }

        let rms = (sum_squares / samples as f64).sqrt();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = ((rms * 100.0).min(50.0)) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            second + 1,
            rms,
            peak,
            meter
        );
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test the talk key: print raw and debounced transitions
fn test_button(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!(
        "Testing talk key \"{}\" for {duration} seconds...",
        config.ptt_key
    );
    println!("Press and release it a few times.\n");

    let mut button = HotkeyButton::new(&config.ptt_key)?;
    let mut debouncer = Debouncer::new(config.debounce_interval);
    let mut last_raw = Level::Released;

    let deadline = Instant::now() + Duration::from_secs(duration);
    while Instant::now() < deadline {
        let now = Instant::now();
        let raw = if button.is_pressed() {
            Level::Pressed
        } else {
            Level::Released
        };

        if raw != last_raw {
            println!("raw:      {raw:?}");
            last_raw = raw;
        }
        if let Some(edge) = debouncer.poll(raw, now) {
            println!("debounced: {edge:?}");
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    println!("\nDone. Each press should show exactly one debounced edge.");
    Ok(())
}

/// Run discovery once and print the result
fn resolve(config: &Config) -> anyhow::Result<()> {
    println!(
        "Browsing for {} ({} attempts)...",
        config.service_type, config.discovery_attempts
    );

    let addr = AddressResolver::new(config.resolver()).resolve();
    println!("Backend address: {addr}");
    println!("(fallback is {})", config.fallback_addr);

    Ok(())
}
