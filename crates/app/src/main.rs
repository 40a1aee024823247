use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tuner_core::{
    hardware::{
        linux::{open_adc, open_expander, open_pin_monitor},
        Pcf8574Indicator, DEFAULT_WATCHED_PINS,
    },
    AnalogSource, AppConfig, BandTable, ContentController, MpcController, SpeechAnnouncer, Tuner,
    TunerActions, TunerError, MAX_ADC,
};

/// Reference voltage of the converter.
const VREF: f32 = 3.3;

fn main() -> tuner_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_tuner(&config),
        Commands::Read { interval_ms } => run_read(&config, Duration::from_millis(interval_ms)),
        Commands::ClearLed => run_clear_led(&config),
        Commands::Bands => run_bands(&config),
        Commands::Pins { pins, interval_ms } => {
            let pins = if pins.is_empty() {
                DEFAULT_WATCHED_PINS.to_vec()
            } else {
                pins
            };
            run_pins(&config, &pins, Duration::from_millis(interval_ms))
        }
    }
}

fn load_config(path: Option<&Path>) -> tuner_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::live_defaults()),
    }
}

fn run_tuner(config: &AppConfig) -> tuner_core::Result<()> {
    let (table, smoother) = config.validate()?;
    print_bands(&table);

    let stop = install_stop_handler()?;

    let source = open_adc(config)?;

    let mut expander = open_expander(config)?;
    if let Err(err) = expander.reset() {
        tracing::warn!(%err, "could not reset I2C expander");
    }
    let indicator = Pcf8574Indicator::new(expander, config.indicator.pin);

    let mut player = MpcController::new(config.player.program.clone());
    if let Err(err) = player.clear() {
        tracing::warn!(%err, "could not clear playlist at startup");
    }

    let mut actions = TunerActions::new(Box::new(indicator), Box::new(player));
    if let Some(program) = &config.announcer.program {
        actions = actions.with_announcer(Box::new(SpeechAnnouncer::new(program.clone())));
    }

    let mut tuner = Tuner::new(source, config.adc.channel, smoother, table, Box::new(actions))?
        .with_poll_interval(config.poll_interval());

    tracing::info!(
        samples = smoother.samples(),
        poll_ms = config.poll_interval().as_millis() as u64,
        "tuner running, press Ctrl+C to exit"
    );
    tuner.run(&stop)?;

    println!("Program terminated by user.");
    Ok(())
}

fn run_read(config: &AppConfig, interval: Duration) -> tuner_core::Result<()> {
    let stop = install_stop_handler()?;
    let mut source = open_adc(config)?;
    let channel = config.adc.channel;

    println!("Reading potentiometer on MCP3008 channel {channel} (Ctrl+C to exit)...");
    while !stop.load(Ordering::Relaxed) {
        let value = source.read_raw(channel)?;
        let voltage = f32::from(value) * VREF / f32::from(MAX_ADC);
        let switch = if source.is_enabled()? { "on" } else { "off" };
        println!("ADC Value: {value}, Voltage: {voltage:.2}V, Switch: {switch}");
        thread::sleep(interval);
    }

    source.release();
    println!("Program terminated by user.");
    Ok(())
}

fn run_clear_led(config: &AppConfig) -> tuner_core::Result<()> {
    let mut expander = open_expander(config)?;
    expander.close()?;
    tracing::info!(address = config.indicator.address, "expander pins reset");
    Ok(())
}

fn run_pins(config: &AppConfig, pins: &[u32], interval: Duration) -> tuner_core::Result<()> {
    let stop = install_stop_handler()?;
    let mut monitor = open_pin_monitor(config, pins)?;

    println!("Watching GPIO pins {pins:?} on {} (Ctrl+C to exit)...", config.gpio_chip);
    while !stop.load(Ordering::Relaxed) {
        for (pin, high) in monitor.sample()? {
            println!("{pin}: {}", u8::from(high));
        }
        println!();
        thread::sleep(interval);
    }

    println!("Program terminated by user.");
    Ok(())
}

fn run_bands(config: &AppConfig) -> tuner_core::Result<()> {
    let (table, smoother) = config.validate()?;
    print_bands(&table);
    println!(
        "Smoothing: {} samples, {} ms settle",
        smoother.samples(),
        smoother.settle().as_millis()
    );
    Ok(())
}

fn print_bands(table: &BandTable) {
    println!("Bands:");
    for (index, band) in table.bands().iter().enumerate() {
        let stream = band.uri.as_deref().unwrap_or("-");
        println!("  {}: {band} -> {stream}", index + 1);
    }
}

fn install_stop_handler() -> tuner_core::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        tracing::info!("shutting down...");
        flag.store(true, Ordering::Relaxed);
    })
    .map_err(|err| TunerError::msg(format!("could not install Ctrl+C handler: {err}")))?;
    Ok(stop)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Potentiometer radio tuner", long_about = None)]
struct Cli {
    /// JSON configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the knob and tune the player until interrupted.
    Run,
    /// Print raw ADC readings and the switch state.
    Read {
        /// Delay between readings.
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Drive every indicator expander pin high and exit.
    ClearLed,
    /// Validate the configuration and print the band table.
    Bands,
    /// Print the level of a set of GPIO input pins.
    Pins {
        /// Line offsets (BCM numbers) to watch. Defaults to the header's
        /// free inputs.
        #[arg(value_delimiter = ',')]
        pins: Vec<u32>,
        /// Delay between samples.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}
