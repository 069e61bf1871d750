use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, Duration};

use sensor_uploader::clock::SystemClock;
use sensor_uploader::device;
use sensor_uploader::logger;
use sensor_uploader::sensors::{self, SensorSource};
use sensor_uploader::{Collector, CollectorHandle, CollectorSettings, UploadClient, UploaderConfig};

#[derive(Parser, Debug)]
#[command(name = "sensor_uploader")]
#[command(about = "Collect vertical acceleration samples and upload them as JSON batches", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Collection endpoint (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Device identifier (overrides the config file and host id)
    #[arg(long)]
    device_id: Option<String>,

    /// Use synthetic sensor data instead of Termux:API
    #[arg(long)]
    mock: bool,

    /// Collect for this many seconds, then stop, send and exit (0 = interactive)
    #[arg(long, value_name = "SECONDS", default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!("Sensor Uploader starting");
    log::info!("  Endpoint: {}", config.endpoint);
    log::info!("  Source: {}", if args.mock { "mock" } else { "termux" });
    log::info!("  Timestamp offset: {}s", config.timestamp_offset_secs);
    log::info!("  Non-finite policy: {:?}", config.non_finite);

    let client = UploadClient::new(&config.endpoint)?;
    let (collector, handle, mut notifications) = Collector::new(
        CollectorSettings::from(&config),
        client,
        device::provider_for(&config),
        Box::new(SystemClock),
    );
    let collector_task = collector.spawn();

    let source = if args.mock { SensorSource::Mock } else { SensorSource::Termux };
    let sensor_tasks = vec![
        tokio::spawn(sensors::gravity_loop(handle.clone(), source, config.sensor_interval_ms)),
        tokio::spawn(sensors::linear_acceleration_loop(handle.clone(), source, config.sensor_interval_ms)),
        tokio::spawn(sensors::location_loop(handle.clone(), source, config.location_interval_ms)),
    ];

    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            println!("[{}] {}", ts_now(), notification);
        }
    });

    if args.duration > 0 {
        run_timed(&handle, args.duration).await?;
    } else {
        run_interactive(&handle).await?;
    }

    // Sources hold handles; the collector exits once all of them are gone
    for task in &sensor_tasks {
        task.abort();
    }
    for task in sensor_tasks {
        let _ = task.await;
    }
    drop(handle);

    collector_task.await?;
    printer.await?;
    Ok(())
}

fn load_config(args: &Args) -> Result<UploaderConfig> {
    let mut config = match &args.config {
        Some(path) => UploaderConfig::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => UploaderConfig::default(),
    };

    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(device_id) = &args.device_id {
        config.device_id = Some(device_id.clone());
    }

    config.validate()?;
    Ok(config)
}

async fn run_timed(handle: &CollectorHandle, seconds: u64) -> Result<()> {
    handle.start().await?;
    sleep(Duration::from_secs(seconds)).await;
    handle.stop().await?;
    print_status(handle).await?;
    handle.send().await?;
    Ok(())
}

async fn run_interactive(handle: &CollectorHandle) -> Result<()> {
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "start" => handle.start().await?,
            "stop" => handle.stop().await?,
            "send" => handle.send().await?,
            "status" => print_status(handle).await?,
            "help" => print_help(),
            "quit" | "exit" => break,
            "" => {}
            other => println!("Unknown command: {} (try 'help')", other),
        }
    }

    Ok(())
}

async fn print_status(handle: &CollectorHandle) -> Result<()> {
    let status = handle.status().await?;

    println!("\n=== Status ===");
    println!("State: {:?}", status.state);
    println!("Buffered samples: {}", status.sample_count);
    println!("Sensors enabled: {}", status.sensors_enabled);
    println!(
        "Location: {:.6}, {:.6}",
        status.location.latitude, status.location.longitude
    );
    println!(
        "Gravity: ({:.2}, {:.2}, {:.2})",
        status.gravity[0], status.gravity[1], status.gravity[2]
    );
    println!("Uploads in flight: {}", status.sends_in_flight);
    match handle.live_readout() {
        Some(readout) => println!("{}", readout),
        None => println!("No acceleration reading yet"),
    }
    Ok(())
}

fn print_help() {
    println!("Commands: start | stop | send | status | help | quit");
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
