use std::env;
use log::info;

use crate::cli::Args;
use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::constants::make_headset_serial_service_uuid;
use crate::error::{AppRunError, DeviceError};

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod sim;
pub mod transport;

pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

fn print_ports() -> Result<(), DeviceError> {
    let ports = transport::list_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        for port in &ports {
            println!("{}  [{}]", port.port_name, transport::describe_port(port));
        }
    }

    println!("Headset protocol channels register under Bluetooth service {}.", make_headset_serial_service_uuid());
    Ok(())
}

// checks that the configured port can actually be opened. driving a real
// headset additionally needs a protocol engine for its model, which library
// users plug into DeviceSession::open().
fn probe_port(path: &str, baud_rate: u32) -> Result<(), DeviceError> {
    let stream = transport::open_port(path, baud_rate)?;
    drop(stream);

    println!("Serial port {} opened successfully at {} baud.", path, baud_rate);
    Ok(())
}

pub async fn run(args: Args) -> Result<(), AppRunError> {
    if args.list_ports {
        print_ports()?;
        return Ok(());
    }

    if args.simulate {
        sim::headset::run_simulation().await?;
        return Ok(());
    }

    let mut config_io = match &args.config {
        Some(path) => ConfigIO::from_path(path)?,
        None => ConfigIO::new_sync()?,
    };

    let mut config = match config_io.read().await {
        Ok(config) => config,
        Err(err) if err.is_file_not_found_error() => {
            info!("No config file yet, using defaults");
            Config::default()
        },
        Err(err) => return Err(err.into()),
    };

    if let Some(port) = &args.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }

    if args.save {
        let mut locker = config_io.locker()?;
        let _guard = locker.lock()?;
        config_io.save(config.clone()).await?;
        info!("Configuration saved");
    }

    match &config.port {
        Some(port) => {
            probe_port(port, config.baud_rate)?;
        },
        None => {
            println!("No serial port configured.");
            println!("Pair the headset, bind its serial service {} to a local port,", make_headset_serial_service_uuid());
            println!("then probe it with --port <PATH> (add --save to remember it).");
            println!("Use --list-ports to see candidates, or --simulate to run without hardware.");
        },
    }

    Ok(())
}
