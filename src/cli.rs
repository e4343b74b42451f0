use std::path::PathBuf;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "headset-companion", version, about = "Companion driver for headsets with a serial protocol channel")]
pub struct Args {
    /// List the serial ports available on this machine and exit.
    #[arg(long)]
    pub list_ports: bool,

    /// Run a complete session against a simulated headset and exit.
    #[arg(long)]
    pub simulate: bool,

    /// Serial port of the headset's protocol channel, for example /dev/rfcomm0 or COM5.
    #[arg(long)]
    pub port: Option<String>,

    /// Baud rate to open the port with.
    #[arg(long)]
    pub baud: Option<u32>,

    /// Write the given --port and --baud to the config file.
    #[arg(long)]
    pub save: bool,

    /// Use this config file instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}
