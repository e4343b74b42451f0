use clap::Parser;
use log::info;
use headset_companion::cli::Args;
use headset_companion::error::{AppRunError, ConfigError};
use headset_companion::{init_logging, run};

#[tokio::main]
async fn main() -> Result<(), AppRunError> {
    let args = Args::parse();

    init_logging(args.verbose);
    info!(concat!("headset-companion ", env!("CARGO_PKG_VERSION")));

    match run(args).await {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            eprintln!("The config file is locked by another instance of this application; try again once it exits.");
            Ok(())
        },
        Err(err) => {
            eprintln!("Unexpected error: {}", err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
