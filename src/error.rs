use std::io;
use thiserror::Error;
use std::str::Utf8Error;
use serde_json;
use tokio_serial;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to enumerate serial ports: {source}")]
    PortEnumeration { source: tokio_serial::Error },

    #[error("Failed to open serial port [{path}]: {source}")]
    TransportOpen { path: String, source: tokio_serial::Error },

    #[error("Failed to read from device transport: {source}")]
    TransportRead { source: io::Error },

    #[error("Failed to write to device transport: {source}")]
    TransportWrite { source: io::Error },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Error during device session: {source}")]
    DeviceError { #[from] source: DeviceError },
}
