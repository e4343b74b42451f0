use std::fmt;
use tokio::time::Duration;

// one instruction produced by the protocol engine per poll() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(Vec<u8>), // write these bytes to the transport, then poll again
    Wait(Option<Duration>), // stop draining until the timeout passes or a packet arrives; None = indefinitely
    RefreshUi, // the projected device state changed, notify the observer
    PollAgain, // no work was performed this call, poll again immediately
    Unknown, // the engine produced something this driver does not understand
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBattery {
    Single { level: u8 },
    Dual { left: u8, right: u8 },
}

impl DeviceBattery {
    // one entry for single-cell devices, left then right for dual
    pub fn levels(&self) -> Vec<u8> {
        match self {
            DeviceBattery::Single { level } => vec![*level],
            DeviceBattery::Dual { left, right } => vec![*left, *right],
        }
    }
}

impl fmt::Display for DeviceBattery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceBattery::Single { level } => write!(f, "{}%", level),
            DeviceBattery::Dual { left, right } => write!(f, "L {}% / R {}%", left, right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncMode {
    Off,
    On,
    Ambient,
    Wind,
}

impl fmt::Display for AncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AncMode::Off => "Off",
            AncMode::On => "On",
            AncMode::Ambient => "Ambient",
            AncMode::Wind => "Wind",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncState {
    pub mode: AncMode,
    pub level: Option<u8>, // ambient sound level, for modes and devices that support one
    pub focus_on_voice: bool,
}
