use serde::{Deserialize, Serialize};

use crate::device::constants::DEFAULT_BAUD_RATE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    // path of the serial port the headset's protocol channel is bound to,
    // for example /dev/rfcomm0 or COM5
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}
