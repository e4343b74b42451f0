use log::info;
use tokio_serial::{SerialPortBuilderExt, SerialPortInfo, SerialPortType, SerialStream};

use crate::error::DeviceError;

// opens the serial port the headset's protocol channel is bound to. the
// returned stream is ready to be handed to DeviceSession::open().
pub fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream, DeviceError> {
    info!("Opening serial port [{}] at {} baud...", path, baud_rate);

    tokio_serial::new(path, baud_rate)
        .open_native_async()
        .map_err(|source| DeviceError::TransportOpen {
            path: path.to_string(),
            source,
        })
}

pub fn list_ports() -> Result<Vec<SerialPortInfo>, DeviceError> {
    tokio_serial::available_ports()
        .map_err(|source| DeviceError::PortEnumeration { source })
}

pub fn describe_port(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("unknown product");
            format!("USB {:04x}:{:04x} {}", usb.vid, usb.pid, product)
        },
        SerialPortType::BluetoothPort => String::from("Bluetooth"),
        SerialPortType::PciPort => String::from("PCI"),
        SerialPortType::Unknown => String::from("Unknown"),
    }
}
