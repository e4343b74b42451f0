use uuid::Uuid;

/**
 * The UUID of the Bluetooth service under which supported headsets expose
 * their serial protocol channel. Pair the headset and bind this service to
 * a local serial port (rfcomm on linux) before connecting.
 */
pub const HEADSET_SERIAL_SERVICE: &str = "96cc203e-5068-46ad-b32d-e316f5e069ba";

/**
 * Baud rate to use when none is configured. The headset side of the serial
 * channel ignores the value, but the transport requires one.
 */
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/**
 * How many bytes to request from the transport per read. Protocol packets
 * are small; in practice a single read returns one device notification.
 */
pub const READ_BUFFER_SIZE: usize = 1024;

pub fn make_headset_serial_service_uuid() -> Uuid {
    Uuid::parse_str(HEADSET_SERIAL_SERVICE).unwrap()
}
