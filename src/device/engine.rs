use crate::device::types::{Action, AncState, DeviceBattery};

/**
 * The protocol engine owns packet framing, command encoding and the device
 * state machine. The session driver never interprets protocol bytes itself:
 * it feeds inbound chunks to parse_packet() and executes whatever poll()
 * tells it to do next. Implementations are driven from the session's tasks
 * under a lock and therefore need no internal synchronization.
 */
pub trait ProtocolEngine: Send + 'static {
    // feed one inbound chunk; any reply the engine wants to send
    // surfaces later through poll()
    fn parse_packet(&mut self, packet: &[u8]);

    // produce the next instruction; called repeatedly until a Wait comes back
    fn poll(&mut self) -> Action;

    fn device_battery(&self) -> Option<DeviceBattery>;

    fn case_battery(&self) -> Option<u8>;

    fn anc_state(&self) -> Option<AncState>;

    // queue the command that moves the device to its next noise cancelling
    // mode; the projected state updates once the device confirms
    fn change_anc_mode(&mut self);
}
