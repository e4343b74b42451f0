use log::info;
use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::device::connection::{DeviceSession, SessionHandle};
use crate::device::constants::READ_BUFFER_SIZE;
use crate::device::engine::ProtocolEngine;
use crate::device::types::{Action, AncMode, AncState, DeviceBattery};
use crate::error::DeviceError;
use crate::sim::engine::SimulatedEngine;

// the simulated wire format: fixed size frames, tag byte first

pub const FRAME_SIZE: usize = 4;

// device -> host notifications
pub const NOTIFY_BATTERY_SINGLE: u8 = 0x01; // [tag, level, 0, 0]
pub const NOTIFY_BATTERY_DUAL: u8 = 0x02; // [tag, left, right, 0]
pub const NOTIFY_BATTERY_CASE: u8 = 0x03; // [tag, level, 0, 0]
pub const NOTIFY_ANC: u8 = 0x04; // [tag, mode, level, focus]

// host -> device commands
pub const COMMAND_INIT: u8 = 0xF0; // [tag, 0, 0, 0]
pub const COMMAND_SET_ANC: u8 = 0x14; // [tag, mode, level, focus]

fn anc_mode_byte(mode: AncMode) -> u8 {
    match mode {
        AncMode::Off => 0,
        AncMode::On => 1,
        AncMode::Ambient => 2,
        AncMode::Wind => 3,
    }
}

fn anc_mode_from_byte(byte: u8) -> AncMode {
    match byte {
        1 => AncMode::On,
        2 => AncMode::Ambient,
        3 => AncMode::Wind,
        _ => AncMode::Off,
    }
}

// the cycle the real devices step through on a mode button press
fn next_anc_mode(anc_state: Option<AncState>) -> AncMode {
    match anc_state.map(|anc| anc.mode) {
        None | Some(AncMode::Wind) => AncMode::Off,
        Some(AncMode::Off) => AncMode::Ambient,
        Some(AncMode::Ambient) => AncMode::On,
        Some(AncMode::On) => AncMode::Wind,
    }
}

// a scripted engine that speaks the simulated wire format: an init command
// on the first drain, state updates from notification frames, and a set-anc
// command on every mode change request
pub fn demo_engine() -> SimulatedEngine {
    let mut engine = SimulatedEngine::new();
    engine.queue_action(Action::Send(vec![COMMAND_INIT, 0, 0, 0]));

    engine.on_parse(|packet, projection| {
        let mut actions = Vec::new();

        for frame in packet.chunks_exact(FRAME_SIZE) {
            match frame[0] {
                NOTIFY_BATTERY_SINGLE => {
                    projection.device_battery = Some(DeviceBattery::Single { level: frame[1] });
                    actions.push(Action::RefreshUi);
                },
                NOTIFY_BATTERY_DUAL => {
                    projection.device_battery = Some(DeviceBattery::Dual { left: frame[1], right: frame[2] });
                    actions.push(Action::RefreshUi);
                },
                NOTIFY_BATTERY_CASE => {
                    projection.case_battery = Some(frame[1]);
                    actions.push(Action::RefreshUi);
                },
                NOTIFY_ANC => {
                    projection.anc_state = Some(AncState {
                        mode: anc_mode_from_byte(frame[1]),
                        level: if frame[2] == 0 { None } else { Some(frame[2]) },
                        focus_on_voice: frame[3] != 0,
                    });
                    actions.push(Action::RefreshUi);
                },
                _ => {
                    actions.push(Action::Unknown);
                },
            }
        }

        actions
    });

    engine.on_change_mode(|projection| {
        let next = next_anc_mode(projection.anc_state);
        vec![Action::Send(vec![COMMAND_SET_ANC, anc_mode_byte(next), 0, 0])]
    });

    engine
}

// plays the device side of the wire: reports batteries and the noise
// cancelling state on a schedule, confirms mode changes by echoing the new
// state, and hangs up once the script runs out
pub fn simulated_headset(cancel: CancellationToken, stream: DuplexStream) -> JoinHandle<()> {
    return spawn(async move {
        let (mut reader, mut writer) = split(stream);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        let script: [(u64, [u8; FRAME_SIZE]); 3] = [
            (300, [NOTIFY_BATTERY_DUAL, 64, 71, 0]),
            (300, [NOTIFY_BATTERY_CASE, 80, 0, 0]),
            (300, [NOTIFY_ANC, anc_mode_byte(AncMode::On), 0, 0]),
        ];

        for (delay, frame) in script {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return;
                },
                _ = sleep(Duration::from_millis(delay)) => {},
            }

            if writer.write_all(&frame).await.is_err() {
                return;
            }
        }

        // answer commands for a while, then hang up
        let listen_until = Instant::now() + Duration::from_millis(1500);
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                _ = sleep_until(listen_until) => {
                    break 'mainloop;
                },
                result = reader.read(&mut buffer) => match result {
                    Ok(0) | Err(_) => {
                        break 'mainloop;
                    },
                    Ok(count) => {
                        let chunk = buffer[..count].to_vec();
                        for frame in chunk.chunks_exact(FRAME_SIZE) {
                            if frame[0] == COMMAND_SET_ANC {
                                let reply = [NOTIFY_ANC, frame[1], frame[2], frame[3]];
                                if writer.write_all(&reply).await.is_err() {
                                    break 'mainloop;
                                }
                            }
                        }
                    },
                },
            }
        }
    });
}

pub fn describe_session<E: ProtocolEngine>(handle: &SessionHandle<E>) -> String {
    let battery = match handle.device_battery() {
        Some(battery) => battery.to_string(),
        None => String::from("?"),
    };

    let case = match handle.case_battery() {
        Some(level) => format!("{}%", level),
        None => String::from("?"),
    };

    let anc = match handle.anc_state() {
        Some(anc) => {
            let mut text = anc.mode.to_string();
            if let Some(level) = anc.level {
                text.push_str(&format!(" (level {})", level));
            }
            if anc.focus_on_voice {
                text.push_str(" (focus on voice)");
            }
            text
        },
        None => String::from("?"),
    };

    format!("battery {} | case {} | noise cancelling {}", battery, case, anc)
}

// drives a complete session against the simulated headset, including one
// mode change request partway through, and logs every state refresh
pub async fn run_simulation() -> Result<(), DeviceError> {
    info!("Starting a simulated headset session");

    let (host_stream, headset_stream) = duplex(READ_BUFFER_SIZE);
    let cancel = CancellationToken::new();
    let headset = simulated_headset(cancel.clone(), headset_stream);

    let session = DeviceSession::open(host_stream, demo_engine());

    let snapshot = session.handle();
    session.set_on_update(move || {
        info!("Device state: {}", describe_session(&snapshot));
    });

    // let the scripted reports come in first, then ask for the next noise
    // cancelling mode like a button press on the headset would
    sleep(Duration::from_millis(1100)).await;
    session.cycle_anc_mode();

    let result = session.wait_closed().await;

    cancel.cancel();
    headset.await.expect("Failed to join simulated headset task");

    info!("Simulated headset session finished");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anc(mode: AncMode) -> Option<AncState> {
        Some(AncState { mode, level: None, focus_on_voice: false })
    }

    #[test]
    fn mode_cycle_matches_the_device_order() {
        assert_eq!(next_anc_mode(None), AncMode::Off);
        assert_eq!(next_anc_mode(anc(AncMode::Off)), AncMode::Ambient);
        assert_eq!(next_anc_mode(anc(AncMode::Ambient)), AncMode::On);
        assert_eq!(next_anc_mode(anc(AncMode::On)), AncMode::Wind);
        assert_eq!(next_anc_mode(anc(AncMode::Wind)), AncMode::Off);
    }

    #[test]
    fn demo_engine_projects_notification_frames() {
        let mut engine = demo_engine();

        // the init command is queued ahead of anything else
        assert_eq!(engine.poll(), Action::Send(vec![COMMAND_INIT, 0, 0, 0]));

        engine.parse_packet(&[NOTIFY_BATTERY_DUAL, 64, 71, 0]);
        assert_eq!(engine.device_battery(), Some(DeviceBattery::Dual { left: 64, right: 71 }));
        assert_eq!(engine.poll(), Action::RefreshUi);

        engine.parse_packet(&[NOTIFY_ANC, 2, 14, 1]);
        let anc_state = engine.anc_state().expect("anc state should be known");
        assert_eq!(anc_state.mode, AncMode::Ambient);
        assert_eq!(anc_state.level, Some(14));
        assert!(anc_state.focus_on_voice);
        assert_eq!(engine.poll(), Action::RefreshUi);

        // two frames in one chunk are both applied
        engine.parse_packet(&[
            NOTIFY_BATTERY_SINGLE, 73, 0, 0,
            NOTIFY_BATTERY_CASE, 80, 0, 0,
        ]);
        assert_eq!(engine.device_battery(), Some(DeviceBattery::Single { level: 73 }));
        assert_eq!(engine.case_battery(), Some(80));
        assert_eq!(engine.poll(), Action::RefreshUi);
        assert_eq!(engine.poll(), Action::RefreshUi);
        assert_eq!(engine.poll(), Action::Wait(None));
    }

    #[test]
    fn demo_engine_requests_the_next_mode() {
        let mut engine = demo_engine();
        assert_eq!(engine.poll(), Action::Send(vec![COMMAND_INIT, 0, 0, 0]));

        engine.parse_packet(&[NOTIFY_ANC, anc_mode_byte(AncMode::On), 0, 0]);
        assert_eq!(engine.poll(), Action::RefreshUi);

        engine.change_anc_mode();
        assert_eq!(
            engine.poll(),
            Action::Send(vec![COMMAND_SET_ANC, anc_mode_byte(AncMode::Wind), 0, 0]),
        );
    }
}
