use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::device::engine::ProtocolEngine;
use crate::device::types::{Action, AncState, DeviceBattery};

pub type ParseHook = Box<dyn FnMut(&[u8], &mut Projection) -> Vec<Action> + Send>;
pub type ModeChangeHook = Box<dyn FnMut(&mut Projection) -> Vec<Action> + Send>;

// the device state a scripted engine projects through the session accessors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projection {
    pub device_battery: Option<DeviceBattery>,
    pub case_battery: Option<u8>,
    pub anc_state: Option<AncState>,
}

/**
 * Counters and a traffic log that remain observable after the engine itself
 * has been handed over to a session.
 */
#[derive(Clone, Default)]
pub struct EngineProbe {
    polls: Arc<AtomicUsize>,
    mode_changes: Arc<AtomicUsize>,
    parsed: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl EngineProbe {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn mode_changes(&self) -> usize {
        self.mode_changes.load(Ordering::SeqCst)
    }

    pub fn parsed_chunks(&self) -> Vec<Vec<u8>> {
        self.parsed.lock().expect("Failed to lock parsed chunk log").clone()
    }
}

/**
 * A protocol engine with scripted behavior instead of a real device protocol.
 * Actions queued ahead of time (or from the hooks) are handed out one per
 * poll() call; an empty queue polls as an indefinite wait. Backs --simulate
 * and the test suite.
 */
pub struct SimulatedEngine {
    projection: Projection,
    pending: VecDeque<Action>,
    on_parse: Option<ParseHook>,
    on_change_mode: Option<ModeChangeHook>,
    probe: EngineProbe,
}

impl SimulatedEngine {
    pub fn new() -> SimulatedEngine {
        SimulatedEngine {
            projection: Projection::default(),
            pending: VecDeque::new(),
            on_parse: None,
            on_change_mode: None,
            probe: EngineProbe::default(),
        }
    }

    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    pub fn queue_action(&mut self, action: Action) {
        self.pending.push_back(action);
    }

    pub fn queue_actions<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = Action>,
    {
        self.pending.extend(actions);
    }

    pub fn set_device_battery(&mut self, battery: Option<DeviceBattery>) {
        self.projection.device_battery = battery;
    }

    pub fn set_case_battery(&mut self, level: Option<u8>) {
        self.projection.case_battery = level;
    }

    pub fn set_anc_state(&mut self, anc_state: Option<AncState>) {
        self.projection.anc_state = anc_state;
    }

    // called for every inbound chunk; returned actions are queued after any
    // actions already pending
    pub fn on_parse<F>(&mut self, hook: F)
    where
        F: FnMut(&[u8], &mut Projection) -> Vec<Action> + Send + 'static,
    {
        self.on_parse = Some(Box::new(hook));
    }

    pub fn on_change_mode<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Projection) -> Vec<Action> + Send + 'static,
    {
        self.on_change_mode = Some(Box::new(hook));
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        SimulatedEngine::new()
    }
}

impl ProtocolEngine for SimulatedEngine {
    fn parse_packet(&mut self, packet: &[u8]) {
        self.probe.parsed.lock().expect("Failed to lock parsed chunk log").push(packet.to_vec());

        if let Some(hook) = &mut self.on_parse {
            let actions = hook(packet, &mut self.projection);
            self.pending.extend(actions);
        }
    }

    fn poll(&mut self) -> Action {
        self.probe.polls.fetch_add(1, Ordering::SeqCst);
        self.pending.pop_front().unwrap_or(Action::Wait(None))
    }

    fn device_battery(&self) -> Option<DeviceBattery> {
        self.projection.device_battery
    }

    fn case_battery(&self) -> Option<u8> {
        self.projection.case_battery
    }

    fn anc_state(&self) -> Option<AncState> {
        self.projection.anc_state
    }

    fn change_anc_mode(&mut self) {
        self.probe.mode_changes.fetch_add(1, Ordering::SeqCst);

        if let Some(hook) = &mut self.on_change_mode {
            let actions = hook(&mut self.projection);
            self.pending.extend(actions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_empty_engine_polls_as_an_indefinite_wait() {
        let mut engine = SimulatedEngine::new();
        assert_eq!(engine.poll(), Action::Wait(None));
        assert_eq!(engine.poll(), Action::Wait(None));
        assert_eq!(engine.probe().polls(), 2);
    }

    #[test]
    fn queued_actions_come_back_in_order() {
        let mut engine = SimulatedEngine::new();
        engine.queue_actions([
            Action::Send(vec![1, 2]),
            Action::RefreshUi,
        ]);

        assert_eq!(engine.poll(), Action::Send(vec![1, 2]));
        assert_eq!(engine.poll(), Action::RefreshUi);
        assert_eq!(engine.poll(), Action::Wait(None));
    }

    #[test]
    fn parse_hook_updates_the_projection_and_queues_actions() {
        let mut engine = SimulatedEngine::new();
        engine.on_parse(|packet, projection| {
            projection.case_battery = Some(packet[0]);
            vec![Action::RefreshUi]
        });

        engine.parse_packet(&[42]);
        assert_eq!(engine.case_battery(), Some(42));
        assert_eq!(engine.poll(), Action::RefreshUi);
        assert_eq!(engine.probe().parsed_chunks(), vec![vec![42]]);
    }

    #[test]
    fn mode_change_hook_queues_the_command() {
        let mut engine = SimulatedEngine::new();
        engine.on_change_mode(|_projection| vec![Action::Send(vec![0x14])]);

        engine.change_anc_mode();
        assert_eq!(engine.probe().mode_changes(), 1);
        assert_eq!(engine.poll(), Action::Send(vec![0x14]));
    }
}
