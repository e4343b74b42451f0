use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, error, info, warn};
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::constants::READ_BUFFER_SIZE;
use crate::device::engine::ProtocolEngine;
use crate::device::poll::PollTimeout;
use crate::device::types::{Action, AncState, DeviceBattery};
use crate::error::DeviceError;

type UpdateListener = Arc<dyn Fn() + Send + Sync>;

// the engine and the wait it requested live under a single lock: the read
// task parses and aborts in one critical section, the dispatch task polls
// and installs the replacement wait in another. neither section contains
// an await, so the lock is only ever held briefly.
struct SessionState<E> {
    engine: E,
    poll: PollTimeout,
}

struct SessionShared<E> {
    state: Mutex<SessionState<E>>,
    // cancelled exactly once, by whichever comes first: end of stream,
    // a fatal transport error, or close()
    closed: CancellationToken,
    on_update: Mutex<Option<UpdateListener>>,
}

impl<E: ProtocolEngine> SessionShared<E> {
    fn lock_state(&self) -> MutexGuard<'_, SessionState<E>> {
        self.state.lock().expect("Failed to lock session state")
    }

    fn notify_update(&self) {
        // invoke the listener without holding the listener lock, so that a
        // listener may itself call set_on_update() or session accessors
        let listener = self.on_update.lock().expect("Failed to lock update listener").clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

/**
 * A cheap clonable view on a running session. Handles stay valid after the
 * session closes; the accessors simply keep reporting the engine's last
 * known state.
 */
pub struct SessionHandle<E> {
    shared: Arc<SessionShared<E>>,
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> SessionHandle<E> {
        SessionHandle { shared: Arc::clone(&self.shared) }
    }
}

impl<E: ProtocolEngine> SessionHandle<E> {
    pub fn device_battery(&self) -> Option<DeviceBattery> {
        self.shared.lock_state().engine.device_battery()
    }

    pub fn case_battery(&self) -> Option<u8> {
        self.shared.lock_state().engine.case_battery()
    }

    pub fn anc_state(&self) -> Option<AncState> {
        self.shared.lock_state().engine.anc_state()
    }

    // asks the engine for its next noise cancelling mode and cuts the
    // current wait short so the command goes out promptly instead of
    // after the pending timeout
    pub fn cycle_anc_mode(&self) {
        debug!("Requesting next noise cancelling mode");
        let mut state = self.shared.lock_state();
        state.engine.change_anc_mode();
        state.poll.abort();
    }

    // replaces the previous listener, which is dropped silently. only
    // state refreshes after this call reach the new listener.
    pub fn set_on_update<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut on_update = self.shared.on_update.lock().expect("Failed to lock update listener");
        *on_update = Some(Arc::new(listener));
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    pub fn close(&self) {
        self.shared.closed.cancel();
    }
}

/**
 * One session over an open transport: a read task that feeds inbound bytes
 * to the protocol engine, and a dispatch task that executes the actions the
 * engine produces. The session runs until the transport ends, a transport
 * operation fails, or close() is called.
 */
pub struct DeviceSession<E: ProtocolEngine> {
    handle: SessionHandle<E>,
    read_task: JoinHandle<Result<(), DeviceError>>,
    dispatch_task: JoinHandle<Result<(), DeviceError>>,
}

impl<E: ProtocolEngine> DeviceSession<E> {
    // takes ownership of the transport and starts both tasks. the first
    // wait is already expired so that the dispatch task drains the engine
    // once before any bytes have arrived. must be called within a tokio
    // runtime.
    pub fn open<S>(stream: S, engine: E) -> DeviceSession<E>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = split(stream);

        let shared = Arc::new(SessionShared {
            state: Mutex::new(SessionState {
                engine,
                poll: PollTimeout::immediate(),
            }),
            closed: CancellationToken::new(),
            on_update: Mutex::new(None),
        });

        info!("Device session opened");

        DeviceSession {
            read_task: read_task(Arc::clone(&shared), read_half),
            dispatch_task: dispatch_task(Arc::clone(&shared), write_half),
            handle: SessionHandle { shared },
        }
    }

    pub fn handle(&self) -> SessionHandle<E> {
        self.handle.clone()
    }

    pub fn device_battery(&self) -> Option<DeviceBattery> {
        self.handle.device_battery()
    }

    pub fn case_battery(&self) -> Option<u8> {
        self.handle.case_battery()
    }

    pub fn anc_state(&self) -> Option<AncState> {
        self.handle.anc_state()
    }

    pub fn cycle_anc_mode(&self) {
        self.handle.cycle_anc_mode()
    }

    pub fn set_on_update<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handle.set_on_update(listener)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn close(&self) {
        self.handle.close()
    }

    // waits for both tasks to finish and reports the first fatal transport
    // error, if any. a session that ended through end of stream or close()
    // resolves with Ok.
    pub async fn wait_closed(self) -> Result<(), DeviceError> {
        let read_result = self.read_task.await.expect("Failed to join read task");
        let dispatch_result = self.dispatch_task.await.expect("Failed to join dispatch task");
        read_result.and(dispatch_result)
    }
}

// consumes inbound chunks. each chunk is parsed and the pending wait is
// aborted within one critical section, so the dispatch task always polls
// the engine in its post-parse state.
fn read_task<E, R>(shared: Arc<SessionShared<E>>, mut reader: R) -> JoinHandle<Result<(), DeviceError>>
where
    E: ProtocolEngine,
    R: AsyncRead + Unpin + Send + 'static,
{
    return spawn(async move {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        'mainloop: loop {
            // biased: once the session is closed, for example by a fatal
            // write error, no further chunk may reach the engine
            tokio::select! {
                biased;
                _ = shared.closed.cancelled() => {
                    break 'mainloop;
                },
                result = reader.read(&mut buffer) => match result {
                    Ok(0) => {
                        // end of stream is a normal termination: the dispatch
                        // task observes the closed signal, the pending wait is
                        // left alone
                        info!("Device transport reached end of stream");
                        shared.closed.cancel();
                        break 'mainloop;
                    },
                    Ok(count) => {
                        debug!("New packet ({} bytes)", count);
                        let mut state = shared.lock_state();
                        state.engine.parse_packet(&buffer[..count]);
                        state.poll.abort();
                    },
                    Err(source) => {
                        error!("Failed to read from device transport: {}", source);
                        shared.closed.cancel();
                        return Err(DeviceError::TransportRead { source });
                    },
                },
            }
        }

        Ok(())
    });
}

// executes the engine's instructions: after every wake-up it drains the
// engine until a Wait comes back, then parks on that wait. only this task
// ever replaces the wait in the shared state.
fn dispatch_task<E, W>(shared: Arc<SessionShared<E>>, mut writer: W) -> JoinHandle<Result<(), DeviceError>>
where
    E: ProtocolEngine,
    W: AsyncWrite + Unpin + Send + 'static,
{
    return spawn(async move {
        'mainloop: loop {
            if shared.closed.is_cancelled() {
                break 'mainloop;
            }

            let wait = shared.lock_state().poll.clone();
            tokio::select! {
                // a wake-up caused by closure re-checks the flag at the top
                // of the loop instead of starting another drain
                _ = shared.closed.cancelled() => {
                    continue 'mainloop;
                },
                _ = wait.completion() => {},
            }

            loop {
                // the poll and the install of the replacement wait sit under
                // one guard. a chunk parsed in between would otherwise abort
                // a wait that is about to be thrown away, and the wake-up
                // would be lost.
                let action = {
                    let mut state = shared.lock_state();
                    let action = state.engine.poll();
                    if let Action::Wait(timeout) = &action {
                        state.poll = PollTimeout::new(*timeout);
                    }
                    action
                };

                match action {
                    Action::Send(payload) => {
                        debug!("Sending packet ({} bytes)", payload.len());
                        if let Err(source) = writer.write_all(&payload).await {
                            error!("Failed to write to device transport: {}", source);
                            shared.closed.cancel();
                            return Err(DeviceError::TransportWrite { source });
                        }
                    },
                    Action::Wait(_) => {
                        continue 'mainloop;
                    },
                    Action::RefreshUi => {
                        shared.notify_update();
                    },
                    Action::PollAgain => {},
                    Action::Unknown => {
                        warn!("Ignoring unknown action from protocol engine");
                    },
                }
            }
        }

        Ok(())
    });
}
