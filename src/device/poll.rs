use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

/**
 * A single poll interval requested by the protocol engine: an optional
 * deadline paired with an abort signal. Clones share the signal, so any
 * holder may cut the interval short while another is waiting on it.
 */
#[derive(Debug, Clone)]
pub struct PollTimeout {
    deadline: Option<Instant>,
    abort: CancellationToken,
}

impl PollTimeout {
    // a timeout of None never expires on its own and only ends via abort();
    // a deadline too large to represent is treated the same way
    pub fn new(timeout: Option<Duration>) -> PollTimeout {
        PollTimeout {
            deadline: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
            abort: CancellationToken::new(),
        }
    }

    // an already expired interval, used to trigger the first engine drain
    pub fn immediate() -> PollTimeout {
        PollTimeout::new(Some(Duration::ZERO))
    }

    // resolves once the deadline has passed or abort() has been called,
    // whichever comes first
    pub async fn completion(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(deadline) => {},
                    _ = self.abort.cancelled() => {},
                }
            },
            None => self.abort.cancelled().await,
        }
    }

    // ends the interval now; calling this multiple times, or after the
    // deadline has already passed, has no further effect
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }
}
