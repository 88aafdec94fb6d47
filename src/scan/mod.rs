//! Authoritative recounts.
//!
//! A recount walks every chunk of a territory in every paired dimension,
//! one batch per scheduler pass. Chunks are loaded on the tick thread and
//! counted either inline or on a small pool of counting threads. Nothing is
//! committed unless the whole walk finishes inside the timeout.

mod count;
mod job;
mod scheduler;

pub use job::ScanArea;
pub use scheduler::Scheduler;
pub(crate) use scheduler::Outcome;

pub use count::count_chunk;

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};

use crate::material::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Finished; `counts` are the new authoritative counts.
    Available,
    /// A recount for this territory was already queued or running.
    InProgress,
    /// Ran out of time. Nothing was committed.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub state: ScanState,
    pub counts: HashMap<Material, i32>,
}
impl ScanResult {
    fn empty(state: ScanState) -> Self {
        Self { state, counts: HashMap::new() }
    }
}

/// Answer to a recount request. If the recount is aborted the answer never
/// arrives and polling reports [`Poll::Abandoned`].
#[derive(Debug)]
pub struct Pending(Receiver<ScanResult>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Ready(ScanResult),
    Waiting,
    Abandoned,
}

impl Pending {
    pub(crate) fn in_progress() -> Self {
        Self::ready(ScanResult::empty(ScanState::InProgress))
    }
    fn ready(result: ScanResult) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(result);
        Self(rx)
    }
    pub fn poll(&self) -> Poll {
        match self.0.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(TryRecvError::Empty) => Poll::Waiting,
            Err(TryRecvError::Disconnected) => Poll::Abandoned,
        }
    }
    pub fn wait(&self, timeout: Duration) -> Poll {
        match self.0.recv_timeout(timeout) {
            Ok(result) => Poll::Ready(result),
            Err(RecvTimeoutError::Timeout) => Poll::Waiting,
            Err(RecvTimeoutError::Disconnected) => Poll::Abandoned,
        }
    }
}
