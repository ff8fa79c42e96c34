// Per-run cancellation
use crate::ids::SlotId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable signal observed by whoever performs a run's work.
///
/// Tokens are `Send`, so a worker thread can check them before starting on
/// a request that may already have been superseded.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// The control side of a token. Dropping a source does not cancel.
#[derive(Debug)]
pub struct CancellationSource {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Returns true if this call did the cancelling.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one location-change run.
///
/// Every collaborator call receives the ticket of the run it serves and hands
/// it back with its completion. A completion is only applied when the slot
/// still exists, the generation is the slot's latest and the token was never
/// cancelled.
#[derive(Clone, Debug)]
pub struct Ticket {
    pub slot: SlotId,
    pub generation: u64,
    pub token: CancellationToken,
}

impl Ticket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
