use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::error::BridgeError;

/// At most one bridge transaction per client at a time.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or fail with [`BridgeError::AlreadyInFlight`].
    /// The slot is released when the ticket drops.
    pub fn try_acquire(&self) -> Result<InFlightTicket, BridgeError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BridgeError::AlreadyInFlight)?;
        debug!("in-flight slot acquired");
        Ok(InFlightTicket {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InFlightTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        debug!("in-flight slot released");
    }
}
