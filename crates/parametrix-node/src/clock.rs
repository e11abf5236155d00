//! Height source for ledger calls

use std::sync::atomic::{AtomicU64, Ordering};

use parametrix_common::Height;

/// Monotonic height counter; every applied ledger call consumes one height
#[derive(Debug, Default)]
pub struct HeightClock {
    next: AtomicU64,
}

impl HeightClock {
    /// Clock whose first tick returns `height`
    pub fn starting_at(height: Height) -> Self {
        Self {
            next: AtomicU64::new(height),
        }
    }

    /// Consume and return the next height
    pub fn tick(&self) -> Height {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Height the next tick will return
    pub fn peek(&self) -> Height {
        self.next.load(Ordering::SeqCst)
    }
}
