use std::collections::HashMap;
use std::sync::Mutex;

use barter_core::{BarterError, TradeKey};

/// Monotonic per-trade port allocator.
///
/// Ports are assigned first-come within `[base, base + range)` and stick to
/// their key for the process lifetime; repeated allocation for the same key
/// returns the original port.
#[derive(Debug)]
pub struct PortAllocator {
    base: u16,
    range: u16,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    assigned: HashMap<TradeKey, u16>,
    next_offset: u16,
}

impl PortAllocator {
    pub fn new(base: u16, range: u16) -> Self {
        Self {
            base,
            range,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The port for `key`, assigning the next free one on first sight.
    pub fn allocate(&self, key: &TradeKey) -> Result<u16, BarterError> {
        let mut inner = self.inner.lock().expect("allocator mutex poisoned");
        if let Some(port) = inner.assigned.get(key) {
            return Ok(*port);
        }
        if inner.next_offset >= self.range {
            return Err(BarterError::InvalidConfig {
                key: "L2_PORT_RANGE",
                reason: format!("all {} daemon ports are assigned", self.range),
            });
        }
        let port = self.base + inner.next_offset;
        inner.next_offset += 1;
        inner.assigned.insert(key.clone(), port);
        Ok(port)
    }

    /// The port previously assigned to `key`, if any.
    pub fn get(&self, key: &TradeKey) -> Option<u16> {
        self.inner
            .lock()
            .expect("allocator mutex poisoned")
            .assigned
            .get(key)
            .copied()
    }
}
