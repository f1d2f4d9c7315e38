use std::sync::{Arc, RwLock};

use alloy::primitives::Address;

/// The connected account, if any. Scanning requires one; without it the
/// portfolio is empty rather than failed.
#[derive(Debug, Clone, Default)]
pub struct Session {
    address: Arc<RwLock<Option<Address>>>,
}

impl Session {
    pub fn new(address: Option<Address>) -> Self {
        Self {
            address: Arc::new(RwLock::new(address)),
        }
    }

    pub fn address(&self) -> Option<Address> {
        match self.address.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Returns true when the address actually changed.
    pub fn set_address(&self, address: Option<Address>) -> bool {
        let mut guard = match self.address.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard == address {
            return false;
        }
        *guard = address;
        true
    }
}
