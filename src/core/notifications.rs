// src/core/notifications.rs

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use crate::core::models::DeviceState;

/// Decides when a discovery deserves an operator notification: the state is
/// one the operator subscribed to and differs from the last one seen for
/// that address.
#[derive(Debug, Default)]
pub struct StateWatch {
    subscribed: HashSet<String>,
    previous: HashMap<Ipv4Addr, DeviceState>,
}

impl StateWatch {
    pub fn new<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut watch = Self::default();
        watch.subscribe(states);
        watch
    }

    /// Replaces the subscription set. Observed history is kept.
    pub fn subscribe<I, S>(&mut self, states: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subscribed = states
            .into_iter()
            .map(|s| s.as_ref().trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    /// Records `state` for `address` and reports whether to notify.
    pub fn observe(&mut self, address: Ipv4Addr, state: &DeviceState) -> bool {
        let changed = self.previous.get(&address) != Some(state);
        let wanted = self.subscribed.contains(&state.as_str().to_ascii_lowercase());
        self.previous.insert(address, state.clone());
        changed && wanted
    }

    pub fn forget(&mut self, address: &Ipv4Addr) {
        self.previous.remove(address);
    }
}
