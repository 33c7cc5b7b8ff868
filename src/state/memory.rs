use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::DeviceState;
use crate::device::Device;

/// Name to state map behind a read/write lock.
///
/// Foreground calls and listener threads may access it concurrently; the
/// last writer wins.
#[derive(Debug, Default)]
pub struct MemoryState {
    states: RwLock<HashMap<String, bool>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, device_name: &str) -> bool {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(device_name)
    }

    /// Snapshot of all known entries
    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeviceState for MemoryState {
    fn init_device(&self, device: &Device) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.device_name().to_string(), false);
    }

    fn lookup(&self, device_name: &str) -> bool {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_name)
            .copied()
            .unwrap_or(false)
    }

    fn switch(&self, device_name: &str, on: bool) {
        debug!("Switching {} to {}", device_name, on);
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device_name.to_string(), on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CodeDevice;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unknown_devices_are_off() {
        let state = MemoryState::new();
        assert!(!state.lookup("device1"));
    }

    #[test]
    fn switch_overwrites() {
        let state = MemoryState::new();
        state.switch("device2", true);

        assert!(!state.lookup("device1"));
        assert!(state.lookup("device2"));

        state.switch("device2", false);
        assert!(!state.lookup("device2"));
    }

    #[test]
    fn init_device_seeds_off() {
        let state = MemoryState::new();
        state.init_device(&CodeDevice::new("device1", 1, 2).into());

        assert_eq!(state.snapshot().get("device1"), Some(&false));
    }

    #[test]
    fn contains_only_seeded_or_switched_devices() {
        let state = MemoryState::new();
        state.init_device(&CodeDevice::new("device1", 1, 2).into());

        assert!(state.contains("device1"));
        assert!(!state.contains("device2"));
    }

    #[test]
    fn concurrent_writers_do_not_corrupt_the_map() {
        let state = Arc::new(MemoryState::new());

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let state = state.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        state.switch(&format!("device{}", worker), i % 2 == 0);
                        state.lookup("device0");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot.len(), 4);
        // last iteration (i = 99) wrote off
        assert!(snapshot.values().all(|on| !on));
    }
}
