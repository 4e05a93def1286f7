use std::sync::atomic::{AtomicBool, Ordering};

/// Per-port "new data ready" flags
///
/// Raised by whatever watches the reader interrupt lines and taken by the
/// adapter loop. A flag raised before the next poll is seen by that poll.
#[derive(Debug)]
pub struct PortSignals {
    flags: Vec<AtomicBool>,
}

impl PortSignals {
    /// Creates cleared flags for `ports` ports
    pub fn new(ports: usize) -> Self {
        PortSignals {
            flags: (0..ports).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Number of ports covered
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns whether no ports are covered
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Marks `port` as having new data; unknown ports are ignored
    pub fn raise(&self, port: usize) {
        if let Some(flag) = self.flags.get(port) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Reads and clears the flag of `port`
    pub fn take(&self, port: usize) -> bool {
        self.flags
            .get(port)
            .map(|flag| flag.swap(false, Ordering::AcqRel))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_raise_and_take() {
        let signals = PortSignals::new(2);
        assert!(!signals.take(0));

        signals.raise(1);
        assert!(!signals.take(0));
        assert!(signals.take(1));
        assert!(!signals.take(1));
    }

    #[test]
    fn test_unknown_port() {
        let signals = PortSignals::new(1);
        signals.raise(4);
        assert!(!signals.take(4));
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn test_raise_from_other_thread() {
        let signals = Arc::new(PortSignals::new(2));
        let producer = Arc::clone(&signals);
        std::thread::spawn(move || producer.raise(0)).join().unwrap();
        assert!(signals.take(0));
    }
}
