use crate::config::store::ConfigStore;
use crate::error::AnalyzerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Background-polled enable/disable switch consulted on every inbound call.
/// Defaults open (`active = true`) when the config store has no document for
/// this analyzer, or when a poll fails — an absent/erroring control plane
/// must not itself take an analyzer out of rotation.
pub struct AdmissionGate {
    active: AtomicBool,
}

impl AdmissionGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn set(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    #[cfg(test)]
    pub fn set_for_test(&self, active: bool) {
        self.set(active);
    }

    /// Owns the poll loop: reads `control.analyzers` for `name` every
    /// `poll_interval` until `shutdown` is notified.
    pub fn spawn_poll_loop(
        self: &Arc<Self>,
        store: ConfigStore,
        name: String,
        poll_interval: Duration,
        shutdown: Arc<Notify>,
    ) {
        let gate = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown.notified() => return,
                }

                match store.fetch_active(&name).await {
                    Ok(active) => gate.set(active),
                    Err(e) => {
                        let err = AnalyzerError::ConfigStore(e.to_string());
                        tracing::warn!(
                            analyzer = %name, error = %err,
                            "keeping previous admission state"
                        );
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_active() {
        let gate = AdmissionGate::new();
        assert!(gate.is_active());
    }

    #[test]
    fn set_toggles_state() {
        let gate = AdmissionGate::new();
        gate.set(false);
        assert!(!gate.is_active());
        gate.set(true);
        assert!(gate.is_active());
    }
}
