use crate::analyzer::gate::AdmissionGate;
use crate::analyzer::sink::LogSink;
use crate::config::AnalyzerConfig;
use std::sync::Arc;

/// Shared analyzer state, cheaply cloneable. Constructed once at startup;
/// `gate` is the only piece mutated afterward, by its own poll loop.
#[derive(Clone)]
pub struct AnalyzerState {
    pub config: Arc<AnalyzerConfig>,
    pub gate: Arc<AdmissionGate>,
    pub sink: Arc<dyn LogSink>,
}

impl AnalyzerState {
    pub fn new(config: AnalyzerConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config: Arc::new(config),
            gate: AdmissionGate::new(),
            sink,
        }
    }
}
