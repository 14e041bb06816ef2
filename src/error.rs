use std::fmt;

/// Errors surfaced by the distributor's dispatch path.
#[derive(Debug)]
pub enum DistributorError {
    NoAnalyzers,
    AllBlocked,
    MalformedRequest(String),
    Rpc(String),
    Config(String),
}

impl fmt::Display for DistributorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributorError::NoAnalyzers => write!(f, "no analyzers configured"),
            DistributorError::AllBlocked => {
                write!(f, "all analyzers blocked by circuit breakers")
            }
            DistributorError::MalformedRequest(msg) => write!(f, "malformed request: {msg}"),
            DistributorError::Rpc(msg) => write!(f, "analyzer rpc error: {msg}"),
            DistributorError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for DistributorError {}

/// Errors surfaced by the analyzer-side admission gate.
#[derive(Debug)]
pub enum AnalyzerError {
    Inactive(String),
    ConfigStore(String),
    Config(String),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::Inactive(name) => write!(f, "{name} inactive"),
            AnalyzerError::ConfigStore(msg) => write!(f, "config store error: {msg}"),
            AnalyzerError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for AnalyzerError {}
