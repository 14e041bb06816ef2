pub mod analyzer;
pub mod breaker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod selector;
pub mod server;

pub mod proto {
    tonic::include_proto!("logs");
}
