use crate::config::AnalyzerTarget;
use crate::error::DistributorError;
use crate::proto::analyzer_client::AnalyzerClient;
use crate::proto::{Ack, LogPacket};
use std::collections::HashMap;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Seam between the dispatcher and the transport, so dispatch logic can be
/// exercised against an in-memory double instead of a real gRPC channel.
pub trait AnalyzerCaller {
    fn call(
        &self,
        name: &str,
        packet: LogPacket,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Ack, DistributorError>> + Send;
}

/// One lazily-connected gRPC channel/stub per configured analyzer, built
/// once at startup and never resized. `connect_lazy` defers the actual TCP
/// handshake to the first call, so a transiently-down analyzer at boot does
/// not block the distributor's startup.
pub struct AnalyzerPool {
    clients: HashMap<String, AnalyzerClient<Channel>>,
}

impl AnalyzerPool {
    pub fn connect_lazy(targets: &[AnalyzerTarget]) -> Result<Self, DistributorError> {
        let mut clients = HashMap::with_capacity(targets.len());
        for t in targets {
            let uri = format!("http://{}:{}", t.host, t.port);
            let endpoint = Endpoint::from_shared(uri)
                .map_err(|e| DistributorError::Config(format!("bad analyzer endpoint: {e}")))?;
            let channel = endpoint.connect_lazy();
            clients.insert(t.name.clone(), AnalyzerClient::new(channel));
        }
        Ok(Self { clients })
    }

    /// Names of every configured analyzer, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

}

impl AnalyzerCaller for AnalyzerPool {
    /// Dispatches `packet` to the named analyzer, bounded by `timeout`.
    /// Timeout, transport failure, and a non-OK status (including the
    /// admission gate's `UNAVAILABLE`) are all reported as `DistributorError::Rpc`
    /// — the dispatcher treats them identically for breaker purposes.
    async fn call(
        &self,
        name: &str,
        packet: LogPacket,
        timeout: Duration,
    ) -> Result<Ack, DistributorError> {
        let mut client = self
            .clients
            .get(name)
            .cloned()
            .expect("analyzer pool is fixed at startup");

        let mut request = tonic::Request::new(packet);
        request.set_timeout(timeout);

        match tokio::time::timeout(timeout, client.analyze(request)).await {
            Ok(Ok(resp)) => Ok(resp.into_inner()),
            Ok(Err(status)) => Err(DistributorError::Rpc(format!(
                "{}: {}",
                status.code(),
                status.message()
            ))),
            Err(_) => Err(DistributorError::Rpc("deadline exceeded".to_string())),
        }
    }
}
