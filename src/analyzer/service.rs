use crate::analyzer::AnalyzerState;
use crate::error::AnalyzerError;
use crate::proto::analyzer_server::Analyzer;
use crate::proto::{Ack, LogPacket};
use tonic::{Request, Response, Status};

/// The `Analyze` RPC: an admission check followed by trivial per-message
/// logging to the configured sink. Message order within a packet is not
/// significant — they are logged in arrival order but nothing downstream
/// depends on that.
pub struct AnalyzerService {
    state: AnalyzerState,
}

impl AnalyzerService {
    pub fn new(state: AnalyzerState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl Analyzer for AnalyzerService {
    async fn analyze(&self, request: Request<LogPacket>) -> Result<Response<Ack>, Status> {
        if !self.state.gate.is_active() {
            metrics::counter!("analyzer_admission_rejected_total").increment(1);
            let err = AnalyzerError::Inactive(self.state.config.name.clone());
            return Err(Status::unavailable(err.to_string()));
        }

        let packet = request.into_inner();
        for msg in &packet.messages {
            self.state.sink.record(&self.state.config.name, &msg.message);
        }
        metrics::counter!("analyzer_messages_total").increment(packet.messages.len() as u64);

        Ok(Response::new(Ack {
            accepted: true,
            note: format!("{} accepted {} msgs", self.state.config.name, packet.messages.len()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::sink::LogSink;
    use crate::config::AnalyzerConfig;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingSink {
        lines: Mutex<Vec<(String, String)>>,
    }

    impl LogSink for RecordingSink {
        fn record(&self, analyzer_name: &str, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((analyzer_name.to_string(), message.to_string()));
        }
    }

    fn config(name: &str) -> AnalyzerConfig {
        AnalyzerConfig {
            name: name.to_string(),
            mongo_uri: "mongodb://localhost:27017/".to_string(),
            poll_interval: Duration::from_secs(2),
            graylog_host: None,
            graylog_port: 12201,
        }
    }

    fn packet(messages: &[&str]) -> LogPacket {
        LogPacket {
            source_id: "test".to_string(),
            messages: messages
                .iter()
                .map(|m| crate::proto::LogMessage {
                    timestamp: String::new(),
                    level: "INFO".to_string(),
                    message: m.to_string(),
                    attrs: Default::default(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn accepts_when_active_and_logs_each_message() {
        let sink = std::sync::Arc::new(RecordingSink {
            lines: Mutex::new(Vec::new()),
        });
        let state = AnalyzerState::new(config("analyzer1"), sink.clone());
        let svc = AnalyzerService::new(state);

        let resp = svc
            .analyze(Request::new(packet(&["hello", "world"])))
            .await
            .unwrap()
            .into_inner();

        assert!(resp.accepted);
        assert_eq!(resp.note, "analyzer1 accepted 2 msgs");
        assert_eq!(sink.lines.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_with_unavailable_when_inactive() {
        let sink = std::sync::Arc::new(RecordingSink {
            lines: Mutex::new(Vec::new()),
        });
        let state = AnalyzerState::new(config("analyzer1"), sink.clone());
        state.gate.set_for_test(false);
        let svc = AnalyzerService::new(state);

        let err = svc.analyze(Request::new(packet(&["hi"]))).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unavailable);
        assert!(err.message().contains("analyzer1"));
        assert!(sink.lines.lock().unwrap().is_empty());
    }
}
