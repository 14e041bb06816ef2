use std::net::UdpSocket;
use std::sync::Mutex;

/// Where a successfully-processed message's analysis line is published.
/// The exact text `"<name>: <message> - I was analyzed!"` is load-bearing:
/// the operator dashboard searches the sink by analyzer-name prefix.
pub trait LogSink: Send + Sync {
    fn record(&self, analyzer_name: &str, message: &str);
}

/// Default sink: routes through the process's structured logger, same as
/// every other subsystem in this codebase.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, analyzer_name: &str, message: &str) {
        tracing::info!("{analyzer_name}: {message} - I was analyzed!");
    }
}

/// Models the original's Graylog transport as an external log collector:
/// a GELF/UDP datagram per message, best-effort. A send failure is logged
/// and otherwise ignored — the admission gate never fails a call because
/// the collector is unreachable.
pub struct GelfUdpSink {
    socket: Mutex<UdpSocket>,
    collector_addr: String,
}

impl GelfUdpSink {
    pub fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket: Mutex::new(socket),
            collector_addr: format!("{host}:{port}"),
        })
    }
}

impl LogSink for GelfUdpSink {
    fn record(&self, analyzer_name: &str, message: &str) {
        let line = format!("{analyzer_name}: {message} - I was analyzed!");
        let gelf = serde_json::json!({
            "version": "1.1",
            "host": analyzer_name,
            "short_message": line,
        });
        let payload = gelf.to_string();
        let socket = self.socket.lock().unwrap();
        if let Err(e) = socket.send_to(payload.as_bytes(), &self.collector_addr) {
            tracing::warn!(error = %e, "gelf sink: send failed, dropping datagram");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        lines: StdMutex<Vec<String>>,
    }

    impl LogSink for RecordingSink {
        fn record(&self, analyzer_name: &str, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{analyzer_name}: {message} - I was analyzed!"));
        }
    }

    #[test]
    fn preserves_exact_prefix_format() {
        let sink = RecordingSink {
            lines: StdMutex::new(Vec::new()),
        };
        sink.record("analyzer1", "hello world");
        assert_eq!(
            sink.lines.lock().unwrap()[0],
            "analyzer1: hello world - I was analyzed!"
        );
    }
}
