use crate::breaker::BreakerRegistry;
use crate::error::DistributorError;
use crate::pool::AnalyzerCaller;
use crate::proto::LogPacket;
use crate::selector;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a successful dispatch, returned to the HTTP caller.
pub struct DispatchOutcome {
    pub accepted_by: String,
    pub count: usize,
}

/// Dispatches `packet` to one of `all_analyzers`, retrying across the
/// remaining candidates until one accepts or every candidate has either been
/// denied by its breaker or has failed the call.
///
/// `tried` never exceeds `all_analyzers` in size; a breaker denial does not
/// count as a failure and is not recorded against the breaker.
pub async fn dispatch(
    packet: LogPacket,
    all_analyzers: &[String],
    weights: &HashMap<String, f64>,
    breakers: &BreakerRegistry,
    pool: &impl AnalyzerCaller,
    analyzer_timeout: Duration,
) -> Result<DispatchOutcome, DistributorError> {
    if all_analyzers.is_empty() {
        return Err(DistributorError::NoAnalyzers);
    }

    let count = packet.messages.len();
    let mut tried: Vec<String> = Vec::with_capacity(all_analyzers.len());

    while tried.len() < all_analyzers.len() {
        let remaining: Vec<String> = all_analyzers
            .iter()
            .filter(|a| !tried.contains(a))
            .cloned()
            .collect();

        let target = selector::choose(&remaining, weights).to_string();
        tried.push(target.clone());

        if !breakers.allow(&target) {
            continue;
        }

        match pool.call(&target, packet.clone(), analyzer_timeout).await {
            Ok(_ack) => {
                breakers.record_success(&target);
                metrics::counter!("distributor_analyzer_success_total", "analyzer" => target.clone())
                    .increment(1);
                return Ok(DispatchOutcome {
                    accepted_by: target,
                    count,
                });
            }
            Err(err) => {
                breakers.record_failure(&target);
                metrics::counter!("distributor_analyzer_failure_total", "analyzer" => target.clone())
                    .increment(1);
                tracing::warn!(analyzer = %target, error = %err, "analyzer call failed");
                continue;
            }
        }
    }

    Err(DistributorError::AllBlocked)
}
