//! Batch, budget-bounded delivery of collected records to the remote
//! aggregation server.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::record::UsageRecord;

pub const BATCH_SIZE: usize = 200;
pub const WALL_CLOCK_BUDGET: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct SubmitRequest<'a> {
    username: &'a str,
    usage: &'a [UsageRecord],
}

/// Outcome of one scheduler invocation: how many records were sent, in
/// order, and the contiguous tail that was not.
pub struct DeliveryOutcome {
    pub sent_count: usize,
    pub unsent_tail: Vec<UsageRecord>,
}

/// Send `records` to `server_url` in fixed-size batches, strictly in order,
/// stopping at the first failure or once the wall-clock budget is spent.
/// Never retries a batch.
///
/// A batch is only started if it could plausibly finish inside the budget:
/// the pre-batch check reserves `REQUEST_TIMEOUT` as margin, since a request
/// can legitimately run that long before timing out. Without this margin, a
/// batch could start just under the budget and still run well past it.
pub async fn deliver(
    client: &reqwest::Client,
    server_url: &str,
    username: &str,
    records: Vec<UsageRecord>,
) -> DeliveryOutcome {
    let start = Instant::now();
    let endpoint = format!("{}/api/usage/submit", server_url.trim_end_matches('/'));

    let mut sent_count = 0;
    let mut batches = records.chunks(BATCH_SIZE);

    while let Some(batch) = batches.next() {
        if start.elapsed() + REQUEST_TIMEOUT > WALL_CLOCK_BUDGET {
            debug!(sent_count, "wall-clock budget exhausted, stopping delivery");
            break;
        }

        match send_batch(client, &endpoint, username, batch).await {
            Ok(()) => {
                sent_count += batch.len();
            }
            Err(err) => {
                warn!(error = %err, "batch delivery failed, stopping and buffering the remainder");
                let unsent_tail = records[sent_count..].to_vec();
                return DeliveryOutcome { sent_count, unsent_tail };
            }
        }
    }

    let unsent_tail = records[sent_count..].to_vec();
    DeliveryOutcome { sent_count, unsent_tail }
}

async fn send_batch(
    client: &reqwest::Client,
    endpoint: &str,
    username: &str,
    batch: &[UsageRecord],
) -> Result<(), AgentError> {
    let body = SubmitRequest { username, usage: batch };
    let response = client
        .post(endpoint)
        .timeout(REQUEST_TIMEOUT)
        .json(&body)
        .send()
        .await?;

    if response.status() == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(AgentError::ServerStatus { status: response.status() })
    }
}

pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("reqwest client with static config cannot fail to build")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn sample_record() -> UsageRecord {
        crate::record::parse_line(
            r#"{"timestamp":"2026-07-28T00:00:00.000Z","message":{"usage":{"input_tokens":1,"output_tokens":1}}}"#,
        )
        .unwrap()
    }

    /// Minimal HTTP/1.1 stub server: reads one request, discards the body,
    /// and always answers with a fixed status line. Good enough to exercise
    /// the scheduler's success/failure branching without a mocking crate.
    fn spawn_stub(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(status_line.as_bytes());
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_delivery_sends_everything_and_leaves_no_tail() {
        let url = spawn_stub("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n");
        let client = build_client();
        let outcome = deliver(&client, &url, "alice", vec![sample_record(), sample_record()]).await;
        assert_eq!(outcome.sent_count, 2);
        assert!(outcome.unsent_tail.is_empty());
    }

    #[tokio::test]
    async fn server_failure_stops_immediately_and_buffers_everything() {
        let url = spawn_stub("HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n");
        let client = build_client();
        let records = vec![sample_record(), sample_record()];
        let outcome = deliver(&client, &url, "alice", records.clone()).await;
        assert_eq!(outcome.sent_count, 0);
        assert_eq!(outcome.unsent_tail.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_server_buffers_everything() {
        // Port 0 never accepts connections; connection should fail fast.
        let client = build_client();
        let records = vec![sample_record()];
        let outcome = deliver(&client, "http://127.0.0.1:1", "alice", records.clone()).await;
        assert_eq!(outcome.sent_count, 0);
        assert_eq!(outcome.unsent_tail.len(), 1);
    }

    #[test]
    fn batches_never_exceed_the_fixed_batch_size() {
        let records: Vec<_> = (0..450).map(|_| sample_record()).collect();
        let batch_count = records.chunks(BATCH_SIZE).count();
        assert_eq!(batch_count, 3);
        assert!(records.chunks(BATCH_SIZE).all(|b| b.len() <= BATCH_SIZE));
    }

}
