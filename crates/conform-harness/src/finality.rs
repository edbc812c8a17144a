//! Bounded waits for the node to reach a state
//!
//! Instead of sleeping a fixed time before checking post-transaction state,
//! poll with exponential backoff until the state appears or the policy's
//! timeout runs out.

use conform_primitives::H256;
use conform_sdk::types::RpcReceipt;
use conform_sdk::{RpcClient, SdkError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::StepError;

/// How long and how often to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Give up after this long
    pub timeout: Duration,
    /// First delay between polls
    pub initial_interval: Duration,
    /// Delay never grows beyond this
    pub max_interval: Duration,
    /// Growth factor per poll
    pub multiplier: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(6),
            multiplier: 2,
        }
    }
}

impl PollPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt.min(16));
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// Poll `check` until it yields a value or the policy times out
pub async fn poll_until<T, F, Fut>(
    what: &str,
    policy: &PollPolicy,
    mut check: F,
) -> Result<T, StepError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, SdkError>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut interval = policy.initial_interval;
    let mut polls = 0u32;

    loop {
        polls += 1;
        if let Some(value) = check().await? {
            tracing::debug!(what, polls, elapsed = ?start.elapsed(), "awaited state reached");
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(what, polls, "gave up waiting");
            return Err(StepError::FinalityTimeout {
                what: what.to_string(),
                waited: now - start,
            });
        }

        tracing::trace!(what, ?interval, "not yet, polling again");
        sleep(interval.min(deadline - now)).await;
        interval = policy.next_interval(interval);
    }
}

/// Wait until the node returns a receipt for `hash`
pub async fn await_receipt(
    client: &RpcClient,
    hash: &H256,
    policy: &PollPolicy,
) -> Result<RpcReceipt, StepError> {
    let what = format!("receipt for {}", hash);
    poll_until(&what, policy, move || client.get_transaction_receipt(hash)).await
}

/// Wait until the chain head is at least `min_number`; returns the head
pub async fn await_block(
    client: &RpcClient,
    min_number: u64,
    policy: &PollPolicy,
) -> Result<u64, StepError> {
    let what = format!("block {}", min_number);
    poll_until(&what, policy, move || async move {
        let head = client.block_number().await?;
        Ok::<_, SdkError>((head >= min_number).then_some(head))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_sdk::{Bloom, MockTransport};
    use serde_json::{json, Value};

    fn receipt_json(hash: &H256) -> Value {
        json!({
            "transactionHash": hash.to_hex(),
            "gasUsed": "0x5208",
            "logs": [],
            "logsBloom": Bloom::EMPTY.to_hex(),
            "status": "0x1"
        })
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_secs(5),
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            multiplier: 2,
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(6));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_receipt_after_a_few_polls() {
        let mock = MockTransport::empty();
        let hash = H256::from_bytes([9; 32]);
        mock.push_response("eth_getTransactionReceipt", Value::Null);
        mock.push_response("eth_getTransactionReceipt", Value::Null);
        mock.set_response("eth_getTransactionReceipt", receipt_json(&hash));
        let client = RpcClient::new(mock.clone());

        let receipt = await_receipt(&client, &hash, &fast()).await.unwrap();
        assert_eq!(receipt.transaction_hash, hash);
        assert_eq!(mock.call_count("eth_getTransactionReceipt"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_receipt_times_out() {
        let mock = MockTransport::empty();
        mock.set_response("eth_getTransactionReceipt", Value::Null);
        let client = RpcClient::new(mock);

        let started = Instant::now();
        let err = await_receipt(&client, &H256::ZERO, &fast()).await.unwrap_err();
        match err {
            StepError::FinalityTimeout { what, waited } => {
                assert!(what.starts_with("receipt for"));
                assert!(waited >= Duration::from_secs(5));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_retried() {
        let mock = MockTransport::empty();
        mock.push_transport_error("eth_getTransactionReceipt", "connection reset");
        let client = RpcClient::new(mock.clone());

        let err = await_receipt(&client, &H256::ZERO, &fast()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(mock.call_count("eth_getTransactionReceipt"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_block() {
        let mock = MockTransport::empty();
        mock.push_response("eth_blockNumber", json!("0x1"));
        mock.set_response("eth_blockNumber", json!("0x3"));
        let client = RpcClient::new(mock);

        assert_eq!(await_block(&client, 2, &fast()).await.unwrap(), 3);
    }
}
