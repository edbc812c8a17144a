//! RpcClient - typed JSON-RPC client

use bytes::Bytes;
use conform_primitives::{quantity, Address, H256, U256};
use serde_json::Value;
use std::sync::Arc;

use crate::transport::{deserialize_response, Transport};
use crate::types::{BlockId, CallRequest, RpcBlock, RpcReceipt};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Typed client over a [`Transport`]
///
/// Every operation issues exactly one request and never retries. Clones share
/// the transport, so one client serves any number of concurrent scenarios.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
}

impl RpcClient {
    /// Create a client with a custom transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Create a client over an already shared transport
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client talking JSON-RPC over HTTP
    #[cfg(feature = "http")]
    pub fn http(url: &str, timeout: std::time::Duration) -> Result<Self, SdkError> {
        Ok(Self::new(HttpTransport::with_timeout(url, timeout)?))
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.transport.request(method, params).await?;
        deserialize_response(value)
    }

    async fn request_u64(&self, method: &str, params: Vec<Value>) -> Result<u64, SdkError> {
        let result: String = self.request(method, params).await?;
        Ok(quantity::parse_u64(&result)?)
    }

    async fn request_u256(&self, method: &str, params: Vec<Value>) -> Result<U256, SdkError> {
        let result: String = self.request(method, params).await?;
        Ok(quantity::parse_u256(&result)?)
    }

    async fn request_bytes(&self, method: &str, params: Vec<Value>) -> Result<Bytes, SdkError> {
        let result: String = self.request(method, params).await?;
        Ok(quantity::parse_bytes(&result)?.into())
    }

    /// Escape hatch for methods without a typed wrapper
    pub async fn raw_request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        self.transport.request(method, params).await
    }

    // ==================== Chain Info ====================

    /// `eth_chainId`
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        self.request_u64("eth_chainId", vec![]).await
    }

    /// `eth_blockNumber`
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        self.request_u64("eth_blockNumber", vec![]).await
    }

    /// `eth_gasPrice`
    pub async fn gas_price(&self) -> Result<U256, SdkError> {
        self.request_u256("eth_gasPrice", vec![]).await
    }

    // ==================== Account Queries ====================

    /// `eth_getBalance`
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        self.request_u256(
            "eth_getBalance",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    /// `eth_getTransactionCount`
    pub async fn get_transaction_count(
        &self,
        address: &Address,
        block: BlockId,
    ) -> Result<u64, SdkError> {
        self.request_u64(
            "eth_getTransactionCount",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    /// `eth_getCode`
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        self.request_bytes(
            "eth_getCode",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    // ==================== Block Queries ====================

    /// `eth_getBlockByHash` for a hash, `eth_getBlockByNumber` otherwise
    pub async fn get_block(
        &self,
        block: BlockId,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, SdkError> {
        let method = match block {
            BlockId::Hash(_) => "eth_getBlockByHash",
            _ => "eth_getBlockByNumber",
        };
        self.request(
            method,
            vec![serde_json::to_value(block)?, Value::Bool(full_transactions)],
        )
        .await
    }

    /// `eth_getBlockTransactionCountByHash`
    pub async fn get_block_transaction_count_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<u64>, SdkError> {
        let result: Option<String> = self
            .request(
                "eth_getBlockTransactionCountByHash",
                vec![Value::String(hash.to_hex())],
            )
            .await?;
        result
            .map(|s| quantity::parse_u64(&s).map_err(SdkError::from))
            .transpose()
    }

    /// `eth_getUncleByBlockNumberAndIndex`
    pub async fn get_uncle_by_block_number_and_index(
        &self,
        block: BlockId,
        index: u64,
    ) -> Result<Option<RpcBlock>, SdkError> {
        self.request(
            "eth_getUncleByBlockNumberAndIndex",
            vec![
                serde_json::to_value(block)?,
                Value::String(quantity::format_u64(index)),
            ],
        )
        .await
    }

    // ==================== Transactions ====================

    /// `eth_getTransactionReceipt`; `None` while the transaction is unmined
    pub async fn get_transaction_receipt(
        &self,
        hash: &H256,
    ) -> Result<Option<RpcReceipt>, SdkError> {
        self.request(
            "eth_getTransactionReceipt",
            vec![Value::String(hash.to_hex())],
        )
        .await
    }

    /// `eth_sendRawTransaction` with already signed bytes
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError> {
        let result: String = self
            .request(
                "eth_sendRawTransaction",
                vec![Value::String(quantity::format_bytes(raw))],
            )
            .await?;
        H256::from_hex(&result).map_err(|e| SdkError::Malformed(e.to_string()))
    }

    /// `eth_call` (read-only execution)
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        self.request_bytes(
            "eth_call",
            vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
        )
        .await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_chain_info() {
        let client = RpcClient::new(MockTransport::new());
        assert_eq!(client.chain_id().await.unwrap(), 43);
        assert_eq!(client.block_number().await.unwrap(), 256);
        assert_eq!(client.gas_price().await.unwrap(), U256::from(1_000_000_000u64));
    }

    #[tokio::test]
    async fn test_get_block_routes_by_identifier() {
        let mock = MockTransport::empty();
        mock.set_response("eth_getBlockByNumber", Value::Null);
        mock.set_response("eth_getBlockByHash", Value::Null);
        let client = RpcClient::new(mock.clone());

        assert!(client.get_block(BlockId::Number(7), false).await.unwrap().is_none());
        assert!(client.get_block(BlockId::Hash(H256::ZERO), false).await.unwrap().is_none());

        let calls = mock.calls();
        assert_eq!(calls[0].0, "eth_getBlockByNumber");
        assert_eq!(calls[0].1, vec![json!("0x7"), json!(false)]);
        assert_eq!(calls[1].0, "eth_getBlockByHash");
        assert_eq!(calls[1].1[0], json!(H256::ZERO.to_hex()));
    }

    #[tokio::test]
    async fn test_transaction_count_by_unknown_hash_is_none() {
        let mock = MockTransport::empty();
        mock.set_response("eth_getBlockTransactionCountByHash", Value::Null);
        let client = RpcClient::new(mock);

        let count = client
            .get_block_transaction_count_by_hash(&H256::from_bytes([0x11; 32]))
            .await
            .unwrap();
        assert_eq!(count, None);
    }

    #[tokio::test]
    async fn test_uncle_params_are_hex() {
        let mock = MockTransport::empty();
        mock.set_response("eth_getUncleByBlockNumberAndIndex", Value::Null);
        let client = RpcClient::new(mock.clone());

        let uncle = client
            .get_uncle_by_block_number_and_index(BlockId::Number(0), 0)
            .await
            .unwrap();
        assert!(uncle.is_none());
        assert_eq!(mock.calls()[0].1, vec![json!("0x0"), json!("0x0")]);
    }

    #[tokio::test]
    async fn test_send_raw_transaction_hex_encodes() {
        let mock = MockTransport::empty();
        let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        mock.set_response("eth_sendRawTransaction", json!(hash));
        let client = RpcClient::new(mock.clone());

        let got = client.send_raw_transaction(&[0xf8, 0x6c]).await.unwrap();
        assert_eq!(got, H256::from_hex(hash).unwrap());
        assert_eq!(mock.calls()[0].1, vec![json!("0xf86c")]);
    }

    #[tokio::test]
    async fn test_one_request_per_operation_no_retry() {
        let mock = MockTransport::new();
        mock.push_transport_error("eth_getBalance", "connection refused");
        let client = RpcClient::new(mock.clone());

        let err = client.get_balance(&Address::ZERO, BlockId::Latest).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(mock.call_count("eth_getBalance"), 1);
    }

    #[tokio::test]
    async fn test_malformed_quantity_is_error() {
        let mock = MockTransport::empty();
        mock.set_response("eth_blockNumber", json!("not hex"));
        let client = RpcClient::new(mock);
        assert!(client.block_number().await.is_err());
    }
}
