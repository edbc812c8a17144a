//! # conform-sdk
//!
//! Client-side plumbing for talking to an Ethereum JSON-RPC node under test.
//!
//! ## Features
//!
//! - **RpcClient**: typed wrappers over the `eth_*` methods the harness consumes,
//!   plus a raw escape hatch
//! - **Transport**: the seam between the client and the wire (`HttpTransport`,
//!   `MockTransport`, or your own)
//! - **Wallet** / **TxBuilder**: signing collaborator producing EIP-155 legacy
//!   transactions for `eth_sendRawTransaction`
//! - **Contract** / **ABI**: JSON ABI parsing and call encoding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conform_sdk::{RpcClient, TxBuilder, Wallet};
//! use conform_sdk::types::BlockId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::http("http://127.0.0.1:9933", std::time::Duration::from_secs(30))?;
//!     let wallet = Wallet::new_random();
//!
//!     let nonce = client.get_transaction_count(wallet.address(), BlockId::Pending).await?;
//!     let tx = TxBuilder::new(client.chain_id().await?)
//!         .nonce(nonce)
//!         .gas_limit(21_000)
//!         .gas_price(1_000_000_000u64)
//!         .to(*Wallet::new_random().address())
//!         .value(512u64)
//!         .sign(&wallet)?;
//!
//!     let hash = client.send_raw_transaction(tx.raw()).await?;
//!     assert_eq!(hash, tx.hash());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
pub mod contract;
mod error;
mod transport;
mod tx_builder;
pub mod types;
mod wallet;

pub use client::RpcClient;
pub use contract::{Abi, Contract};
pub use error::SdkError;
pub use transport::{MockHandler, MockTransport, Transport};
pub use tx_builder::{contract_address, SignedTx, TxBuilder};
pub use types::Bloom;
pub use wallet::Wallet;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export primitives for convenience
pub use conform_primitives::{Address, H256, U256};
