//! Solidity ABI subset used by the conformance contracts
//!
//! Elementary types only (`address`, `bool`, `uint<N>`, `int<N>`, `bytes<N>`,
//! `bytes`, `string`); no arrays or tuples.
//!
//! ```rust
//! use conform_sdk::abi::{decode, encode_function_call, function_selector, ParamType, Token};
//! use conform_sdk::U256;
//!
//! let selector = function_selector("increment(uint256)");
//! let data = encode_function_call(selector, &[Token::Uint(U256::from(3))]);
//! assert_eq!(data.len(), 36);
//!
//! let tokens = decode(&[ParamType::Uint(256)], &data[4..]).unwrap();
//! assert_eq!(tokens, vec![Token::Uint(U256::from(3))]);
//! ```

mod decode;
mod encode;
mod types;

pub use decode::decode;
pub use encode::{encode, encode_function_call, function_selector};
pub use types::{parse_type, ParamType, Token};
