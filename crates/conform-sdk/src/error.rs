//! Errors surfaced by the client, signer and ABI codec

use thiserror::Error;

/// Anything that can go wrong between building a request and reading the
/// node's answer
///
/// `Clone` so mock transports can hand the same scripted failure out
/// more than once.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// Could not reach the node or the connection broke mid-request
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// `error.code`
        code: i64,
        /// `error.message`
        message: String,
    },

    /// The node answered, but the result is not what the method returns
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Not a 20-byte address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Not a usable secp256k1 secret
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// secp256k1 signing or recovery failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Arguments do not fit the function's parameter types
    #[error("abi encoding error: {0}")]
    AbiEncode(String),

    /// Return data does not decode as the declared outputs
    #[error("abi decoding error: {0}")]
    AbiDecode(String),

    /// A transaction was signed before this field was set
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Chain id 0
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
}

impl SdkError {
    /// Connection-level failure, the only kind worth retrying
    pub fn is_transport(&self) -> bool {
        matches!(self, SdkError::Transport(_))
    }
}

macro_rules! malformed_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for SdkError {
                fn from(e: $source) -> Self {
                    SdkError::Malformed(e.to_string())
                }
            }
        )+
    };
}

malformed_from!(
    hex::FromHexError,
    serde_json::Error,
    conform_primitives::QuantityError,
    conform_primitives::HashError,
);

impl From<conform_primitives::AddressError> for SdkError {
    fn from(e: conform_primitives::AddressError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<conform_crypto::CryptoError> for SdkError {
    fn from(e: conform_crypto::CryptoError) -> Self {
        SdkError::Signing(e.to_string())
    }
}
