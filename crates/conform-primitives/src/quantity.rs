//! Hex quantity and data codecs used by the JSON-RPC wire format.
//!
//! Quantities are `0x`-prefixed big-endian hex without leading zeros (`0x0` for
//! zero). Data is `0x`-prefixed hex with an even number of digits (`0x` for empty).
//!
//! The `*_hex` submodules plug into `#[serde(with = "...")]`.

use primitive_types::U256;
use thiserror::Error;

/// Quantity parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    /// Empty quantity (`0x` or ``)
    #[error("empty quantity")]
    Empty,
    /// Not valid hex, or does not fit the target type
    #[error("invalid quantity {0:?}")]
    Invalid(String),
    /// Not valid hex data
    #[error("invalid hex data: {0}")]
    InvalidData(String),
}

fn digits(s: &str) -> Result<&str, QuantityError> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if body.is_empty() {
        return Err(QuantityError::Empty);
    }
    Ok(body)
}

/// Parse a hex quantity into `u64`
pub fn parse_u64(s: &str) -> Result<u64, QuantityError> {
    let body = digits(s)?;
    u64::from_str_radix(body, 16).map_err(|_| QuantityError::Invalid(s.to_string()))
}

/// Parse a hex quantity into `U256`
pub fn parse_u256(s: &str) -> Result<U256, QuantityError> {
    let body = digits(s)?;
    if body.len() > 64 {
        return Err(QuantityError::Invalid(s.to_string()));
    }
    U256::from_str_radix(body, 16).map_err(|_| QuantityError::Invalid(s.to_string()))
}

/// Format `u64` as a hex quantity
pub fn format_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Format `U256` as a hex quantity
pub fn format_u256(value: &U256) -> String {
    format!("0x{:x}", value)
}

/// Parse hex data (`0x` is empty)
pub fn parse_bytes(s: &str) -> Result<Vec<u8>, QuantityError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| QuantityError::InvalidData(e.to_string()))
}

/// Format bytes as hex data
pub fn format_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// serde adapter for `u64` quantities
pub mod u64_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex quantity
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_u64(*value))
    }

    /// Deserialize from hex quantity
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_u64(&s).map_err(de::Error::custom)
    }
}

/// serde adapter for optional `u64` quantities (`null` or missing is `None`)
pub mod opt_u64_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex quantity or null
    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&super::format_u64(*v)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from hex quantity or null
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::parse_u64(&s).map_err(de::Error::custom))
            .transpose()
    }
}

/// serde adapter for `U256` quantities
pub mod u256_hex {
    use primitive_types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex quantity
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_u256(value))
    }

    /// Deserialize from hex quantity
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_u256(&s).map_err(de::Error::custom)
    }
}

/// serde adapter for optional `U256` quantities
pub mod opt_u256_hex {
    use primitive_types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex quantity or null
    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&super::format_u256(v)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from hex quantity or null
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::parse_u256(&s).map_err(de::Error::custom))
            .transpose()
    }
}

/// serde adapter for hex data into any `From<Vec<u8>>` container
pub mod bytes_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as hex data
    pub fn serialize<S: Serializer, T: AsRef<[u8]>>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_bytes(value.as_ref()))
    }

    /// Deserialize from hex data
    pub fn deserialize<'de, D: Deserializer<'de>, T: From<Vec<u8>>>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_bytes(&s).map(T::from).map_err(de::Error::custom)
    }
}
