//! ABI type definitions

use conform_primitives::{Address, U256};
use std::fmt;

use crate::SdkError;

/// Solidity ABI token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer, two's complement in 256 bits
    Int(U256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
}

impl Token {
    /// Whether this token can be encoded as `kind`
    pub fn matches(&self, kind: &ParamType) -> bool {
        match (self, kind) {
            (Token::Address(_), ParamType::Address)
            | (Token::Bool(_), ParamType::Bool)
            | (Token::Bytes(_), ParamType::Bytes)
            | (Token::String(_), ParamType::String)
            | (Token::Int(_), ParamType::Int(_)) => true,
            (Token::Uint(v), ParamType::Uint(bits)) => v.bits() <= *bits,
            (Token::FixedBytes(b), ParamType::FixedBytes(n)) => b.len() == *n,
            _ => false,
        }
    }

    /// Inner value of a `Uint`
    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    /// Inner value of an `Address`
    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParamType::Bytes | ParamType::String)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(n) => write!(f, "bytes{}", n),
            ParamType::String => write!(f, "string"),
        }
    }
}

fn int_bits(rest: &str, s: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    match rest.parse::<usize>() {
        Ok(bits) if bits > 0 && bits <= 256 && bits % 8 == 0 => Ok(bits),
        _ => Err(SdkError::AbiEncode(format!("invalid integer width in {:?}", s))),
    }
}

/// Parse a Solidity type string (e.g., "uint256", "address")
pub fn parse_type(s: &str) -> Result<ParamType, SdkError> {
    let s = s.trim();

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return int_bits(rest, s).map(ParamType::Uint);
    }
    if let Some(rest) = s.strip_prefix("int") {
        return int_bits(rest, s).map(ParamType::Int);
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        return match rest.parse::<usize>() {
            Ok(n) if (1..=32).contains(&n) => Ok(ParamType::FixedBytes(n)),
            _ => Err(SdkError::AbiEncode(format!("invalid bytes width in {:?}", s))),
        };
    }

    Err(SdkError::AbiEncode(format!("unsupported type {:?}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("address").unwrap(), ParamType::Address);
        assert_eq!(parse_type("uint256").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(parse_type("int64").unwrap(), ParamType::Int(64));
        assert_eq!(parse_type("bool").unwrap(), ParamType::Bool);
        assert_eq!(parse_type("bytes").unwrap(), ParamType::Bytes);
        assert_eq!(parse_type("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(parse_type(" string ").unwrap(), ParamType::String);
    }

    #[test]
    fn test_parse_type_rejects_malformed() {
        for bad in ["uint7", "uint264", "int0", "bytes0", "bytes33", "uint256[]", "tuple", "fixed128x18"] {
            assert!(parse_type(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(parse_type("uint").unwrap().to_string(), "uint256");
        assert_eq!(ParamType::FixedBytes(4).to_string(), "bytes4");
    }

    #[test]
    fn test_token_matches_width() {
        assert!(Token::Uint(U256::from(255)).matches(&ParamType::Uint(8)));
        assert!(!Token::Uint(U256::from(256)).matches(&ParamType::Uint(8)));
        assert!(!Token::Bool(true).matches(&ParamType::Address));
        assert!(Token::FixedBytes(vec![0; 4]).matches(&ParamType::FixedBytes(4)));
        assert!(!Token::FixedBytes(vec![0; 3]).matches(&ParamType::FixedBytes(4)));
    }
}
