//! ABI decoding

use conform_primitives::{Address, U256};

use super::types::{ParamType, Token};
use crate::SdkError;

fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], SdkError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            SdkError::AbiDecode(format!(
                "need {} bytes at offset {}, have {}",
                len,
                offset,
                data.len()
            ))
        })
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(slice(data, offset, 32)?);
    if value > U256::from(u32::MAX) {
        return Err(SdkError::AbiDecode(format!("offset or length too large: {}", value)));
    }
    Ok(value.low_u64() as usize)
}

fn read_dynamic(data: &[u8], head: usize) -> Result<Vec<u8>, SdkError> {
    let start = read_usize(data, head)?;
    let len = read_usize(data, start)?;
    Ok(slice(data, start + 32, len)?.to_vec())
}

fn decode_token(kind: &ParamType, data: &[u8], head: usize) -> Result<Token, SdkError> {
    let token = match kind {
        ParamType::Address => {
            let w = slice(data, head, 32)?;
            Token::Address(Address::from_slice(&w[12..])?)
        }
        ParamType::Uint(_) => Token::Uint(U256::from_big_endian(slice(data, head, 32)?)),
        ParamType::Int(_) => Token::Int(U256::from_big_endian(slice(data, head, 32)?)),
        ParamType::Bool => match slice(data, head, 32)?[31] {
            0 => Token::Bool(false),
            1 => Token::Bool(true),
            other => return Err(SdkError::AbiDecode(format!("invalid bool byte {}", other))),
        },
        ParamType::FixedBytes(n) => Token::FixedBytes(slice(data, head, 32)?[..*n].to_vec()),
        ParamType::Bytes => Token::Bytes(read_dynamic(data, head)?),
        ParamType::String => {
            let bytes = read_dynamic(data, head)?;
            Token::String(
                String::from_utf8(bytes)
                    .map_err(|e| SdkError::AbiDecode(format!("invalid utf-8: {}", e)))?,
            )
        }
    };
    Ok(token)
}

/// Decode tokens from ABI-encoded data
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    types
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_token(kind, data, i * 32))
        .collect()
}
