//! ABI encoding

use conform_primitives::U256;

use super::types::Token;

/// 32-byte big-endian word
fn word(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

/// Length word followed by the data right-padded to a multiple of 32
fn encode_dynamic(data: &[u8]) -> Vec<u8> {
    let mut out = word(&U256::from(data.len())).to_vec();
    out.extend_from_slice(data);
    out.resize(32 + data.len().div_ceil(32) * 32, 0);
    out
}

/// Head word for a static token
fn encode_static(token: &Token) -> [u8; 32] {
    let mut buf = [0u8; 32];
    match token {
        Token::Address(addr) => buf[12..].copy_from_slice(addr.as_bytes()),
        Token::Uint(v) | Token::Int(v) => buf = word(v),
        Token::Bool(b) => buf[31] = u8::from(*b),
        Token::FixedBytes(data) => {
            let len = data.len().min(32);
            buf[..len].copy_from_slice(&data[..len]);
        }
        Token::Bytes(_) | Token::String(_) => {}
    }
    buf
}

/// Encode tokens as a head/tail tuple
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_size = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Bytes(data) => {
                head.extend_from_slice(&word(&U256::from(head_size + tail.len())));
                tail.extend(encode_dynamic(data));
            }
            Token::String(s) => {
                head.extend_from_slice(&word(&U256::from(head_size + tail.len())));
                tail.extend(encode_dynamic(s.as_bytes()));
            }
            _ => head.extend_from_slice(&encode_static(token)),
        }
    }

    head.extend(tail);
    head
}

/// Encode function call (selector + params)
pub fn encode_function_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut result = selector.to_vec();
    result.extend(encode(tokens));
    result
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = conform_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}
