//! # Revert Decoding
//!
//! Turns raw EVM revert data into an operator-facing message.
//!
//! Solidity encodes `require(cond, "msg")` as `Error(string)` (selector
//! `0x08c379a0`) and compiler-inserted checks as `Panic(uint256)` (selector
//! `0x4e487b71`).

use primitive_types::U256;

/// `bytes4(keccak256("Error(string)"))`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// `bytes4(keccak256("Panic(uint256)"))`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Message used when revert data cannot be decoded.
pub const GENERIC_REVERT_MESSAGE: &str = "transaction reverted without a reason";

fn word(data: &[u8], offset: usize) -> Option<U256> {
    let end = offset.checked_add(32)?;
    data.get(offset..end).map(U256::from_big_endian)
}

fn word_as_usize(data: &[u8], offset: usize) -> Option<usize> {
    let value = word(data, offset)?;
    if value > U256::from(usize::MAX) {
        return None;
    }
    Some(value.as_usize())
}

fn panic_description(code: U256) -> &'static str {
    match code.low_u64() {
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division by zero",
        0x21 => "invalid enum value",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to uninitialized function",
        _ => "unknown panic",
    }
}

/// Decode revert data into a reason, if it follows a standard encoding.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let (selector, body) = (data.get(..4)?, data.get(4..)?);

    if selector == ERROR_STRING_SELECTOR {
        let offset = word_as_usize(body, 0)?;
        let len = word_as_usize(body, offset)?;
        let start = offset.checked_add(32)?;
        let bytes = body.get(start..start.checked_add(len)?)?;
        let reason = String::from_utf8(bytes.to_vec()).ok()?;
        return Some(reason);
    }

    if selector == PANIC_SELECTOR {
        let code = word(body, 0)?;
        return Some(format!(
            "panic code 0x{:02x} ({})",
            code.low_u64(),
            panic_description(code)
        ));
    }

    None
}

/// Decoded reason, or a generic fallback that names what was received.
pub fn describe_revert(data: &[u8]) -> String {
    if let Some(reason) = decode_revert_reason(data) {
        return reason;
    }
    match data.get(..4) {
        Some(selector) if selector == ERROR_STRING_SELECTOR => {
            format!("{} (malformed Error(string) payload)", GENERIC_REVERT_MESSAGE)
        }
        Some(selector) if selector == PANIC_SELECTOR => {
            format!("{} (malformed Panic(uint256) payload)", GENERIC_REVERT_MESSAGE)
        }
        Some(selector) => format!(
            "{} (custom error 0x{})",
            GENERIC_REVERT_MESSAGE,
            hex::encode(selector)
        ),
        None => GENERIC_REVERT_MESSAGE.to_string(),
    }
}

/// ABI-encode `Error(string)` revert data.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let bytes = reason.as_bytes();
    let padded = bytes.len().div_ceil(32) * 32;
    let mut data = Vec::with_capacity(4 + 64 + padded);
    data.extend_from_slice(&ERROR_STRING_SELECTOR);

    let mut word = [0u8; 32];
    U256::from(32u64).to_big_endian(&mut word);
    data.extend_from_slice(&word);
    U256::from(bytes.len()).to_big_endian(&mut word);
    data.extend_from_slice(&word);

    data.extend_from_slice(bytes);
    data.resize(4 + 64 + padded, 0);
    data
}
