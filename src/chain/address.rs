//! Core-space address handling.
//!
//! Contract calls need raw 20-byte addresses while operators configure and the
//! PoS RPC returns base32 (CIP-37) strings such as `cfx:acc7uawf5...`. Hex
//! `0x...` input is accepted as well.

use crate::error::{AppError, AppResult};

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghjkmnprstuvwxyz0123456789";
const PAYLOAD_CHARS: usize = 34;
const CHECKSUM_CHARS: usize = 8;

/// Parse a core-space address (base32 or hex) into its 20 raw bytes.
///
/// Base32 input must carry a valid CIP-37 checksum for its network prefix;
/// the optional `type.*` segment is ignored.
pub fn parse_core_address(address: &str) -> AppResult<[u8; 20]> {
    let trimmed = address.trim();
    if let Some(hex_part) = strip_hex_prefix(trimmed) {
        return decode_fixed::<20>(hex_part, address);
    }

    let encoded = trimmed
        .rsplit(':')
        .next()
        .filter(|_| trimmed.contains(':'))
        .ok_or_else(|| AppError::InvalidAddress(address.to_string()))?
        .to_ascii_lowercase();

    if encoded.len() != PAYLOAD_CHARS + CHECKSUM_CHARS {
        return Err(AppError::InvalidAddress(format!(
            "{}: expected {} base32 characters, got {}",
            address,
            PAYLOAD_CHARS + CHECKSUM_CHARS,
            encoded.len()
        )));
    }

    if let Some(bad) = encoded.bytes().find(|c| !BASE32_ALPHABET.contains(c)) {
        return Err(AppError::InvalidAddress(format!(
            "{}: bad character {:?}",
            address, bad as char
        )));
    }

    let network = trimmed
        .split(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !checksum_valid(&network, &encoded) {
        return Err(AppError::InvalidAddress(format!("{}: checksum mismatch", address)));
    }

    let mut bytes = Vec::with_capacity(21);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for c in encoded.bytes().take(PAYLOAD_CHARS) {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c).unwrap_or_default();
        acc = (acc << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            bytes.push(((acc >> bits) & 0xff) as u8);
            acc &= (1 << bits) - 1;
        }
    }

    // 170 payload bits = 21 bytes + 2 padding bits, which must be zero
    if acc != 0 {
        return Err(AppError::InvalidAddress(format!("{}: non-zero padding", address)));
    }
    if bytes.len() != 21 || bytes[0] != 0 {
        return Err(AppError::InvalidAddress(format!("{}: unsupported version byte", address)));
    }

    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes[1..]);
    Ok(out)
}

fn polymod(values: impl Iterator<Item = u8>) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for value in values {
        let c0 = c >> 35;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(value);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 == 1 {
                c ^= generator;
            }
        }
    }
    c ^ 1
}

/// `encoded` is payload plus checksum, already checked against the alphabet
fn checksum_valid(network: &str, encoded: &str) -> bool {
    let prefix = network.bytes().map(|b| b & 0x1f);
    let data = encoded
        .bytes()
        .filter_map(|c| BASE32_ALPHABET.iter().position(|&a| a == c))
        .map(|value| value as u8);
    polymod(prefix.chain(std::iter::once(0)).chain(data)) == 0
}

/// Parse a 32-byte PoS account address (`0x` + 64 hex chars).
pub fn parse_pos_address(address: &str) -> AppResult<[u8; 32]> {
    let hex_part = strip_hex_prefix(address.trim())
        .ok_or_else(|| AppError::InvalidAddress(address.to_string()))?;
    decode_fixed::<32>(hex_part, address)
}

fn strip_hex_prefix(value: &str) -> Option<&str> {
    value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
}

fn decode_fixed<const N: usize>(hex_part: &str, input: &str) -> AppResult<[u8; N]> {
    let raw = hex::decode(hex_part)?;
    raw.try_into().map_err(|raw: Vec<u8>| {
        AppError::InvalidAddress(format!("{}: expected {} bytes, got {}", input, N, raw.len()))
    })
}
