// ABOUTME: Identifier codec for Nostr public keys (hex, npub bech32, and name@domain forms)
// ABOUTME: Pure conversions only; username resolution lives behind the NameResolver trait

use bech32::{Bech32, Hrp};
use thiserror::Error;

/// Human-readable prefix of a bech32 encoded public key (NIP-19).
pub const NPUB_HRP: &str = "npub";

/// Length of a hex encoded x-only public key.
pub const HEX_PUBKEY_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// The surface form a configured user entry is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierForm {
    /// 64 hex characters, either case
    Hex,
    /// `npub1...`
    Npub,
    /// `local@domain.tld`, resolved through NIP-05 discovery
    Username,
    Invalid,
}

/// Classify a configured entry by its surface form.
///
/// Hex is checked first, then bech32, then the username pattern, so a string
/// that happens to satisfy more than one rule lands in the cheapest bucket.
pub fn classify(entry: &str) -> IdentifierForm {
    if is_hex_pubkey(entry) {
        IdentifierForm::Hex
    } else if is_npub(entry) {
        IdentifierForm::Npub
    } else if is_username(entry) {
        IdentifierForm::Username
    } else {
        IdentifierForm::Invalid
    }
}

/// True for a 64 character hex string (upper or lower case).
pub fn is_hex_pubkey(entry: &str) -> bool {
    entry.len() == HEX_PUBKEY_LEN && entry.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True when the entry decodes as an npub.
pub fn is_npub(entry: &str) -> bool {
    decode_npub(entry).is_ok()
}

/// True for `<local>@<domain>` where the domain carries at least one dot.
pub fn is_username(entry: &str) -> bool {
    split_username(entry).is_some()
}

/// Split a fully-qualified username into `(local, domain)`.
pub fn split_username(entry: &str) -> Option<(&str, &str)> {
    let mut parts = entry.split('@');
    let local = parts.next()?;
    let domain = parts.next()?;
    if parts.next().is_some() || !domain.contains('.') {
        return None;
    }
    Some((local, domain))
}

/// Decode an `npub1...` string into the lowercase hex public key.
///
/// Fails with [`IdentityError::InvalidEncoding`] on a bad checksum, a prefix
/// other than `npub`, a payload that is not 32 bytes, or non-zero padding
/// bits. An empty input is an error, never an empty success.
pub fn decode_npub(npub: &str) -> Result<String, IdentityError> {
    if npub.is_empty() {
        return Err(IdentityError::InvalidEncoding("empty npub".to_string()));
    }

    let (hrp, data) = bech32::decode(npub)
        .map_err(|e| IdentityError::InvalidEncoding(format!("bech32 decode failed: {}", e)))?;

    if hrp.to_lowercase() != NPUB_HRP {
        return Err(IdentityError::InvalidEncoding(format!(
            "expected '{}' prefix, got '{}'",
            NPUB_HRP, hrp
        )));
    }

    if data.len() != HEX_PUBKEY_LEN / 2 {
        return Err(IdentityError::InvalidEncoding(format!(
            "expected 32 bytes, got {}",
            data.len()
        )));
    }

    // Re-encoding must reproduce the input. This rejects bech32m checksums and
    // payloads whose trailing 5-bit group carries stray padding bits.
    let canonical = encode_bytes(&data)?;
    if canonical != npub.to_ascii_lowercase() {
        return Err(IdentityError::InvalidEncoding(
            "non-canonical bech32 encoding".to_string(),
        ));
    }

    Ok(hex::encode(data))
}

/// Encode a hex public key as `npub1...`.
pub fn encode_npub(pubkey_hex: &str) -> Result<String, IdentityError> {
    if !is_hex_pubkey(pubkey_hex) {
        return Err(IdentityError::InvalidEncoding(format!(
            "'{}' is not a 64 character hex public key",
            pubkey_hex
        )));
    }
    let bytes = hex::decode(pubkey_hex)
        .map_err(|e| IdentityError::InvalidEncoding(format!("invalid hex: {}", e)))?;
    encode_bytes(&bytes)
}

fn encode_bytes(bytes: &[u8]) -> Result<String, IdentityError> {
    let hrp = Hrp::parse(NPUB_HRP)
        .map_err(|e| IdentityError::InvalidEncoding(format!("invalid hrp: {}", e)))?;
    bech32::encode::<Bech32>(hrp, bytes)
        .map_err(|e| IdentityError::InvalidEncoding(format!("bech32 encode failed: {}", e)))
}

/// Resolve a hex or npub entry to canonical lowercase hex without any I/O.
///
/// Returns `None` for usernames and invalid entries.
pub fn normalize_static(entry: &str) -> Option<String> {
    match classify(entry) {
        IdentifierForm::Hex => Some(entry.to_ascii_lowercase()),
        IdentifierForm::Npub => decode_npub(entry).ok(),
        IdentifierForm::Username | IdentifierForm::Invalid => None,
    }
}
