// ABOUTME: BIP-340 Schnorr signing and verification of Nostr events over secp256k1
// ABOUTME: The event id is always recomputed from the canonical encoding, never trusted from the wire

use crate::event::Event;
use secp256k1::{schnorr::Signature, Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Secret key is not hex or not a valid scalar
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Event pubkey is not hex or not a point on the curve
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Event signature is not hex or not 64 bytes
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
}

fn keypair_from_hex(secret_key_hex: &str) -> Result<Keypair, SignatureError> {
    let bytes = hex::decode(secret_key_hex)
        .map_err(|e| SignatureError::InvalidKey(format!("secret key is not valid hex: {}", e)))?;
    let secret_key = SecretKey::from_slice(&bytes)
        .map_err(|e| SignatureError::InvalidKey(format!("secret key is not a valid scalar: {}", e)))?;
    let secp = Secp256k1::signing_only();
    Ok(Keypair::from_secret_key(&secp, &secret_key))
}

/// Derive the hex x-only public key for a hex secret key.
pub fn public_key_from_secret(secret_key_hex: &str) -> Result<String, SignatureError> {
    let keypair = keypair_from_hex(secret_key_hex)?;
    let (xonly, _parity) = keypair.x_only_public_key();
    Ok(hex::encode(xonly.serialize()))
}

impl Event {
    /// Sign the event in place.
    ///
    /// Sets `pubkey` from the secret key, then `id` to the hex digest of the
    /// canonical encoding and `sig` to the Schnorr signature over that digest.
    pub fn sign(&mut self, secret_key_hex: &str) -> Result<(), SignatureError> {
        let keypair = keypair_from_hex(secret_key_hex)?;
        let (xonly, _parity) = keypair.x_only_public_key();
        self.pubkey = hex::encode(xonly.serialize());

        let hash = self.hash();
        let secp = Secp256k1::signing_only();
        let signature = secp.sign_schnorr_no_aux_rand(&Message::from_digest(hash), &keypair);

        self.id = hex::encode(hash);
        self.sig = hex::encode(signature.serialize());
        Ok(())
    }

    /// Verify the signature against the recomputed digest and the claimed pubkey.
    ///
    /// Returns `Ok(false)` for a well-formed but wrong signature. Errors are
    /// reserved for inputs that cannot be decoded at all.
    pub fn verify(&self) -> Result<bool, SignatureError> {
        let pubkey_bytes = hex::decode(&self.pubkey).map_err(|e| {
            SignatureError::MalformedIdentifier(format!("pubkey '{}' is not valid hex: {}", self.pubkey, e))
        })?;
        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes).map_err(|e| {
            SignatureError::MalformedIdentifier(format!("pubkey '{}' is not a valid key: {}", self.pubkey, e))
        })?;

        let sig_bytes = hex::decode(&self.sig).map_err(|e| {
            SignatureError::MalformedSignature(format!("signature is not valid hex: {}", e))
        })?;
        let signature = Signature::from_slice(&sig_bytes).map_err(|e| {
            SignatureError::MalformedSignature(format!("signature is not a valid encoding: {}", e))
        })?;

        let message = Message::from_digest(self.hash());
        let secp = Secp256k1::verification_only();
        Ok(secp.verify_schnorr(&signature, &message, &pubkey).is_ok())
    }
}
