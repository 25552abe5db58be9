//! Nostr event model and its canonical serialization.
//!
//! The canonical form is the byte string whose SHA-256 digest is the event id
//! and the message signed by the author (NIP-01):
//!
//! ```text
//! [0,"<pubkey>",<created_at>,<kind>,[["t","v"],...],"<content>"]
//! ```
//!
//! It is produced by hand rather than through `serde_json` because field
//! order, number formatting, and the escape set are part of the signed
//! contract and must match byte for byte what every verifier recomputes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A tag is an ordered list of strings whose first element names it.
///
/// `["u", "https://example.com/file"]` is represented as
/// `Tag(vec!["u".into(), "https://example.com/file".into()])`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Second element, conventionally the tag's value.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A signed Nostr event as it travels on the wire.
///
/// `id` and `sig` are only meaningful after [`Event::sign`]. For received
/// events `id` is informational: verification always recomputes the digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    /// Author public key (hex)
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
    pub kind: u16,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub content: String,
    /// Schnorr signature over the id (hex)
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Build an unsigned event. `pubkey`, `id`, and `sig` are filled in by signing.
    pub fn unsigned(created_at: i64, kind: u16, tags: Vec<Tag>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            pubkey: String::new(),
            created_at,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        }
    }

    /// First tag with the given name that carries a value. Bare `[name]` tags are skipped.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|t| t.len() >= 2 && t.name() == Some(name))
    }

    /// Canonical byte encoding used for hashing and signing.
    pub fn serialize(&self) -> Vec<u8> {
        let tags_hint: usize = self
            .tags
            .iter()
            .map(|t| t.0.iter().map(|s| s.len() + 3).sum::<usize>() + 2)
            .sum();
        let mut out = Vec::with_capacity(100 + self.content.len() + tags_hint);

        out.extend_from_slice(b"[0,\"");
        out.extend_from_slice(self.pubkey.as_bytes());
        out.extend_from_slice(b"\",");
        out.extend_from_slice(self.created_at.to_string().as_bytes());
        out.push(b',');
        out.extend_from_slice(self.kind.to_string().as_bytes());
        out.push(b',');

        out.push(b'[');
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.push(b'[');
            for (j, item) in tag.0.iter().enumerate() {
                if j > 0 {
                    out.push(b',');
                }
                escape_string(&mut out, item);
            }
            out.push(b']');
        }
        out.extend_from_slice(b"],");

        escape_string(&mut out, &self.content);
        out.push(b']');

        out
    }

    /// SHA-256 of the canonical encoding.
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.serialize()).into()
    }

    /// Hex event id recomputed from the current fields.
    pub fn compute_id(&self) -> String {
        hex::encode(self.hash())
    }
}

/// Append `s` as a quoted JSON string literal (RFC 8259 escaping).
///
/// Only `"` and `\` and bytes below 0x20 are escaped. Everything from 0x20
/// upward, including multi-byte UTF-8 sequences, is copied through.
pub fn escape_string(out: &mut Vec<u8>, s: &str) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    out.push(b'"');
    for &c in s.as_bytes() {
        match c {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x08 => out.extend_from_slice(b"\\b"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\n' => out.extend_from_slice(b"\\n"),
            0x0c => out.extend_from_slice(b"\\f"),
            b'\r' => out.extend_from_slice(b"\\r"),
            c if c < 0x20 => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX[(c >> 4) as usize]);
                out.push(HEX[(c & 0x0f) as usize]);
            }
            c => out.push(c),
        }
    }
    out.push(b'"');
}
