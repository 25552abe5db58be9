// ABOUTME: NIP-98 HTTP authentication: extracts and validates a signed kind-27235 event from the Authorization header
// ABOUTME: Stateless and CPU-only; the caller maps every failure to a single "unauthenticated" outcome

use crate::event::{Event, Tag};
use crate::signature::SignatureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use thiserror::Error;

/// Event kind reserved for HTTP auth proofs.
pub const HTTP_AUTH_KIND: u16 = 27235;

/// Authorization scheme token preceding the base64 event.
pub const AUTH_SCHEME: &str = "Nostr";

pub const URL_TAG: &str = "u";
pub const METHOD_TAG: &str = "method";

pub const DEFAULT_MAX_AGE_SECS: u64 = 60;
pub const DEFAULT_MAX_FUTURE_SECS: u64 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("No Nostr authorization proof in request")]
    NoProof,

    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("Wrong event kind {0}, expected 27235")]
    WrongKind(u16),

    #[error("Proof created at {created_at} is older than {max_age}s (now {now})")]
    Expired { created_at: i64, now: i64, max_age: u64 },

    #[error("Proof created at {created_at} is more than {max_future}s in the future (now {now})")]
    FromFuture {
        created_at: i64,
        now: i64,
        max_future: u64,
    },

    #[error("Missing or malformed '{0}' tag")]
    MissingTag(&'static str),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Proof does not match request: {0}")]
    RequestMismatch(String),
}

impl From<SignatureError> for ProofError {
    fn from(e: SignatureError) -> Self {
        tracing::debug!("Proof signature could not be checked: {}", e);
        ProofError::InvalidSignature
    }
}

/// Replay window applied to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofPolicy {
    /// Oldest accepted proof, in seconds before now (inclusive)
    pub max_age_secs: u64,
    /// Newest accepted proof, in seconds after now. `None` leaves it unbounded.
    pub max_future_secs: Option<u64>,
}

impl Default for ProofPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_future_secs: Some(DEFAULT_MAX_FUTURE_SECS),
        }
    }
}

/// Validates `Authorization: Nostr <base64(event)>` headers.
#[derive(Debug, Clone, Default)]
pub struct ProofValidator {
    policy: ProofPolicy,
}

impl ProofValidator {
    pub fn new(policy: ProofPolicy) -> Self {
        Self { policy }
    }

    /// Validate a header value against the system clock.
    ///
    /// On success the returned event's `pubkey` is the authenticated caller.
    pub fn validate_header(&self, header: Option<&str>) -> Result<Event, ProofError> {
        self.validate_header_at(header, Utc::now().timestamp())
    }

    /// Validate a header value as of `now` (unix seconds).
    pub fn validate_header_at(&self, header: Option<&str>, now: i64) -> Result<Event, ProofError> {
        let encoded = extract_proof(header)?;

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ProofError::MalformedProof(format!("invalid base64: {}", e)))?;

        let event: Event = serde_json::from_slice(&bytes)
            .map_err(|e| ProofError::MalformedProof(format!("invalid event json: {}", e)))?;

        self.validate_event_at(&event, now)?;
        Ok(event)
    }

    /// Kind, freshness, tag shape, and signature checks on a decoded event.
    pub fn validate_event_at(&self, event: &Event, now: i64) -> Result<(), ProofError> {
        if event.kind != HTTP_AUTH_KIND {
            return Err(ProofError::WrongKind(event.kind));
        }

        if event.created_at < now.saturating_sub(secs_i64(self.policy.max_age_secs)) {
            return Err(ProofError::Expired {
                created_at: event.created_at,
                now,
                max_age: self.policy.max_age_secs,
            });
        }

        if let Some(max_future) = self.policy.max_future_secs {
            if event.created_at > now.saturating_add(secs_i64(max_future)) {
                return Err(ProofError::FromFuture {
                    created_at: event.created_at,
                    now,
                    max_future,
                });
            }
        }

        required_tag(event, URL_TAG)?;
        required_tag(event, METHOD_TAG)?;

        if !event.verify()? {
            return Err(ProofError::InvalidSignature);
        }

        Ok(())
    }
}

/// Strip the `Nostr` scheme token. The token must be followed by whitespace.
fn extract_proof(header: Option<&str>) -> Result<&str, ProofError> {
    let rest = header
        .and_then(|h| h.strip_prefix(AUTH_SCHEME))
        .ok_or(ProofError::NoProof)?;

    if !rest.starts_with(char::is_whitespace) {
        return Err(ProofError::NoProof);
    }

    let encoded = rest.trim();
    if encoded.is_empty() {
        return Err(ProofError::MalformedProof("empty proof".to_string()));
    }
    Ok(encoded)
}

/// The first tag named `name` that carries a value must be exactly `[name, value]`.
///
/// Bare `[name]` tags are skipped, so `["u"]` followed by `["u", url]` finds the second.
fn required_tag<'a>(event: &'a Event, name: &'static str) -> Result<&'a str, ProofError> {
    let tag = event.tag(name).ok_or(ProofError::MissingTag(name))?;
    if tag.len() != 2 {
        return Err(ProofError::MissingTag(name));
    }
    tag.value().ok_or(ProofError::MissingTag(name))
}

fn secs_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Compare the proof's `method` and `u` tags with the request being served.
///
/// Methods compare case-insensitively. URLs compare on path and query only,
/// since the scheme and host seen by the server depend on proxies in front
/// of it.
pub fn check_request_binding(event: &Event, method: &str, uri: &str) -> Result<(), ProofError> {
    let signed_method = required_tag(event, METHOD_TAG)?;
    if !signed_method.eq_ignore_ascii_case(method) {
        return Err(ProofError::RequestMismatch(format!(
            "method '{}' signed, '{}' requested",
            signed_method, method
        )));
    }

    let signed_url = required_tag(event, URL_TAG)?;
    if path_and_query(signed_url) != path_and_query(uri) {
        return Err(ProofError::RequestMismatch(format!(
            "url '{}' signed, '{}' requested",
            signed_url, uri
        )));
    }

    Ok(())
}

/// Reduce an absolute or origin-form URI to its path and query.
fn path_and_query(uri: &str) -> String {
    let uri = uri.split('#').next().unwrap_or(uri);
    let rest = match uri.find("://") {
        Some(idx) => {
            let authority_and_rest = &uri[idx + 3..];
            match authority_and_rest.find(['/', '?']) {
                Some(start) => &authority_and_rest[start..],
                None => "",
            }
        }
        None => uri,
    };
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    }
}

/// Build the header value a client sends for a signed proof.
pub fn encode_header(event: &Event) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(event)?;
    Ok(format!("{} {}", AUTH_SCHEME, STANDARD.encode(json)))
}

/// Build and sign a proof for `method` on `url`.
pub fn sign_proof(
    secret_key_hex: &str,
    url: &str,
    method: &str,
    created_at: i64,
) -> Result<Event, SignatureError> {
    let mut event = Event::unsigned(
        created_at,
        HTTP_AUTH_KIND,
        vec![Tag::new([URL_TAG, url]), Tag::new([METHOD_TAG, method])],
        "",
    );
    event.sign(secret_key_hex)?;
    Ok(event)
}
