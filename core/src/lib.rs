// ABOUTME: Core library for the nostr-file service: identifiers, events, NIP-98 proofs, NIP-05 lookups
// ABOUTME: Also holds the authorization directory and its cron-driven refresh task

pub mod config;
pub mod directory;
pub mod event;
pub mod identity;
pub mod nip05;
pub mod nip98;
pub mod scheduler;
pub mod signature;
pub mod traits;

// Re-export main types for convenience
pub use config::{AuthorizationConfig, ConfigError, ServerConfig};
pub use directory::{AuthorizationDirectory, DirectorySnapshot, RefreshReport, Role};
pub use event::{Event, Tag};
pub use identity::{decode_npub, encode_npub, IdentifierForm, IdentityError};
pub use nip05::Nip05Client;
pub use nip98::{ProofError, ProofPolicy, ProofValidator};
pub use scheduler::{spawn_refresh_task, RefreshSchedule, ScheduleError};
pub use signature::SignatureError;
pub use traits::NameResolver;
