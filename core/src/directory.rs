// ABOUTME: Authorization directory holding the allowed and admin pubkey sets behind an ArcSwap snapshot
// ABOUTME: Readers never block; refreshes resolve names without locks and publish the merge atomically

use crate::config::AuthorizationConfig;
use crate::identity::{classify, normalize_static, IdentifierForm};
use crate::traits::NameResolver;
use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which list an entry was configured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authorized,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Admin => "admin",
        }
    }
}

/// Immutable view of the directory at one point in time.
///
/// Both lists are sets in content but keep insertion order so two snapshots
/// built from the same inputs compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectorySnapshot {
    pub authorized: Vec<String>,
    pub admins: Vec<String>,
}

impl DirectorySnapshot {
    fn list_mut(&mut self, role: Role) -> &mut Vec<String> {
        match role {
            Role::Authorized => &mut self.authorized,
            Role::Admin => &mut self.admins,
        }
    }

    /// Append `pubkey` unless already present. Returns true when it was added.
    fn insert(&mut self, role: Role, pubkey: &str) -> bool {
        let list = self.list_mut(role);
        if list.iter().any(|existing| existing == pubkey) {
            return false;
        }
        list.push(pubkey.to_string());
        true
    }

    pub fn is_admin(&self, pubkey: &str) -> bool {
        self.admins.iter().any(|p| p.eq_ignore_ascii_case(pubkey))
    }

    /// Admins are implicitly authorized.
    pub fn is_authorized(&self, pubkey: &str) -> bool {
        self.authorized.iter().any(|p| p.eq_ignore_ascii_case(pubkey)) || self.is_admin(pubkey)
    }
}

/// Outcome of one initialize or refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added_authorized: Vec<String>,
    pub added_admins: Vec<String>,
    /// Entries that could not be resolved this pass
    pub failures: Vec<String>,
    /// True when another refresh was already running and this one did nothing
    pub skipped: bool,
}

impl RefreshReport {
    pub fn added(&self) -> usize {
        self.added_authorized.len() + self.added_admins.len()
    }
}

/// Clears the in-flight flag when a pass ends, including when its future is dropped
/// mid-await or a resolver panics.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Process-wide authorization state, shared by request handlers and the
/// refresh task through an `Arc`.
pub struct AuthorizationDirectory {
    allowed_users: Vec<String>,
    admin_users: Vec<String>,
    use_nip05: bool,
    resolver: Arc<dyn NameResolver>,
    snapshot: ArcSwap<DirectorySnapshot>,
    refreshing: AtomicBool,
}

impl AuthorizationDirectory {
    /// Create an empty directory. Nothing is resolved until [`initialize`](Self::initialize).
    pub fn new(config: &AuthorizationConfig, resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            allowed_users: config.allowed_users.clone(),
            admin_users: config.admin_users.clone(),
            use_nip05: config.use_nip05,
            resolver,
            snapshot: ArcSwap::from_pointee(DirectorySnapshot::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Current snapshot. Cheap; never blocks on a running refresh.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        self.snapshot.load_full()
    }

    pub fn is_authorized(&self, pubkey: &str) -> bool {
        self.snapshot.load().is_authorized(pubkey)
    }

    pub fn is_admin(&self, pubkey: &str) -> bool {
        self.snapshot.load().is_admin(pubkey)
    }

    fn entries(&self) -> impl Iterator<Item = (Role, &str)> {
        self.allowed_users
            .iter()
            .map(|e| (Role::Authorized, e.as_str()))
            .chain(self.admin_users.iter().map(|e| (Role::Admin, e.as_str())))
    }

    /// Resolve every configured entry (hex, npub, and, when enabled, usernames).
    ///
    /// Entries that fail to resolve are logged and skipped; startup goes on.
    pub async fn initialize(&self) -> RefreshReport {
        let entries: Vec<(Role, &str)> = self.entries().collect();
        self.run_exclusive(entries).await
    }

    /// Re-resolve username entries and merge any new keys.
    ///
    /// Append-only: a name that stops resolving keeps whatever access it was
    /// already granted. If a refresh is already in flight this call returns
    /// immediately with `skipped` set.
    pub async fn refresh(&self) -> RefreshReport {
        if !self.use_nip05 {
            tracing::info!("NIP-05 is not enabled, skipping directory refresh");
            return RefreshReport::default();
        }

        let entries: Vec<(Role, &str)> = self
            .entries()
            .filter(|(_, entry)| classify(entry) == IdentifierForm::Username)
            .collect();
        self.run_exclusive(entries).await
    }

    async fn run_exclusive(&self, entries: Vec<(Role, &str)>) -> RefreshReport {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Directory refresh already in progress, skipping this trigger");
            return RefreshReport {
                skipped: true,
                ..RefreshReport::default()
            };
        }

        let _guard = RefreshGuard(&self.refreshing);
        self.resolve_and_merge(entries).await
    }

    async fn resolve_and_merge(&self, entries: Vec<(Role, &str)>) -> RefreshReport {
        let mut resolved: Vec<(Role, String, &str)> = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();

        // Network lookups happen here, with no lock held and the old snapshot still served
        for (role, entry) in entries {
            match self.resolve_entry(entry).await {
                Some(pubkey) => resolved.push((role, pubkey, entry)),
                None => failures.push(entry.to_string()),
            }
        }

        let mut report = RefreshReport {
            failures,
            ..RefreshReport::default()
        };

        // rcu may retry the closure under contention, so the report is rebuilt each attempt
        self.snapshot.rcu(|current| {
            let mut next = DirectorySnapshot::clone(current);
            report.added_authorized.clear();
            report.added_admins.clear();
            for (role, pubkey, _) in &resolved {
                if next.insert(*role, pubkey) {
                    match role {
                        Role::Authorized => report.added_authorized.push(pubkey.clone()),
                        Role::Admin => report.added_admins.push(pubkey.clone()),
                    }
                }
            }
            next
        });

        for (role, pubkey, entry) in &resolved {
            let added = match role {
                Role::Authorized => report.added_authorized.contains(pubkey),
                Role::Admin => report.added_admins.contains(pubkey),
            };
            if added {
                tracing::info!(user = %entry, pubkey = %pubkey, role = role.as_str(), "Added public key to directory");
            } else {
                tracing::debug!(user = %entry, pubkey = %pubkey, role = role.as_str(), "Public key already in directory");
            }
        }

        report
    }

    async fn resolve_entry(&self, entry: &str) -> Option<String> {
        match classify(entry) {
            IdentifierForm::Hex | IdentifierForm::Npub => normalize_static(entry),
            IdentifierForm::Username if !self.use_nip05 => {
                tracing::warn!(user = %entry, "NIP-05 is disabled, ignoring username entry");
                None
            }
            IdentifierForm::Username => match self.resolver.resolve(entry).await {
                Ok(pubkey) => Some(pubkey),
                Err(e) => {
                    tracing::error!(user = %entry, "Failed to resolve NIP-05 identifier: {}", e);
                    None
                }
            },
            IdentifierForm::Invalid => {
                tracing::error!(user = %entry, "Invalid user format");
                None
            }
        }
    }
}
