//! # User Directory Seam
//!
//! The engine does not own user accounts; it asks a collaborator
//! whether an actor is eligible and which mobile-money wallet pays
//! them. Production wires the platform's identity service here; tests
//! use the in-memory directory.

use std::collections::HashMap;
use std::sync::RwLock;

use fundi_core::{PhoneNumber, UserId};

/// Identity collaborator consulted before any fund-affecting operation.
pub trait UserDirectory: Send + Sync {
    /// Whether the user may take part in settlements (active account,
    /// completed KYC). Ineligible users are rejected before any mutation.
    fn is_eligible(&self, user: UserId) -> bool;

    /// The mobile-money wallet that pays or is paid for this user.
    fn wallet_msisdn(&self, user: UserId) -> Option<PhoneNumber>;
}

/// In-memory directory for tests and local development.
///
/// Every registered user is eligible unless explicitly suspended.
#[derive(Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

#[derive(Default)]
struct DirectoryInner {
    wallets: HashMap<UserId, PhoneNumber>,
    suspended: Vec<UserId>,
    /// Fallback wallet handed to unregistered users, when set.
    default_wallet: Option<PhoneNumber>,
}

impl InMemoryDirectory {
    /// An empty directory: nobody has a wallet, everybody is eligible.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that answers every wallet lookup with `msisdn`.
    /// Keeps tests focused on settlement rather than user setup.
    pub fn permissive(msisdn: PhoneNumber) -> Self {
        let dir = Self::default();
        if let Ok(mut inner) = dir.inner.write() {
            inner.default_wallet = Some(msisdn);
        }
        dir
    }

    /// Register a user's wallet.
    pub fn register(&self, user: UserId, msisdn: PhoneNumber) {
        if let Ok(mut inner) = self.inner.write() {
            inner.wallets.insert(user, msisdn);
        }
    }

    /// Mark a user ineligible.
    pub fn suspend(&self, user: UserId) {
        if let Ok(mut inner) = self.inner.write() {
            if !inner.suspended.contains(&user) {
                inner.suspended.push(user);
            }
        }
    }
}

impl UserDirectory for InMemoryDirectory {
    fn is_eligible(&self, user: UserId) -> bool {
        self.inner
            .read()
            .map(|inner| !inner.suspended.contains(&user))
            .unwrap_or(false)
    }

    fn wallet_msisdn(&self, user: UserId) -> Option<PhoneNumber> {
        let inner = self.inner.read().ok()?;
        inner
            .wallets
            .get(&user)
            .cloned()
            .or_else(|| inner.default_wallet.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msisdn(raw: &str) -> PhoneNumber {
        PhoneNumber::parse(raw).unwrap()
    }

    #[test]
    fn test_registered_wallet_wins_over_default() {
        let dir = InMemoryDirectory::permissive(msisdn("237677000000"));
        let user = UserId::new();
        dir.register(user, msisdn("237699111111"));
        assert_eq!(
            dir.wallet_msisdn(user).unwrap().digits(),
            "237699111111"
        );
        assert_eq!(
            dir.wallet_msisdn(UserId::new()).unwrap().digits(),
            "237677000000"
        );
    }

    #[test]
    fn test_suspension_revokes_eligibility() {
        let dir = InMemoryDirectory::new();
        let user = UserId::new();
        assert!(dir.is_eligible(user));
        dir.suspend(user);
        assert!(!dir.is_eligible(user));
    }

    #[test]
    fn test_unregistered_user_without_default_has_no_wallet() {
        let dir = InMemoryDirectory::new();
        assert!(dir.wallet_msisdn(UserId::new()).is_none());
    }
}
