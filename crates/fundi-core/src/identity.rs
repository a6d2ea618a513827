//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier namespace in the settlement
//! engine — you cannot pass an `EscrowId` where a `VoucherId` is expected.
//!
//! Clients, artisans, and suppliers all live in the `UserId` namespace;
//! role checks belong to the identity collaborator, not the type system.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// A platform user: client, artisan, or material supplier.
    UserId,
    "user"
);
uuid_id!(
    /// A mission (one client/artisan engagement). At most one escrow exists per mission.
    MissionId,
    "mission"
);
uuid_id!(
    /// The worksite a mission's milestones belong to.
    WorksiteId,
    "worksite"
);
uuid_id!(
    /// An escrow holding a mission's blocked funds.
    EscrowId,
    "escrow"
);
uuid_id!(
    /// A unit of billable worksite progress.
    MilestoneId,
    "milestone"
);
uuid_id!(
    /// A bounded material-purchase voucher.
    VoucherId,
    "voucher"
);
uuid_id!(
    /// One append-only voucher validation audit row.
    ValidationId,
    "validation"
);
uuid_id!(
    /// A ledger transaction entry.
    TransactionId,
    "txn"
);
uuid_id!(
    /// A dispute over a mission.
    DisputeId,
    "dispute"
);

/// A subscriber phone number in E.164-ish form, used for provider routing.
///
/// Normalized at construction: optional leading `+`, then 8-15 digits.
/// Routing by prefix happens against the digit string without the `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalize a phone number.
    ///
    /// Accepts digits with an optional leading `+` and common separators
    /// (spaces, dashes), which are stripped.
    pub fn parse(raw: &str) -> Result<Self, PhoneNumberError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();
        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::NotNumeric(raw.to_string()));
        }
        if digits.len() < 8 || digits.len() > 15 {
            return Err(PhoneNumberError::BadLength(digits.len()));
        }
        Ok(Self(digits.to_string()))
    }

    /// The normalized digit string (no `+`, no separators).
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Whether the number starts with the given routing prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

/// Errors from phone number normalization.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// Input contained non-digit characters after stripping separators.
    #[error("phone number is not numeric: {0:?}")]
    NotNumeric(String),

    /// Digit count outside the 8-15 range.
    #[error("phone number has {0} digits, expected 8-15")]
    BadLength(usize),
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        PhoneNumber::parse(&s)
    }
}

impl From<PhoneNumber> for String {
    fn from(p: PhoneNumber) -> String {
        p.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}", self.0)
    }
}
