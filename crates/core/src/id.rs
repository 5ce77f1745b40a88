//! Strongly-typed identifiers used across the domain.
//!
//! Ids are positive integers handed out by the store. `0` marks a record that
//! has not been persisted yet.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a party (shared by its Individual/Organisation record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(i64);

/// Identifier of a location (shared by its Address record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(i64);

/// Identifier of one side of a party relationship.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i64);

/// Identifier of an external identifier record (ABN, ACN, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierId(i64);

macro_rules! impl_sequence_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Placeholder for records that have not been saved yet.
            pub const UNASSIGNED: Self = Self(0);

            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            pub const fn is_assigned(self) -> bool {
                self.0 > 0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::UNASSIGNED
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!("{}: must be positive", $name)));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_sequence_newtype!(PartyId, "PartyId");
impl_sequence_newtype!(LocationId, "LocationId");
impl_sequence_newtype!(RoleId, "RoleId");
impl_sequence_newtype!(IdentifierId, "IdentifierId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: PartyId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!(id.is_assigned());
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert!(matches!("0".parse::<PartyId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<RoleId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<LocationId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn default_is_unassigned() {
        assert!(!IdentifierId::default().is_assigned());
    }
}
