use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, Entity, LocationId, PartyId, RoleId};

/// Discriminant of the record composed around a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyType {
    Individual,
    Organisation,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Individual => "INDIVIDUAL",
            PartyType::Organisation => "ORGANISATION",
        }
    }
}

impl core::fmt::Display for PartyType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PartyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(PartyType::Individual),
            "ORGANISATION" => Ok(PartyType::Organisation),
            other => Err(DomainError::validation(format!("unknown party type '{other}'"))),
        }
    }
}

/// Common identity of an Individual or an Organisation.
///
/// A party owns its address and role associations; the referenced records
/// live in their own repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PartyId,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    pub display_name: String,
    #[serde(default)]
    pub addresses: BTreeSet<LocationId>,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
}

impl Party {
    pub fn new(party_type: PartyType, display_name: impl Into<String>) -> Self {
        Self {
            id: PartyId::UNASSIGNED,
            party_type,
            display_name: display_name.into(),
            addresses: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn individual(display_name: impl Into<String>) -> Self {
        Self::new(PartyType::Individual, display_name)
    }

    pub fn organisation(display_name: impl Into<String>) -> Self {
        Self::new(PartyType::Organisation, display_name)
    }

    pub(crate) fn ensure_type(&self, expected: PartyType) -> Result<(), DomainError> {
        if self.party_type != expected {
            return Err(DomainError::invariant(format!(
                "party type mismatch (expected {expected}, found {})",
                self.party_type
            )));
        }
        Ok(())
    }
}

impl Entity for Party {
    type Id = PartyId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id;
    }
}
