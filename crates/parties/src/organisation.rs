//! Organisation: a company, association, political party, ...

use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, DomainResult, Entity, PartyId};

use crate::party::{Party, PartyType};
use crate::role::PartySnapshot;

/// Legal structure of an organisation (Australian Business Register terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalType {
    SoleTrader,
    Partnership,
    Trust,
    PrivateCompany,
    PublicCompany,
    GovernmentEntity,
    OtherIncorporatedEntity,
    OtherUnincorporatedEntity,
}

impl LegalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalType::SoleTrader => "SOLE_TRADER",
            LegalType::Partnership => "PARTNERSHIP",
            LegalType::Trust => "TRUST",
            LegalType::PrivateCompany => "PRIVATE_COMPANY",
            LegalType::PublicCompany => "PUBLIC_COMPANY",
            LegalType::GovernmentEntity => "GOVERNMENT_ENTITY",
            LegalType::OtherIncorporatedEntity => "OTHER_INCORPORATED_ENTITY",
            LegalType::OtherUnincorporatedEntity => "OTHER_UNINCORPORATED_ENTITY",
        }
    }
}

impl core::str::FromStr for LegalType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "SOLE_TRADER" => LegalType::SoleTrader,
            "PARTNERSHIP" => LegalType::Partnership,
            "TRUST" => LegalType::Trust,
            "PRIVATE_COMPANY" => LegalType::PrivateCompany,
            "PUBLIC_COMPANY" => LegalType::PublicCompany,
            "GOVERNMENT_ENTITY" => LegalType::GovernmentEntity,
            "OTHER_INCORPORATED_ENTITY" => LegalType::OtherIncorporatedEntity,
            "OTHER_UNINCORPORATED_ENTITY" => LegalType::OtherUnincorporatedEntity,
            other => return Err(DomainError::validation(format!("unknown legal type '{other}'"))),
        })
    }
}

/// Organisation-specific extension of a [`Party`]. Shares the party's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organisation {
    pub party: Party,
    pub name: String,
    pub legal_type: Option<LegalType>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Organisation {
    /// New, unsaved organisation; the display name is the organisation name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            party: Party::organisation(name.clone()),
            name,
            legal_type: None,
            email: None,
            phone_number: None,
        }
    }

    pub fn with_legal_type(mut self, legal_type: LegalType) -> Self {
        self.legal_type = Some(legal_type);
        self
    }

    pub fn with_contact(mut self, email: impl Into<String>, phone_number: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.party.ensure_type(PartyType::Organisation)?;
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.party.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> PartySnapshot {
        PartySnapshot {
            party_id: self.party.id,
            party_type: PartyType::Organisation,
            name: self.party.display_name.clone(),
            email: self.email.clone().unwrap_or_default(),
            phone_number: self.phone_number.clone().unwrap_or_default(),
        }
    }
}

impl Entity for Organisation {
    type Id = PartyId;

    fn id(&self) -> Self::Id {
        self.party.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.party.id = id;
    }
}
