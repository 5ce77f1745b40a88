//! Individual: a person about whom information is kept.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, DomainResult, Entity, PartyId};

use crate::party::{Party, PartyType};
use crate::role::PartySnapshot;

/// Name parts of an individual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndividualName {
    pub title: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    /// Post-nominals, e.g. "MP".
    pub honorific: String,
    pub salutation: String,
    pub preferred_name: String,
    pub initials: String,
}

impl IndividualName {
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
            ..Self::default()
        }
    }

    /// "Family, Given" as used for directory listings.
    pub fn display_name(&self) -> String {
        match (self.family_name.is_empty(), self.given_name.is_empty()) {
            (false, false) => format!("{}, {}", self.family_name, self.given_name),
            (false, true) => self.family_name.clone(),
            (true, _) => self.given_name.clone(),
        }
    }
}

/// Person-specific extension of a [`Party`]. Shares the party's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    pub party: Party,
    pub name: IndividualName,
    /// Sort column, always equal to `name.family_name` once persisted.
    #[serde(default)]
    pub sort: String,
    pub sex: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub electorate: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    pub country_of_birth: Option<String>,
    pub date_of_death: Option<NaiveDate>,
    pub place_of_death: Option<String>,
    pub country_of_death: Option<String>,
    pub relationship_lifecycle_status: Option<String>,
}

impl Individual {
    /// New, unsaved individual. The display name defaults to "Family, Given".
    pub fn new(name: IndividualName) -> Self {
        let party = Party::individual(name.display_name());
        let sort = name.family_name.clone();
        Self {
            party,
            name,
            sort,
            sex: None,
            gender: None,
            email: None,
            phone_number: None,
            photo_url: None,
            electorate: None,
            date_of_birth: None,
            place_of_birth: None,
            country_of_birth: None,
            date_of_death: None,
            place_of_death: None,
            country_of_death: None,
            relationship_lifecycle_status: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.party.display_name = display_name.into();
        self
    }

    pub fn with_contact(mut self, email: impl Into<String>, phone_number: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    /// Re-derive the sort column from the family name.
    ///
    /// Stores call this on every write so prefix search ordering never
    /// depends on the caller remembering to do it.
    pub fn refresh_sort_key(&mut self) {
        self.sort = self.name.family_name.clone();
    }

    /// Check the record can be persisted.
    pub fn validate(&self) -> DomainResult<()> {
        self.party.ensure_type(PartyType::Individual)?;
        if self.name.family_name.trim().is_empty() {
            return Err(DomainError::validation("family name cannot be empty"));
        }
        if self.party.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        Ok(())
    }

    /// Identity/contact snapshot for role records.
    pub fn snapshot(&self) -> PartySnapshot {
        PartySnapshot {
            party_id: self.party.id,
            party_type: PartyType::Individual,
            name: self.party.display_name.clone(),
            email: self.email.clone().unwrap_or_default(),
            phone_number: self.phone_number.clone().unwrap_or_default(),
        }
    }
}

impl Entity for Individual {
    type Id = PartyId;

    fn id(&self) -> Self::Id {
        self.party.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.party.id = id;
    }
}
