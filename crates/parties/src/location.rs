//! Locations and the postal addresses built on top of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, DomainResult, Entity, LocationId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    #[default]
    Address,
    Site,
    Region,
    Country,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Address => "ADDRESS",
            LocationType::Site => "SITE",
            LocationType::Region => "REGION",
            LocationType::Country => "COUNTRY",
        }
    }
}

impl core::str::FromStr for LocationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDRESS" => Ok(LocationType::Address),
            "SITE" => Ok(LocationType::Site),
            "REGION" => Ok(LocationType::Region),
            "COUNTRY" => Ok(LocationType::Country),
            other => Err(DomainError::validation(format!("unknown location type '{other}'"))),
        }
    }
}

/// Generic place record with a validity window and audit metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    #[serde(rename = "type", default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub display_name: String,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Location {
    pub fn new(location_type: LocationType, display_name: impl Into<String>) -> Self {
        Self {
            location_type,
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Audit stamp for a first write.
    pub fn stamp_created(&mut self, actor: &str, now: DateTime<Utc>) {
        self.created_by = Some(actor.to_string());
        self.created_at = Some(now);
        self.stamp_updated(actor, now);
    }

    pub fn stamp_updated(&mut self, actor: &str, now: DateTime<Utc>) {
        self.updated_by = Some(actor.to_string());
        self.updated_at = Some(now);
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if to < from {
                return Err(DomainError::validation("toDate precedes fromDate"));
            }
        }
        Ok(())
    }
}

/// Postal address; shares the id of its [`Location`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub location: Location,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: String,
}

impl Address {
    pub fn validate(&self) -> DomainResult<()> {
        self.location.validate()?;
        if self.location.location_type != LocationType::Address {
            return Err(DomainError::invariant("address must sit on an ADDRESS location"));
        }
        if self.line1.trim().is_empty() && self.name.trim().is_empty() {
            return Err(DomainError::validation("address needs a name or line1"));
        }
        Ok(())
    }
}

impl Entity for Address {
    type Id = LocationId;

    fn id(&self) -> Self::Id {
        self.location.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.location.id = id;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn head_office() -> Address {
        Address {
            location: Location::new(LocationType::Address, "22 Mount Street Burnie TAS 7320"),
            line1: "Shop 4".to_string(),
            line2: "22 Mount Street".to_string(),
            city: "Burnie".to_string(),
            state: "TAS".to_string(),
            postal_code: "7320".to_string(),
            country: "Australia".to_string(),
            address_type: "Principal Place of Business".to_string(),
            ..Address::default()
        }
    }

    #[test]
    fn stamp_created_sets_both_audit_pairs() {
        let now = Utc::now();
        let mut location = Location::default();
        location.stamp_created("seed", now);
        assert_eq!(location.created_by.as_deref(), Some("seed"));
        assert_eq!(location.updated_at, Some(now));
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let now = Utc::now();
        let mut address = head_office();
        address.location.from_date = Some(now);
        address.location.to_date = Some(now - Duration::days(1));
        assert!(matches!(address.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn validate_rejects_non_address_location() {
        let mut address = head_office();
        address.location.location_type = LocationType::Region;
        assert!(matches!(address.validate(), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn address_id_is_location_id() {
        let mut address = head_office();
        address.set_id(LocationId::new(3));
        assert_eq!(address.location.id, LocationId::new(3));
        assert!(address.validate().is_ok());
    }
}
