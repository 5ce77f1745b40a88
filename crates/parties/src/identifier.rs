use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, DomainResult, Entity, IdentifierId};

/// Kind of external identifier, with the authority that issues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierType {
    /// Australian Business Number.
    Abn,
    /// Australian Company Number.
    Acn,
    /// Australian Registered Body Number.
    Arbn,
    /// Tax File Number.
    Tfn,
}

impl IdentifierType {
    pub fn code(&self) -> &'static str {
        match self {
            IdentifierType::Abn => "ABN",
            IdentifierType::Acn => "ACN",
            IdentifierType::Arbn => "ARBN",
            IdentifierType::Tfn => "TFN",
        }
    }

    pub fn register(&self) -> &'static str {
        match self {
            IdentifierType::Abn => "Australian Business Register",
            IdentifierType::Acn | IdentifierType::Arbn => {
                "Australian Securities and Investments Commission"
            }
            IdentifierType::Tfn => "Australian Taxation Office",
        }
    }

    /// Number of digits once spaces are stripped.
    fn digits(&self) -> usize {
        match self {
            IdentifierType::Abn => 11,
            IdentifierType::Acn | IdentifierType::Arbn | IdentifierType::Tfn => 9,
        }
    }
}

impl core::str::FromStr for IdentifierType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ABN" => Ok(IdentifierType::Abn),
            "ACN" => Ok(IdentifierType::Acn),
            "ARBN" => Ok(IdentifierType::Arbn),
            "TFN" => Ok(IdentifierType::Tfn),
            other => Err(DomainError::validation(format!("unknown identifier type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierLifecycleStatus {
    #[default]
    Active,
    Inactive,
    Cancelled,
}

impl IdentifierLifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierLifecycleStatus::Active => "ACTIVE",
            IdentifierLifecycleStatus::Inactive => "INACTIVE",
            IdentifierLifecycleStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::str::FromStr for IdentifierLifecycleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(IdentifierLifecycleStatus::Active),
            "INACTIVE" => Ok(IdentifierLifecycleStatus::Inactive),
            "CANCELLED" => Ok(IdentifierLifecycleStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown lifecycle status '{other}'"))),
        }
    }
}

/// External identifier such as a business number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub id: IdentifierId,
    #[serde(rename = "type")]
    pub identifier_type: IdentifierType,
    pub value: String,
    pub register: String,
    pub lifecycle_status: IdentifierLifecycleStatus,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl Identifier {
    /// New active identifier; the register is derived from the type.
    pub fn new(identifier_type: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            id: IdentifierId::UNASSIGNED,
            identifier_type,
            value: value.into(),
            register: identifier_type.register().to_string(),
            lifecycle_status: IdentifierLifecycleStatus::Active,
            from_date: None,
            to_date: None,
        }
    }

    pub fn valid_from(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        let digits: String = self.value.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() != self.identifier_type.digits() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "{} must be {} digits",
                self.identifier_type.code(),
                self.identifier_type.digits()
            )));
        }
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if to < from {
                return Err(DomainError::validation("toDate precedes fromDate"));
            }
        }
        Ok(())
    }
}

impl Entity for Identifier {
    type Id = IdentifierId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abn_is_registered_with_the_abr() {
        let abn = Identifier::new(IdentifierType::Abn, "85 087 326 690");
        assert_eq!(abn.register, "Australian Business Register");
        assert_eq!(abn.lifecycle_status, IdentifierLifecycleStatus::Active);
        assert!(abn.validate().is_ok());
    }

    #[test]
    fn rejects_wrong_length_and_letters() {
        assert!(Identifier::new(IdentifierType::Abn, "85 087 326").validate().is_err());
        assert!(Identifier::new(IdentifierType::Acn, "12345678X").validate().is_err());
    }

    #[test]
    fn codes_parse_back() {
        for t in [IdentifierType::Abn, IdentifierType::Acn, IdentifierType::Arbn, IdentifierType::Tfn] {
            assert_eq!(t.code().parse::<IdentifierType>().unwrap(), t);
        }
    }
}
