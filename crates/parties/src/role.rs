//! Party relationships as pairs of reciprocal roles.
//!
//! A relationship between parties A and B is stored as two [`Role`] records:
//! one attached to A pointing at B, one attached to B pointing at A. Each
//! record carries a [`PartySnapshot`] of both ends taken when the pair was
//! built. Snapshots are not refreshed when a party is edited later.

use serde::{Deserialize, Serialize};

use partybook_core::{DomainError, DomainResult, Entity, PartyId, RoleId};

use crate::party::PartyType;

pub const DEFAULT_ROLE: &str = "Member";
pub const DEFAULT_RELATIONSHIP: &str = "Membership";
pub const DEFAULT_RECIPROCAL_ROLE: &str = "Organisation";

/// Last-known identity and contact details of a party.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySnapshot {
    pub party_id: PartyId,
    pub party_type: PartyType,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

/// One directed side of a relationship between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub role: String,
    pub party: PartySnapshot,
    pub relationship: String,
    pub reciprocal_role: String,
    pub reciprocal: PartySnapshot,
}

impl Role {
    pub fn owner(&self) -> PartyId {
        self.party.party_id
    }

    pub fn counterparty(&self) -> PartyId {
        self.reciprocal.party_id
    }

    /// True when `other` is the mirror image of `self`.
    pub fn is_reciprocal_of(&self, other: &Role) -> bool {
        self.party == other.reciprocal
            && self.reciprocal == other.party
            && self.role == other.reciprocal_role
            && self.reciprocal_role == other.role
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id;
    }
}

/// Role and relationship labels, seen from party A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleLabels {
    /// Role played by A.
    pub role: String,
    /// What the relationship is to A.
    pub relationship: String,
    /// Role played by B.
    pub reciprocal_role: String,
    /// What the relationship is to B.
    pub reciprocal_relationship: String,
}

impl RoleLabels {
    pub fn new(
        role: impl Into<String>,
        relationship: impl Into<String>,
        reciprocal_role: impl Into<String>,
        reciprocal_relationship: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            relationship: relationship.into(),
            reciprocal_role: reciprocal_role.into(),
            reciprocal_relationship: reciprocal_relationship.into(),
        }
    }

    /// Organisation (A) with a member (B): "Organisation"/"Primary Contact"
    /// on the organisation side, "Member"/"Membership" on the member side.
    pub fn membership() -> Self {
        Self::new(DEFAULT_RECIPROCAL_ROLE, "Primary Contact", DEFAULT_ROLE, DEFAULT_RELATIONSHIP)
    }

    /// Organisation (A) with an ordinary member (B).
    pub fn member() -> Self {
        Self::new(DEFAULT_RECIPROCAL_ROLE, DEFAULT_RELATIONSHIP, DEFAULT_ROLE, DEFAULT_RELATIONSHIP)
    }

    /// Same relationship seen from B.
    pub fn reversed(&self) -> Self {
        Self {
            role: self.reciprocal_role.clone(),
            relationship: self.reciprocal_relationship.clone(),
            reciprocal_role: self.role.clone(),
            reciprocal_relationship: self.relationship.clone(),
        }
    }

    fn validate(&self) -> DomainResult<()> {
        let labels = [
            &self.role,
            &self.relationship,
            &self.reciprocal_role,
            &self.reciprocal_relationship,
        ];
        if labels.iter().any(|l| l.trim().is_empty()) {
            return Err(DomainError::validation("role and relationship labels cannot be empty"));
        }
        Ok(())
    }
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self::membership()
    }
}

/// The two unsaved roles that make up one relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    /// Attached to party A.
    pub forward: Role,
    /// Attached to party B.
    pub reverse: Role,
}

impl RolePair {
    /// Build the reciprocal pair between `a` and `b`.
    ///
    /// Both parties must already be persisted and must be distinct.
    pub fn between(a: PartySnapshot, b: PartySnapshot, labels: &RoleLabels) -> DomainResult<Self> {
        labels.validate()?;
        if !a.party_id.is_assigned() || !b.party_id.is_assigned() {
            return Err(DomainError::validation("both parties must be saved before they can be linked"));
        }
        if a.party_id == b.party_id {
            return Err(DomainError::invariant("a party cannot be linked to itself"));
        }

        let forward = Role {
            id: RoleId::UNASSIGNED,
            role: labels.role.clone(),
            party: a.clone(),
            relationship: labels.relationship.clone(),
            reciprocal_role: labels.reciprocal_role.clone(),
            reciprocal: b.clone(),
        };
        let reverse = Role {
            id: RoleId::UNASSIGNED,
            role: labels.reciprocal_role.clone(),
            party: b,
            relationship: labels.reciprocal_relationship.clone(),
            reciprocal_role: labels.role.clone(),
            reciprocal: a,
        };

        Ok(Self { forward, reverse })
    }

    pub fn is_consistent(&self) -> bool {
        self.forward.is_reciprocal_of(&self.reverse)
    }

    pub fn into_roles(self) -> (Role, Role) {
        (self.forward, self.reverse)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn organisation() -> PartySnapshot {
        PartySnapshot {
            party_id: PartyId::new(2),
            party_type: PartyType::Organisation,
            name: "Jacqui Lambie Network".to_string(),
            email: "hey@lambienetwork.com.au".to_string(),
            phone_number: "(03) 6431 3112".to_string(),
        }
    }

    fn member() -> PartySnapshot {
        PartySnapshot {
            party_id: PartyId::new(1),
            party_type: PartyType::Individual,
            name: "Williams, Glynn".to_string(),
            email: "glynn.williams@lambienetwork.com.au".to_string(),
            phone_number: "(03) 6431 3112".to_string(),
        }
    }

    #[test]
    fn membership_pair_cross_references_both_parties() {
        let pair = RolePair::between(organisation(), member(), &RoleLabels::membership()).unwrap();

        assert_eq!(pair.forward.role, "Organisation");
        assert_eq!(pair.forward.relationship, "Primary Contact");
        assert_eq!(pair.forward.reciprocal_role, "Member");
        assert_eq!(pair.forward.owner(), PartyId::new(2));
        assert_eq!(pair.forward.reciprocal, member());

        assert_eq!(pair.reverse.role, "Member");
        assert_eq!(pair.reverse.relationship, "Membership");
        assert_eq!(pair.reverse.reciprocal_role, "Organisation");
        assert_eq!(pair.reverse.owner(), PartyId::new(1));
        assert_eq!(pair.reverse.reciprocal, organisation());

        assert!(pair.is_consistent());
    }

    #[test]
    fn default_labels_are_membership() {
        assert_eq!(RoleLabels::default(), RoleLabels::membership());
        assert_eq!(RoleLabels::membership().reversed().role, DEFAULT_ROLE);
        assert_eq!(RoleLabels::membership().reversed().relationship, DEFAULT_RELATIONSHIP);
    }

    #[test]
    fn rejects_self_link() {
        let err = RolePair::between(member(), member(), &RoleLabels::membership()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rejects_unsaved_party() {
        let mut unsaved = member();
        unsaved.party_id = PartyId::UNASSIGNED;
        let err = RolePair::between(organisation(), unsaved, &RoleLabels::membership()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_blank_labels() {
        let labels = RoleLabels::new("Organisation", "", "Member", "Membership");
        let err = RolePair::between(organisation(), member(), &labels).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    fn snapshot_strategy() -> impl Strategy<Value = PartySnapshot> {
        (
            1i64..10_000,
            prop_oneof![Just(PartyType::Individual), Just(PartyType::Organisation)],
            "[A-Za-z ,]{1,24}",
            "[a-z.]{0,16}@[a-z]{1,8}\\.org",
            "[0-9 ()]{0,14}",
        )
            .prop_map(|(id, party_type, name, email, phone_number)| PartySnapshot {
                party_id: PartyId::new(id),
                party_type,
                name,
                email,
                phone_number,
            })
    }

    fn labels_strategy() -> impl Strategy<Value = RoleLabels> {
        ("[A-Za-z]{1,12}", "[A-Za-z ]{0,8}[A-Za-z]", "[A-Za-z]{1,12}", "[A-Za-z ]{0,8}[A-Za-z]")
            .prop_map(|(a, b, c, d)| RoleLabels::new(a, b, c, d))
    }

    proptest! {
        #[test]
        fn pair_is_symmetric(a in snapshot_strategy(), b in snapshot_strategy(), labels in labels_strategy()) {
            prop_assume!(a.party_id != b.party_id);
            let pair = RolePair::between(a.clone(), b.clone(), &labels).unwrap();

            prop_assert_eq!(&pair.forward.party, &a);
            prop_assert_eq!(&pair.forward.reciprocal, &b);
            prop_assert_eq!(&pair.reverse.party, &b);
            prop_assert_eq!(&pair.reverse.reciprocal, &a);
            prop_assert!(pair.forward.is_reciprocal_of(&pair.reverse));
            prop_assert!(pair.reverse.is_reciprocal_of(&pair.forward));
        }

        #[test]
        fn reversing_labels_swaps_the_pair(a in snapshot_strategy(), b in snapshot_strategy(), labels in labels_strategy()) {
            prop_assume!(a.party_id != b.party_id);
            let ab = RolePair::between(a.clone(), b.clone(), &labels).unwrap();
            let ba = RolePair::between(b, a, &labels.reversed()).unwrap();

            prop_assert_eq!(ab.forward, ba.reverse);
            prop_assert_eq!(ab.reverse, ba.forward);
        }
    }
}
