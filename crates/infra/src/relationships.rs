//! Linking two parties through a reciprocal pair of roles.

use tracing::{info, instrument};

use partybook_core::{DomainError, PartyId};
use partybook_parties::{PartySnapshot, PartyType, Role, RoleLabels, RolePair};

use crate::repository::{Repositories, RepositoryResult};

/// Builds and persists relationship role pairs.
///
/// Every check runs before the single [`save_pair`] write, so a rejected
/// link leaves both parties untouched.
///
/// [`save_pair`]: crate::repository::RelationshipRepository::save_pair
#[derive(Debug, Clone)]
pub struct RelationshipBuilder {
    repositories: Repositories,
}

impl RelationshipBuilder {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Current identity/contact snapshot of a stored party.
    pub async fn snapshot(&self, party_id: PartyId) -> RepositoryResult<PartySnapshot> {
        let party = self.repositories.parties.find_party(party_id).await?;
        let snapshot = match party.party_type {
            PartyType::Individual => self.repositories.individuals.find_by_id(party_id).await?.snapshot(),
            PartyType::Organisation => self.repositories.organisations.find_by_id(party_id).await?.snapshot(),
        };
        Ok(snapshot)
    }

    /// Link `a` to `b`. `labels` are read from `a`'s side.
    #[instrument(
        skip(self, a, b, labels),
        fields(party_id = %a.party_id, reciprocal_party_id = %b.party_id),
        err
    )]
    pub async fn link(&self, a: PartySnapshot, b: PartySnapshot, labels: &RoleLabels) -> RepositoryResult<(Role, Role)> {
        let pair = RolePair::between(a, b, labels)?;

        for snapshot in [&pair.forward.party, &pair.reverse.party] {
            let stored = self.repositories.parties.find_party(snapshot.party_id).await?;
            if stored.party_type != snapshot.party_type {
                return Err(DomainError::invariant(format!(
                    "party {} is {}, not {}",
                    stored.id, stored.party_type, snapshot.party_type
                ))
                .into());
            }
        }

        let (forward, reverse) = self.repositories.relationships.save_pair(pair).await?;
        info!(
            role_id = %forward.id,
            reciprocal_role_id = %reverse.id,
            relationship = %forward.relationship,
            "linked parties"
        );
        Ok((forward, reverse))
    }

    /// Link two stored parties by id, snapshotting both first.
    pub async fn link_by_id(&self, a: PartyId, b: PartyId, labels: &RoleLabels) -> RepositoryResult<(Role, Role)> {
        let a = self.snapshot(a).await?;
        let b = self.snapshot(b).await?;
        self.link(a, b, labels).await
    }
}

#[cfg(test)]
mod tests {
    use partybook_core::{Entity, PageRequest};
    use partybook_parties::{Individual, IndividualName, Organisation};

    use super::*;
    use crate::repository::RepositoryError;

    async fn fixture() -> (RelationshipBuilder, Repositories, Organisation, Individual) {
        let repositories = Repositories::in_memory();
        let organisation = repositories
            .organisations
            .save(Organisation::new("Jacqui Lambie Network").with_contact("hey@lambienetwork.com.au", "(03) 6431 3112"))
            .await
            .unwrap();
        let individual = repositories
            .individuals
            .save(
                Individual::new(IndividualName::new("Glynn", "Williams"))
                    .with_contact("glynn.williams@lambienetwork.com.au", "(03) 6431 3112"),
            )
            .await
            .unwrap();
        (RelationshipBuilder::new(repositories.clone()), repositories, organisation, individual)
    }

    #[tokio::test]
    async fn link_writes_one_role_on_each_side() {
        let (builder, repositories, organisation, individual) = fixture().await;

        let (forward, reverse) = builder
            .link(organisation.snapshot(), individual.snapshot(), &RoleLabels::membership())
            .await
            .unwrap();

        let organisation = repositories.organisations.find_by_id(organisation.id()).await.unwrap();
        let individual = repositories.individuals.find_by_id(individual.id()).await.unwrap();
        assert_eq!(organisation.party.roles.len(), 1);
        assert_eq!(individual.party.roles.len(), 1);
        assert!(organisation.party.roles.contains(&forward.id));
        assert!(individual.party.roles.contains(&reverse.id));
        assert_eq!(forward.reciprocal, individual.snapshot());
        assert_eq!(reverse.reciprocal, organisation.snapshot());
    }

    #[tokio::test]
    async fn link_by_id_snapshots_current_records() {
        let (builder, _, organisation, individual) = fixture().await;

        let (forward, _) = builder
            .link_by_id(organisation.id(), individual.id(), &RoleLabels::membership())
            .await
            .unwrap();
        assert_eq!(forward.party.email, "hey@lambienetwork.com.au");
        assert_eq!(forward.reciprocal.name, "Williams, Glynn");
    }

    #[tokio::test]
    async fn link_to_unknown_party_is_not_found_and_writes_nothing() {
        let (builder, repositories, organisation, _) = fixture().await;

        let err = builder
            .link_by_id(organisation.id(), PartyId::new(999), &RoleLabels::membership())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(repositories.roles.find_all(PageRequest::default()).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn link_rejects_snapshot_with_wrong_type() {
        let (builder, _, organisation, individual) = fixture().await;
        let mut wrong = individual.snapshot();
        wrong.party_type = PartyType::Organisation;

        let err = builder
            .link(organisation.snapshot(), wrong, &RoleLabels::membership())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn link_rejects_self_link() {
        let (builder, _, organisation, _) = fixture().await;
        let err = builder
            .link(organisation.snapshot(), organisation.snapshot(), &RoleLabels::membership())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Domain(DomainError::InvariantViolation(_))));
    }
}
