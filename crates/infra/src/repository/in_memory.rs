//! In-memory store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use partybook_core::{DomainError, Entity, IdentifierId, LocationId, Page, PageRequest, PartyId, RoleId};
use partybook_parties::{Address, Identifier, Individual, Organisation, Party, Role, RolePair};

use super::{
    AddressRepository, IdentifierRepository, IndividualRepository, OrganisationRepository,
    PartyRepository, RelationshipRepository, RepositoryError, RepositoryResult, RoleRepository,
};

/// Actor recorded in location audit fields when the caller names none.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Default)]
struct State {
    /// One sequence for every generated id.
    last_id: i64,
    individuals: BTreeMap<PartyId, Individual>,
    organisations: BTreeMap<PartyId, Organisation>,
    addresses: BTreeMap<LocationId, Address>,
    roles: BTreeMap<RoleId, Role>,
    identifiers: BTreeMap<IdentifierId, Identifier>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn party(&self, id: PartyId) -> Option<&Party> {
        self.individuals
            .get(&id)
            .map(|i| &i.party)
            .or_else(|| self.organisations.get(&id).map(|o| &o.party))
    }

    fn party_mut(&mut self, id: PartyId) -> Option<&mut Party> {
        if let Some(individual) = self.individuals.get_mut(&id) {
            return Some(&mut individual.party);
        }
        self.organisations.get_mut(&id).map(|o| &mut o.party)
    }
}

/// Every repository over one lock-protected state.
///
/// Each operation takes the lock once, so multi-record writes such as
/// [`RelationshipRepository::save_pair`] are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| RepositoryError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| RepositoryError::Storage("in-memory store lock poisoned".to_string()))
    }
}

fn page_of<T: Clone>(items: impl Iterator<Item = T>, page: PageRequest) -> Page<T> {
    page.slice(items.collect())
}

#[async_trait]
impl IndividualRepository for InMemoryStore {
    async fn save(&self, mut individual: Individual) -> RepositoryResult<Individual> {
        individual.refresh_sort_key();
        individual.validate()?;

        let mut state = self.write()?;
        individual.set_id(PartyId::new(state.next_id()));
        individual.party.roles.clear();
        individual.party.addresses.clear();
        state.individuals.insert(individual.id(), individual.clone());
        Ok(individual)
    }

    async fn update(&self, mut individual: Individual) -> RepositoryResult<Individual> {
        individual.refresh_sort_key();
        individual.validate()?;

        let mut state = self.write()?;
        let existing = state
            .individuals
            .get(&individual.id())
            .ok_or(RepositoryError::NotFound)?;
        individual.party.roles = existing.party.roles.clone();
        individual.party.addresses = existing.party.addresses.clone();
        state.individuals.insert(individual.id(), individual.clone());
        Ok(individual)
    }

    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Individual> {
        self.read()?
            .individuals
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Individual>> {
        Ok(page_of(self.read()?.individuals.values().cloned(), page))
    }

    async fn find_by_family_name_starts_with(
        &self,
        prefix: &str,
        page: PageRequest,
    ) -> RepositoryResult<Page<Individual>> {
        let state = self.read()?;
        let mut matches: Vec<Individual> = state
            .individuals
            .values()
            .filter(|i| i.name.family_name.starts_with(prefix))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.sort.cmp(&b.sort).then_with(|| a.id().cmp(&b.id())));
        Ok(page.slice(matches))
    }
}

#[async_trait]
impl OrganisationRepository for InMemoryStore {
    async fn save(&self, mut organisation: Organisation) -> RepositoryResult<Organisation> {
        organisation.validate()?;

        let mut state = self.write()?;
        organisation.set_id(PartyId::new(state.next_id()));
        organisation.party.roles.clear();
        organisation.party.addresses.clear();
        state.organisations.insert(organisation.id(), organisation.clone());
        Ok(organisation)
    }

    async fn update(&self, mut organisation: Organisation) -> RepositoryResult<Organisation> {
        organisation.validate()?;

        let mut state = self.write()?;
        let existing = state
            .organisations
            .get(&organisation.id())
            .ok_or(RepositoryError::NotFound)?;
        organisation.party.roles = existing.party.roles.clone();
        organisation.party.addresses = existing.party.addresses.clone();
        state.organisations.insert(organisation.id(), organisation.clone());
        Ok(organisation)
    }

    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Organisation> {
        self.read()?
            .organisations
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Organisation>> {
        Ok(page_of(self.read()?.organisations.values().cloned(), page))
    }

    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Organisation>> {
        let state = self.read()?;
        Ok(page_of(
            state.organisations.values().filter(|o| o.name == name).cloned(),
            page,
        ))
    }
}

#[async_trait]
impl AddressRepository for InMemoryStore {
    async fn save(&self, mut address: Address) -> RepositoryResult<Address> {
        address.validate()?;

        let actor = address
            .location
            .created_by
            .clone()
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        address.location.stamp_created(&actor, Utc::now());

        let mut state = self.write()?;
        address.set_id(LocationId::new(state.next_id()));
        state.addresses.insert(address.id(), address.clone());
        Ok(address)
    }

    async fn find_by_id(&self, id: LocationId) -> RepositoryResult<Address> {
        self.read()?
            .addresses
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Address>> {
        Ok(page_of(self.read()?.addresses.values().cloned(), page))
    }

    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Address>> {
        let state = self.read()?;
        Ok(page_of(
            state.addresses.values().filter(|a| a.name == name).cloned(),
            page,
        ))
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_by_id(&self, id: RoleId) -> RepositoryResult<Role> {
        self.read()?
            .roles
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Role>> {
        Ok(page_of(self.read()?.roles.values().cloned(), page))
    }

    async fn find_by_party_id(&self, party_id: PartyId, page: PageRequest) -> RepositoryResult<Page<Role>> {
        let state = self.read()?;
        Ok(page_of(
            state.roles.values().filter(|r| r.owner() == party_id).cloned(),
            page,
        ))
    }
}

#[async_trait]
impl RelationshipRepository for InMemoryStore {
    async fn save_pair(&self, pair: RolePair) -> RepositoryResult<(Role, Role)> {
        if !pair.is_consistent() {
            return Err(DomainError::invariant("roles are not reciprocal").into());
        }
        let (mut forward, mut reverse) = pair.into_roles();

        let mut state = self.write()?;

        // Check both owners before touching anything.
        for role in [&forward, &reverse] {
            let party = state.party(role.owner()).ok_or(RepositoryError::NotFound)?;
            if party.party_type != role.party.party_type {
                return Err(DomainError::invariant(format!(
                    "party {} is {}, role says {}",
                    party.id, party.party_type, role.party.party_type
                ))
                .into());
            }
        }

        forward.set_id(RoleId::new(state.next_id()));
        reverse.set_id(RoleId::new(state.next_id()));

        for role in [&forward, &reverse] {
            state
                .party_mut(role.owner())
                .ok_or(RepositoryError::NotFound)?
                .roles
                .insert(role.id);
            state.roles.insert(role.id, role.clone());
        }

        Ok((forward, reverse))
    }
}

#[async_trait]
impl IdentifierRepository for InMemoryStore {
    async fn save(&self, mut identifier: Identifier) -> RepositoryResult<Identifier> {
        identifier.validate()?;

        let mut state = self.write()?;
        identifier.set_id(IdentifierId::new(state.next_id()));
        state.identifiers.insert(identifier.id(), identifier.clone());
        Ok(identifier)
    }

    async fn find_by_id(&self, id: IdentifierId) -> RepositoryResult<Identifier> {
        self.read()?
            .identifiers
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Identifier>> {
        Ok(page_of(self.read()?.identifiers.values().cloned(), page))
    }
}

#[async_trait]
impl PartyRepository for InMemoryStore {
    async fn find_party(&self, id: PartyId) -> RepositoryResult<Party> {
        self.read()?.party(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn attach_address(&self, party_id: PartyId, location_id: LocationId) -> RepositoryResult<()> {
        let mut state = self.write()?;
        if !state.addresses.contains_key(&location_id) {
            return Err(RepositoryError::NotFound);
        }
        state
            .party_mut(party_id)
            .ok_or(RepositoryError::NotFound)?
            .addresses
            .insert(location_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use partybook_parties::{IndividualName, Location, LocationType, RoleLabels};

    use super::*;
    use crate::repository::Repositories;

    fn repos() -> Repositories {
        Repositories::from_store(Arc::new(InMemoryStore::new()))
    }

    fn person(given: &str, family: &str) -> Individual {
        Individual::new(IndividualName::new(given, family))
    }

    fn senate() -> Address {
        Address {
            location: Location::new(LocationType::Address, "Parliament House Canberra ACT 2600"),
            name: "The Senate".to_string(),
            line1: "Parliament House".to_string(),
            city: "Canberra".to_string(),
            state: "ACT".to_string(),
            postal_code: "2600".to_string(),
            country: "Australia".to_string(),
            ..Address::default()
        }
    }

    #[tokio::test]
    async fn save_assigns_fresh_ids_without_dedup() {
        let repos = repos();
        let a = repos.individuals.save(person("Rod", "Miles")).await.unwrap();
        let b = repos.individuals.save(person("Rod", "Miles")).await.unwrap();
        assert!(a.id().is_assigned());
        assert_ne!(a.id(), b.id());
        assert_eq!(repos.individuals.find_all(PageRequest::default()).await.unwrap().total_elements, 2);
    }

    #[tokio::test]
    async fn save_ignores_submitted_associations() {
        let repos = repos();
        let mut individual = person("Rod", "Miles");
        individual.party.roles.insert(RoleId::new(99));
        let saved = repos.individuals.save(individual).await.unwrap();
        assert!(saved.party.roles.is_empty());
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let repos = repos();
        let err = repos.individuals.find_by_id(PartyId::new(404)).await.unwrap_err();
        assert!(err.is_not_found());
        let err = repos.roles.find_by_id(RoleId::new(404)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn prefix_search_is_case_sensitive_and_sorted() {
        let repos = repos();
        for (given, family) in [("Anne", "Millar"), ("Rod", "Miles"), ("Bob", "mills"), ("Cat", "Smith"), ("Dan", "Milburn")] {
            repos.individuals.save(person(given, family)).await.unwrap();
        }

        let page = repos
            .individuals
            .find_by_family_name_starts_with("Mil", PageRequest::default())
            .await
            .unwrap();
        let names: Vec<_> = page.content.iter().map(|i| i.name.family_name.as_str()).collect();
        assert_eq!(names, vec!["Milburn", "Miles", "Millar"]);
        assert_eq!(page.total_elements, 3);
    }

    #[tokio::test]
    async fn prefix_search_orders_by_code_point() {
        let repos = repos();
        for (given, family) in [("Ann", "Mcdonald"), ("Ben", "McEwen"), ("Col", "McDonald")] {
            repos.individuals.save(person(given, family)).await.unwrap();
        }

        let page = repos
            .individuals
            .find_by_family_name_starts_with("Mc", PageRequest::default())
            .await
            .unwrap();
        let names: Vec<_> = page.content.iter().map(|i| i.name.family_name.as_str()).collect();
        assert_eq!(names, vec!["McDonald", "McEwen", "Mcdonald"]);
    }

    #[tokio::test]
    async fn update_replaces_record_but_keeps_associations() {
        let repos = repos();
        let saved = repos.individuals.save(person("Rod", "Miles")).await.unwrap();
        let address = repos.addresses.save(senate()).await.unwrap();
        repos.parties.attach_address(saved.id(), address.id()).await.unwrap();

        let mut changed = saved.clone();
        changed.name.family_name = "Mills".to_string();
        changed.party.addresses.clear();
        let updated = repos.individuals.update(changed).await.unwrap();

        assert_eq!(updated.sort, "Mills");
        assert!(updated.party.addresses.contains(&address.id()));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let repos = repos();
        let mut ghost = person("No", "Body");
        ghost.set_id(PartyId::new(12));
        assert!(repos.individuals.update(ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn address_save_stamps_audit_fields() {
        let repos = repos();
        let saved = repos.addresses.save(senate()).await.unwrap();
        assert_eq!(saved.location.created_by.as_deref(), Some(SYSTEM_ACTOR));
        assert!(saved.location.created_at.is_some());
        let found = repos
            .addresses
            .find_by_name("The Senate", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(found.content, vec![saved]);
    }

    #[tokio::test]
    async fn save_pair_attaches_both_sides() {
        let repos = repos();
        let org = repos.organisations.save(Organisation::new("Jacqui Lambie Network")).await.unwrap();
        let member = repos.individuals.save(person("Glynn", "Williams")).await.unwrap();

        let pair = RolePair::between(org.snapshot(), member.snapshot(), &RoleLabels::membership()).unwrap();
        let (forward, reverse) = repos.relationships.save_pair(pair).await.unwrap();

        let org = repos.organisations.find_by_id(org.id()).await.unwrap();
        let member = repos.individuals.find_by_id(member.id()).await.unwrap();
        assert_eq!(org.party.roles.iter().copied().collect::<Vec<_>>(), vec![forward.id]);
        assert_eq!(member.party.roles.iter().copied().collect::<Vec<_>>(), vec![reverse.id]);
        assert!(forward.is_reciprocal_of(&reverse));
    }

    #[tokio::test]
    async fn organisation_name_search_is_exact() {
        let repos = repos();
        let jln = repos.organisations.save(Organisation::new("Jacqui Lambie Network")).await.unwrap();
        repos.organisations.save(Organisation::new("Jacqui Lambie")).await.unwrap();

        let found = repos
            .organisations
            .find_by_name("Jacqui Lambie Network", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(found.content, vec![jln]);
    }

    #[tokio::test]
    async fn roles_are_found_by_owning_party() {
        let repos = repos();
        let org = repos.organisations.save(Organisation::new("Jacqui Lambie Network")).await.unwrap();
        let member = repos.individuals.save(person("Glynn", "Williams")).await.unwrap();
        let pair = RolePair::between(org.snapshot(), member.snapshot(), &RoleLabels::membership()).unwrap();
        let (_, reverse) = repos.relationships.save_pair(pair).await.unwrap();

        let page = repos
            .roles
            .find_by_party_id(member.id(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.content, vec![reverse]);
        assert_eq!(page.content[0].reciprocal.party_id, org.id());
    }

    #[tokio::test]
    async fn save_pair_with_missing_party_writes_nothing() {
        let repos = repos();
        let org = repos.organisations.save(Organisation::new("Centre Alliance")).await.unwrap();
        let mut ghost = person("No", "Body");
        ghost.set_id(PartyId::new(500));

        let pair = RolePair::between(org.snapshot(), ghost.snapshot(), &RoleLabels::membership()).unwrap();
        assert!(repos.relationships.save_pair(pair).await.unwrap_err().is_not_found());

        let org = repos.organisations.find_by_id(org.id()).await.unwrap();
        assert!(org.party.roles.is_empty());
        assert_eq!(repos.roles.find_all(PageRequest::default()).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn save_pair_rejects_mismatched_party_type() {
        let repos = repos();
        let org = repos.organisations.save(Organisation::new("Centre Alliance")).await.unwrap();
        let member = repos.individuals.save(person("Rebekha", "Sharkie")).await.unwrap();

        let mut wrong = member.snapshot();
        wrong.party_type = partybook_parties::PartyType::Organisation;
        let pair = RolePair::between(org.snapshot(), wrong, &RoleLabels::membership()).unwrap();
        let err = repos.relationships.save_pair(pair).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn attach_address_requires_existing_address() {
        let repos = repos();
        let member = repos.individuals.save(person("Rod", "Miles")).await.unwrap();
        let err = repos
            .parties
            .attach_address(member.id(), LocationId::new(77))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn identifiers_are_validated() {
        let repos = repos();
        let bad = Identifier::new(partybook_parties::IdentifierType::Abn, "123");
        assert!(matches!(
            repos.identifiers.save(bad).await.unwrap_err(),
            RepositoryError::Domain(DomainError::Validation(_))
        ));
    }
}
