//! Repository contracts and their store implementations.
//!
//! One trait per entity, each a small CRUD surface plus the explicit queries
//! the API and seed loaders need. Every query returns a [`Page`] ordered by
//! a declared key so paging is stable.
//!
//! Associations owned by a party (its role set and address set) are never
//! taken from a saved payload: `save` starts with empty sets, `update` keeps
//! the stored ones, and they only change through
//! [`RelationshipRepository::save_pair`] and [`PartyRepository::attach_address`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use partybook_core::{DomainError, IdentifierId, LocationId, Page, PageRequest, PartyId, RoleId};
use partybook_parties::{Address, Identifier, Individual, Organisation, Party, Role, RolePair};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Result type used by every repository.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No record with the requested id.
    #[error("not found")]
    NotFound,

    /// The record was rejected by a domain rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing store failed (connection, constraint, poisoned lock, ...).
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound)
    }
}

#[async_trait]
pub trait IndividualRepository: Send + Sync {
    /// Insert under a fresh id. Never deduplicates.
    async fn save(&self, individual: Individual) -> RepositoryResult<Individual>;

    /// Replace the record with the same id; `NotFound` if there is none.
    async fn update(&self, individual: Individual) -> RepositoryResult<Individual>;

    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Individual>;

    /// All individuals, ordered by id.
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Individual>>;

    /// Individuals whose family name starts with `prefix` (case-sensitive),
    /// ordered by the sort column then id.
    async fn find_by_family_name_starts_with(
        &self,
        prefix: &str,
        page: PageRequest,
    ) -> RepositoryResult<Page<Individual>>;
}

#[async_trait]
pub trait OrganisationRepository: Send + Sync {
    async fn save(&self, organisation: Organisation) -> RepositoryResult<Organisation>;

    async fn update(&self, organisation: Organisation) -> RepositoryResult<Organisation>;

    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Organisation>;

    /// All organisations, ordered by id.
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Organisation>>;

    /// Organisations with exactly this name, ordered by id.
    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Organisation>>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Insert the address and its location under one fresh id, stamping
    /// the location's audit fields.
    async fn save(&self, address: Address) -> RepositoryResult<Address>;

    async fn find_by_id(&self, id: LocationId) -> RepositoryResult<Address>;

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Address>>;

    /// Addresses with exactly this name, ordered by id.
    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Address>>;
}

/// Read side of role records. Roles are only ever written in pairs.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: RoleId) -> RepositoryResult<Role>;

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Role>>;

    /// Roles owned by `party_id`, ordered by id.
    async fn find_by_party_id(&self, party_id: PartyId, page: PageRequest) -> RepositoryResult<Page<Role>>;
}

#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Persist both roles and attach each to its owning party as one unit.
    ///
    /// Either both roles exist afterwards, each in its owner's role set,
    /// or nothing changed.
    async fn save_pair(&self, pair: RolePair) -> RepositoryResult<(Role, Role)>;
}

#[async_trait]
pub trait IdentifierRepository: Send + Sync {
    async fn save(&self, identifier: Identifier) -> RepositoryResult<Identifier>;

    async fn find_by_id(&self, id: IdentifierId) -> RepositoryResult<Identifier>;

    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Identifier>>;
}

#[async_trait]
pub trait PartyRepository: Send + Sync {
    /// The party core of an individual or organisation.
    async fn find_party(&self, id: PartyId) -> RepositoryResult<Party>;

    /// Add an address to a party's address set (no-op if already present).
    async fn attach_address(&self, party_id: PartyId, location_id: LocationId) -> RepositoryResult<()>;
}

/// Every repository a store provides.
pub trait Store:
    IndividualRepository
    + OrganisationRepository
    + AddressRepository
    + RoleRepository
    + RelationshipRepository
    + IdentifierRepository
    + PartyRepository
{
}

impl<T> Store for T where
    T: IndividualRepository
        + OrganisationRepository
        + AddressRepository
        + RoleRepository
        + RelationshipRepository
        + IdentifierRepository
        + PartyRepository
{
}

/// Repository handles shared by the API and the seed loaders.
#[derive(Clone)]
pub struct Repositories {
    pub individuals: Arc<dyn IndividualRepository>,
    pub organisations: Arc<dyn OrganisationRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub relationships: Arc<dyn RelationshipRepository>,
    pub identifiers: Arc<dyn IdentifierRepository>,
    pub parties: Arc<dyn PartyRepository>,
}

impl Repositories {
    /// Expose one store through every repository handle.
    pub fn from_store<S: Store + 'static>(store: Arc<S>) -> Self {
        Self {
            individuals: store.clone(),
            organisations: store.clone(),
            addresses: store.clone(),
            roles: store.clone(),
            relationships: store.clone(),
            identifiers: store.clone(),
            parties: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }
}

impl core::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
