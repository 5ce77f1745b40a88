//! Postgres-backed store.
//!
//! All repositories share one pool and one id sequence (`partybook_id_seq`).
//! Multi-table writes (a party plus its individual/organisation row, a
//! location plus its address row, a role pair plus both association rows)
//! run in a single transaction. Dropping an uncommitted transaction rolls it
//! back, so an early `?` return never leaves half a record behind.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` |
//! | RowNotFound | N/A | `NotFound` |
//! | Anything else | Any other | `Storage` |

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use partybook_core::{DomainError, Entity, IdentifierId, LocationId, Page, PageRequest, PartyId, RoleId};
use partybook_parties::{
    Address, Identifier, Individual, IndividualName, Location, Organisation, Party, PartySnapshot,
    PartyType, Role, RolePair,
};

use super::in_memory::SYSTEM_ACTOR;
use super::{
    AddressRepository, IdentifierRepository, IndividualRepository, OrganisationRepository,
    PartyRepository, RelationshipRepository, RepositoryError, RepositoryResult, RoleRepository,
};

const SCHEMA: &str = include_str!("../../migrations/0001_parties.sql");

const INDIVIDUAL_SELECT: &str = r#"
    SELECT
        p.id, p.display_name,
        i.title, i.given_name, i.middle_name, i.family_name, i.honorific,
        i.salutation, i.preferred_name, i.initials, i.sort,
        i.sex, i.gender, i.email, i.phone_number, i.photo_url, i.electorate,
        i.date_of_birth, i.place_of_birth, i.country_of_birth,
        i.date_of_death, i.place_of_death, i.country_of_death,
        i.relationship_lifecycle_status
    FROM individual i
    JOIN party p ON p.id = i.id
"#;

const ORGANISATION_SELECT: &str = r#"
    SELECT p.id, p.display_name, o.name, o.legal_type, o.email, o.phone_number
    FROM organisation o
    JOIN party p ON p.id = o.id
"#;

const ADDRESS_SELECT: &str = r#"
    SELECT
        l.id, l.location_type, l.display_name, l.from_date, l.to_date,
        l.created_by, l.created_at, l.updated_by, l.updated_at,
        a.name, a.line1, a.line2, a.city, a.state, a.postal_code, a.country, a.address_type
    FROM address a
    JOIN location l ON l.id = a.id
"#;

const ROLE_SELECT: &str = r#"
    SELECT
        id, role, relationship, reciprocal_role,
        party_id, party_type, party_name, party_email, party_phone_number,
        reciprocal_party_id, reciprocal_party_type, reciprocal_name,
        reciprocal_email, reciprocal_phone_number
    FROM role
"#;

/// Byte order on the sort key, matching `str` ordering in the in-memory store
/// whatever the database's default collation.
const INDIVIDUAL_SORT_ORDER: &str = r#"ORDER BY i.sort COLLATE "C", i.id"#;

const IDENTIFIER_SELECT: &str = r#"
    SELECT id, identifier_type, value, register, lifecycle_status, from_date, to_date
    FROM identifier
"#;

/// Store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn load_associations(&self, party_ids: Vec<i64>) -> RepositoryResult<Associations> {
        let mut associations = Associations::default();
        if party_ids.is_empty() {
            return Ok(associations);
        }

        let rows = sqlx::query("SELECT party_id, role_id FROM party_role WHERE party_id = ANY($1)")
            .bind(&party_ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_party_roles", e))?;
        for row in rows {
            let party_id: i64 = row.try_get("party_id").map_err(|e| map_sqlx_error("decode_party_role", e))?;
            let role_id: i64 = row.try_get("role_id").map_err(|e| map_sqlx_error("decode_party_role", e))?;
            associations.roles.entry(party_id).or_default().insert(RoleId::new(role_id));
        }

        let rows = sqlx::query("SELECT party_id, location_id FROM party_address WHERE party_id = ANY($1)")
            .bind(&party_ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_party_addresses", e))?;
        for row in rows {
            let party_id: i64 = row.try_get("party_id").map_err(|e| map_sqlx_error("decode_party_address", e))?;
            let location_id: i64 =
                row.try_get("location_id").map_err(|e| map_sqlx_error("decode_party_address", e))?;
            associations
                .addresses
                .entry(party_id)
                .or_default()
                .insert(LocationId::new(location_id));
        }

        Ok(associations)
    }

    async fn count(&self, operation: &str, sql: &str) -> RepositoryResult<u64> {
        let total: i64 = sqlx::query_scalar(sql)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(total.max(0) as u64)
    }

    async fn individuals_page(&self, rows: Vec<PgRow>, page: PageRequest, total: u64) -> RepositoryResult<Page<Individual>> {
        let mut content = rows
            .iter()
            .map(individual_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_individual", e))?;
        let mut associations = self.load_associations(content.iter().map(|i| i.id().get()).collect()).await?;
        for individual in &mut content {
            associations.apply(&mut individual.party);
        }
        Ok(Page::new(content, page, total))
    }

    async fn organisations_page(
        &self,
        rows: Vec<PgRow>,
        page: PageRequest,
        total: u64,
    ) -> RepositoryResult<Page<Organisation>> {
        let mut content = rows
            .iter()
            .map(organisation_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_organisation", e))?;
        let mut associations = self.load_associations(content.iter().map(|o| o.id().get()).collect()).await?;
        for organisation in &mut content {
            associations.apply(&mut organisation.party);
        }
        Ok(Page::new(content, page, total))
    }

    async fn begin(&self) -> RepositoryResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[derive(Debug, Default)]
struct Associations {
    roles: HashMap<i64, BTreeSet<RoleId>>,
    addresses: HashMap<i64, BTreeSet<LocationId>>,
}

impl Associations {
    fn apply(&mut self, party: &mut Party) {
        party.roles = self.roles.remove(&party.id.get()).unwrap_or_default();
        party.addresses = self.addresses.remove(&party.id.get()).unwrap_or_default();
    }
}

async fn next_id(tx: &mut Transaction<'static, Postgres>) -> RepositoryResult<i64> {
    sqlx::query_scalar("SELECT nextval('partybook_id_seq')")
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("next_id", e))
}

async fn commit(tx: Transaction<'static, Postgres>) -> RepositoryResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (i64::from(page.size), page.offset() as i64)
}

#[async_trait]
impl IndividualRepository for PostgresStore {
    #[instrument(
        skip(self, individual),
        fields(family_name = %individual.name.family_name, party_id = tracing::field::Empty),
        err
    )]
    async fn save(&self, mut individual: Individual) -> RepositoryResult<Individual> {
        individual.refresh_sort_key();
        individual.validate()?;
        individual.party.roles.clear();
        individual.party.addresses.clear();

        let mut tx = self.begin().await?;
        let id = next_id(&mut tx).await?;
        individual.set_id(PartyId::new(id));

        sqlx::query("INSERT INTO party (id, party_type, display_name) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(PartyType::Individual.as_str())
            .bind(&individual.party.display_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_party", e))?;

        sqlx::query(
            r#"
            INSERT INTO individual (
                id, title, given_name, middle_name, family_name, honorific,
                salutation, preferred_name, initials, sort,
                sex, gender, email, phone_number, photo_url, electorate,
                date_of_birth, place_of_birth, country_of_birth,
                date_of_death, place_of_death, country_of_death,
                relationship_lifecycle_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(id)
        .bind(&individual.name.title)
        .bind(&individual.name.given_name)
        .bind(&individual.name.middle_name)
        .bind(&individual.name.family_name)
        .bind(&individual.name.honorific)
        .bind(&individual.name.salutation)
        .bind(&individual.name.preferred_name)
        .bind(&individual.name.initials)
        .bind(&individual.sort)
        .bind(&individual.sex)
        .bind(&individual.gender)
        .bind(&individual.email)
        .bind(&individual.phone_number)
        .bind(&individual.photo_url)
        .bind(&individual.electorate)
        .bind(individual.date_of_birth)
        .bind(&individual.place_of_birth)
        .bind(&individual.country_of_birth)
        .bind(individual.date_of_death)
        .bind(&individual.place_of_death)
        .bind(&individual.country_of_death)
        .bind(&individual.relationship_lifecycle_status)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_individual", e))?;

        commit(tx).await?;
        Span::current().record("party_id", id);
        Ok(individual)
    }

    #[instrument(skip(self, individual), fields(party_id = %individual.id()), err)]
    async fn update(&self, mut individual: Individual) -> RepositoryResult<Individual> {
        individual.refresh_sort_key();
        individual.validate()?;
        let id = individual.id().get();

        let mut tx = self.begin().await?;
        let updated = sqlx::query("UPDATE party SET display_name = $2 WHERE id = $1 AND party_type = $3")
            .bind(id)
            .bind(&individual.party.display_name)
            .bind(PartyType::Individual.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_party", e))?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE individual SET
                title = $2, given_name = $3, middle_name = $4, family_name = $5,
                honorific = $6, salutation = $7, preferred_name = $8, initials = $9,
                sort = $10, sex = $11, gender = $12, email = $13, phone_number = $14,
                photo_url = $15, electorate = $16, date_of_birth = $17,
                place_of_birth = $18, country_of_birth = $19, date_of_death = $20,
                place_of_death = $21, country_of_death = $22,
                relationship_lifecycle_status = $23
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&individual.name.title)
        .bind(&individual.name.given_name)
        .bind(&individual.name.middle_name)
        .bind(&individual.name.family_name)
        .bind(&individual.name.honorific)
        .bind(&individual.name.salutation)
        .bind(&individual.name.preferred_name)
        .bind(&individual.name.initials)
        .bind(&individual.sort)
        .bind(&individual.sex)
        .bind(&individual.gender)
        .bind(&individual.email)
        .bind(&individual.phone_number)
        .bind(&individual.photo_url)
        .bind(&individual.electorate)
        .bind(individual.date_of_birth)
        .bind(&individual.place_of_birth)
        .bind(&individual.country_of_birth)
        .bind(individual.date_of_death)
        .bind(&individual.place_of_death)
        .bind(&individual.country_of_death)
        .bind(&individual.relationship_lifecycle_status)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_individual", e))?;

        commit(tx).await?;

        let mut associations = self.load_associations(vec![id]).await?;
        associations.apply(&mut individual.party);
        Ok(individual)
    }

    #[instrument(skip(self), fields(party_id = %id), err)]
    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Individual> {
        let sql = format!("{INDIVIDUAL_SELECT} WHERE i.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_individual", e))?
            .ok_or(RepositoryError::NotFound)?;

        let mut page = self.individuals_page(vec![row], PageRequest::default(), 1).await?;
        page.content.pop().ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Individual>> {
        let total = self.count("count_individuals", "SELECT COUNT(*) FROM individual").await?;
        let (limit, offset) = limit_offset(page);
        let sql = format!("{INDIVIDUAL_SELECT} ORDER BY i.id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_individuals", e))?;
        self.individuals_page(rows, page, total).await
    }

    #[instrument(skip(self), err)]
    async fn find_by_family_name_starts_with(
        &self,
        prefix: &str,
        page: PageRequest,
    ) -> RepositoryResult<Page<Individual>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM individual WHERE starts_with(family_name, $1)")
            .bind(prefix)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_individuals_by_prefix", e))?;

        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "{INDIVIDUAL_SELECT} WHERE starts_with(i.family_name, $1) {INDIVIDUAL_SORT_ORDER} LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(prefix)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_individuals", e))?;
        self.individuals_page(rows, page, total.max(0) as u64).await
    }
}

#[async_trait]
impl OrganisationRepository for PostgresStore {
    #[instrument(skip(self, organisation), fields(name = %organisation.name), err)]
    async fn save(&self, mut organisation: Organisation) -> RepositoryResult<Organisation> {
        organisation.validate()?;
        organisation.party.roles.clear();
        organisation.party.addresses.clear();

        let mut tx = self.begin().await?;
        let id = next_id(&mut tx).await?;
        organisation.set_id(PartyId::new(id));

        sqlx::query("INSERT INTO party (id, party_type, display_name) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(PartyType::Organisation.as_str())
            .bind(&organisation.party.display_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_party", e))?;

        sqlx::query(
            "INSERT INTO organisation (id, name, legal_type, email, phone_number) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&organisation.name)
        .bind(organisation.legal_type.map(|t| t.as_str()))
        .bind(&organisation.email)
        .bind(&organisation.phone_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_organisation", e))?;

        commit(tx).await?;
        Ok(organisation)
    }

    #[instrument(skip(self, organisation), fields(party_id = %organisation.id()), err)]
    async fn update(&self, mut organisation: Organisation) -> RepositoryResult<Organisation> {
        organisation.validate()?;
        let id = organisation.id().get();

        let mut tx = self.begin().await?;
        let updated = sqlx::query("UPDATE party SET display_name = $2 WHERE id = $1 AND party_type = $3")
            .bind(id)
            .bind(&organisation.party.display_name)
            .bind(PartyType::Organisation.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_party", e))?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE organisation SET name = $2, legal_type = $3, email = $4, phone_number = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&organisation.name)
        .bind(organisation.legal_type.map(|t| t.as_str()))
        .bind(&organisation.email)
        .bind(&organisation.phone_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_organisation", e))?;

        commit(tx).await?;

        let mut associations = self.load_associations(vec![id]).await?;
        associations.apply(&mut organisation.party);
        Ok(organisation)
    }

    #[instrument(skip(self), fields(party_id = %id), err)]
    async fn find_by_id(&self, id: PartyId) -> RepositoryResult<Organisation> {
        let sql = format!("{ORGANISATION_SELECT} WHERE o.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_organisation", e))?
            .ok_or(RepositoryError::NotFound)?;

        let mut page = self.organisations_page(vec![row], PageRequest::default(), 1).await?;
        page.content.pop().ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Organisation>> {
        let total = self.count("count_organisations", "SELECT COUNT(*) FROM organisation").await?;
        let (limit, offset) = limit_offset(page);
        let sql = format!("{ORGANISATION_SELECT} ORDER BY o.id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_organisations", e))?;
        self.organisations_page(rows, page, total).await
    }

    #[instrument(skip(self), err)]
    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Organisation>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organisation WHERE name = $1")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_organisations_by_name", e))?;

        let (limit, offset) = limit_offset(page);
        let sql = format!("{ORGANISATION_SELECT} WHERE o.name = $1 ORDER BY o.id LIMIT $2 OFFSET $3");
        let rows = sqlx::query(&sql)
            .bind(name)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_organisations", e))?;
        self.organisations_page(rows, page, total.max(0) as u64).await
    }
}

#[async_trait]
impl AddressRepository for PostgresStore {
    #[instrument(skip(self, address), fields(name = %address.name), err)]
    async fn save(&self, mut address: Address) -> RepositoryResult<Address> {
        address.validate()?;
        let actor = address
            .location
            .created_by
            .clone()
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        address.location.stamp_created(&actor, Utc::now());

        let mut tx = self.begin().await?;
        let id = next_id(&mut tx).await?;
        address.set_id(LocationId::new(id));

        let location = &address.location;
        sqlx::query(
            r#"
            INSERT INTO location (
                id, location_type, display_name, from_date, to_date,
                created_by, created_at, updated_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(location.location_type.as_str())
        .bind(&location.display_name)
        .bind(location.from_date)
        .bind(location.to_date)
        .bind(&location.created_by)
        .bind(location.created_at)
        .bind(&location.updated_by)
        .bind(location.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_location", e))?;

        sqlx::query(
            r#"
            INSERT INTO address (id, name, line1, line2, city, state, postal_code, country, address_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&address.name)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&address.address_type)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_address", e))?;

        commit(tx).await?;
        Ok(address)
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn find_by_id(&self, id: LocationId) -> RepositoryResult<Address> {
        let sql = format!("{ADDRESS_SELECT} WHERE a.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_address", e))?
            .ok_or(RepositoryError::NotFound)?;
        address_from_row(&row).map_err(|e| map_sqlx_error("decode_address", e))
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Address>> {
        let total = self.count("count_addresses", "SELECT COUNT(*) FROM address").await?;
        let (limit, offset) = limit_offset(page);
        let sql = format!("{ADDRESS_SELECT} ORDER BY a.id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_addresses", e))?;
        let content = rows
            .iter()
            .map(address_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_address", e))?;
        Ok(Page::new(content, page, total))
    }

    #[instrument(skip(self), err)]
    async fn find_by_name(&self, name: &str, page: PageRequest) -> RepositoryResult<Page<Address>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM address WHERE name = $1")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_addresses_by_name", e))?;

        let (limit, offset) = limit_offset(page);
        let sql = format!("{ADDRESS_SELECT} WHERE a.name = $1 ORDER BY a.id LIMIT $2 OFFSET $3");
        let rows = sqlx::query(&sql)
            .bind(name)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_addresses", e))?;
        let content = rows
            .iter()
            .map(address_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_address", e))?;
        Ok(Page::new(content, page, total.max(0) as u64))
    }
}

#[async_trait]
impl RoleRepository for PostgresStore {
    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn find_by_id(&self, id: RoleId) -> RepositoryResult<Role> {
        let sql = format!("{ROLE_SELECT} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?
            .ok_or(RepositoryError::NotFound)?;
        role_from_row(&row).map_err(|e| map_sqlx_error("decode_role", e))
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Role>> {
        let total = self.count("count_roles", "SELECT COUNT(*) FROM role").await?;
        let (limit, offset) = limit_offset(page);
        let sql = format!("{ROLE_SELECT} ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        let content = rows
            .iter()
            .map(role_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_role", e))?;
        Ok(Page::new(content, page, total))
    }

    #[instrument(skip(self), fields(party_id = %party_id), err)]
    async fn find_by_party_id(&self, party_id: PartyId, page: PageRequest) -> RepositoryResult<Page<Role>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM role WHERE party_id = $1")
            .bind(party_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_roles_by_party", e))?;

        let (limit, offset) = limit_offset(page);
        let sql = format!("{ROLE_SELECT} WHERE party_id = $1 ORDER BY id LIMIT $2 OFFSET $3");
        let rows = sqlx::query(&sql)
            .bind(party_id.get())
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_roles", e))?;
        let content = rows
            .iter()
            .map(role_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_role", e))?;
        Ok(Page::new(content, page, total.max(0) as u64))
    }
}

#[async_trait]
impl RelationshipRepository for PostgresStore {
    #[instrument(
        skip(self, pair),
        fields(
            party_id = %pair.forward.owner(),
            reciprocal_party_id = %pair.reverse.owner()
        ),
        err
    )]
    async fn save_pair(&self, pair: RolePair) -> RepositoryResult<(Role, Role)> {
        if !pair.is_consistent() {
            return Err(DomainError::invariant("roles are not reciprocal").into());
        }
        let (mut forward, mut reverse) = pair.into_roles();

        let mut tx = self.begin().await?;

        for role in [&forward, &reverse] {
            // Lock both owners so a concurrent pair on the same parties queues.
            let stored: Option<String> = sqlx::query_scalar("SELECT party_type FROM party WHERE id = $1 FOR UPDATE")
                .bind(role.owner().get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lock_party", e))?;
            let stored = stored.ok_or(RepositoryError::NotFound)?;
            if stored != role.party.party_type.as_str() {
                return Err(DomainError::invariant(format!(
                    "party {} is {stored}, role says {}",
                    role.owner(),
                    role.party.party_type
                ))
                .into());
            }
        }

        forward.set_id(RoleId::new(next_id(&mut tx).await?));
        reverse.set_id(RoleId::new(next_id(&mut tx).await?));

        for role in [&forward, &reverse] {
            sqlx::query(
                r#"
                INSERT INTO role (
                    id, role, relationship, reciprocal_role,
                    party_id, party_type, party_name, party_email, party_phone_number,
                    reciprocal_party_id, reciprocal_party_type, reciprocal_name,
                    reciprocal_email, reciprocal_phone_number
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(role.id.get())
            .bind(&role.role)
            .bind(&role.relationship)
            .bind(&role.reciprocal_role)
            .bind(role.party.party_id.get())
            .bind(role.party.party_type.as_str())
            .bind(&role.party.name)
            .bind(&role.party.email)
            .bind(&role.party.phone_number)
            .bind(role.reciprocal.party_id.get())
            .bind(role.reciprocal.party_type.as_str())
            .bind(&role.reciprocal.name)
            .bind(&role.reciprocal.email)
            .bind(&role.reciprocal.phone_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;

            sqlx::query("INSERT INTO party_role (party_id, role_id) VALUES ($1, $2)")
                .bind(role.owner().get())
                .bind(role.id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_party_role", e))?;
        }

        commit(tx).await?;
        Ok((forward, reverse))
    }
}

#[async_trait]
impl IdentifierRepository for PostgresStore {
    #[instrument(skip(self, identifier), fields(identifier_type = identifier.identifier_type.code()), err)]
    async fn save(&self, mut identifier: Identifier) -> RepositoryResult<Identifier> {
        identifier.validate()?;

        let mut tx = self.begin().await?;
        let id = next_id(&mut tx).await?;
        identifier.set_id(IdentifierId::new(id));

        sqlx::query(
            r#"
            INSERT INTO identifier (id, identifier_type, value, register, lifecycle_status, from_date, to_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(identifier.identifier_type.code())
        .bind(&identifier.value)
        .bind(&identifier.register)
        .bind(identifier.lifecycle_status.as_str())
        .bind(identifier.from_date)
        .bind(identifier.to_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_identifier", e))?;

        commit(tx).await?;
        Ok(identifier)
    }

    #[instrument(skip(self), fields(identifier_id = %id), err)]
    async fn find_by_id(&self, id: IdentifierId) -> RepositoryResult<Identifier> {
        let sql = format!("{IDENTIFIER_SELECT} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_identifier", e))?
            .ok_or(RepositoryError::NotFound)?;
        identifier_from_row(&row).map_err(|e| map_sqlx_error("decode_identifier", e))
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self, page: PageRequest) -> RepositoryResult<Page<Identifier>> {
        let total = self.count("count_identifiers", "SELECT COUNT(*) FROM identifier").await?;
        let (limit, offset) = limit_offset(page);
        let sql = format!("{IDENTIFIER_SELECT} ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_identifiers", e))?;
        let content = rows
            .iter()
            .map(identifier_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_identifier", e))?;
        Ok(Page::new(content, page, total))
    }
}

#[async_trait]
impl PartyRepository for PostgresStore {
    #[instrument(skip(self), fields(party_id = %id), err)]
    async fn find_party(&self, id: PartyId) -> RepositoryResult<Party> {
        let row = sqlx::query("SELECT id, party_type, display_name FROM party WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_party", e))?
            .ok_or(RepositoryError::NotFound)?;

        let mut party = party_from_row(&row).map_err(|e| map_sqlx_error("decode_party", e))?;
        let mut associations = self.load_associations(vec![id.get()]).await?;
        associations.apply(&mut party);
        Ok(party)
    }

    #[instrument(skip(self), fields(party_id = %party_id, location_id = %location_id), err)]
    async fn attach_address(&self, party_id: PartyId, location_id: LocationId) -> RepositoryResult<()> {
        // Missing party or location surfaces as a foreign key violation.
        sqlx::query(
            "INSERT INTO party_address (party_id, location_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(party_id.get())
        .bind(location_id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("attach_address", e))?;
        Ok(())
    }
}

fn decode<T>(column: &str, raw: String) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|e: DomainError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn party_from_row(row: &PgRow) -> Result<Party, sqlx::Error> {
    let party_type: PartyType = decode("party_type", row.try_get("party_type")?)?;
    let mut party = Party::new(party_type, row.try_get::<String, _>("display_name")?);
    party.id = PartyId::new(row.try_get("id")?);
    Ok(party)
}

fn individual_from_row(row: &PgRow) -> Result<Individual, sqlx::Error> {
    let name = IndividualName {
        title: row.try_get("title")?,
        given_name: row.try_get("given_name")?,
        middle_name: row.try_get("middle_name")?,
        family_name: row.try_get("family_name")?,
        honorific: row.try_get("honorific")?,
        salutation: row.try_get("salutation")?,
        preferred_name: row.try_get("preferred_name")?,
        initials: row.try_get("initials")?,
    };
    let mut individual = Individual::new(name).with_display_name(row.try_get::<String, _>("display_name")?);
    individual.set_id(PartyId::new(row.try_get("id")?));
    individual.sort = row.try_get("sort")?;
    individual.sex = row.try_get("sex")?;
    individual.gender = row.try_get("gender")?;
    individual.email = row.try_get("email")?;
    individual.phone_number = row.try_get("phone_number")?;
    individual.photo_url = row.try_get("photo_url")?;
    individual.electorate = row.try_get("electorate")?;
    individual.date_of_birth = row.try_get("date_of_birth")?;
    individual.place_of_birth = row.try_get("place_of_birth")?;
    individual.country_of_birth = row.try_get("country_of_birth")?;
    individual.date_of_death = row.try_get("date_of_death")?;
    individual.place_of_death = row.try_get("place_of_death")?;
    individual.country_of_death = row.try_get("country_of_death")?;
    individual.relationship_lifecycle_status = row.try_get("relationship_lifecycle_status")?;
    Ok(individual)
}

fn organisation_from_row(row: &PgRow) -> Result<Organisation, sqlx::Error> {
    let mut organisation = Organisation::new(row.try_get::<String, _>("name")?);
    organisation.set_id(PartyId::new(row.try_get("id")?));
    organisation.party.display_name = row.try_get("display_name")?;
    organisation.legal_type = row
        .try_get::<Option<String>, _>("legal_type")?
        .map(|raw| decode("legal_type", raw))
        .transpose()?;
    organisation.email = row.try_get("email")?;
    organisation.phone_number = row.try_get("phone_number")?;
    Ok(organisation)
}

fn address_from_row(row: &PgRow) -> Result<Address, sqlx::Error> {
    let location = Location {
        id: LocationId::new(row.try_get("id")?),
        location_type: decode("location_type", row.try_get("location_type")?)?,
        display_name: row.try_get("display_name")?,
        from_date: row.try_get("from_date")?,
        to_date: row.try_get("to_date")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_by: row.try_get("updated_by")?,
        updated_at: row.try_get("updated_at")?,
    };
    Ok(Address {
        location,
        name: row.try_get("name")?,
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        address_type: row.try_get("address_type")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: RoleId::new(row.try_get("id")?),
        role: row.try_get("role")?,
        relationship: row.try_get("relationship")?,
        reciprocal_role: row.try_get("reciprocal_role")?,
        party: PartySnapshot {
            party_id: PartyId::new(row.try_get("party_id")?),
            party_type: decode("party_type", row.try_get("party_type")?)?,
            name: row.try_get("party_name")?,
            email: row.try_get("party_email")?,
            phone_number: row.try_get("party_phone_number")?,
        },
        reciprocal: PartySnapshot {
            party_id: PartyId::new(row.try_get("reciprocal_party_id")?),
            party_type: decode("reciprocal_party_type", row.try_get("reciprocal_party_type")?)?,
            name: row.try_get("reciprocal_name")?,
            email: row.try_get("reciprocal_email")?,
            phone_number: row.try_get("reciprocal_phone_number")?,
        },
    })
}

fn identifier_from_row(row: &PgRow) -> Result<Identifier, sqlx::Error> {
    Ok(Identifier {
        id: IdentifierId::new(row.try_get("id")?),
        identifier_type: decode("identifier_type", row.try_get("identifier_type")?)?,
        value: row.try_get("value")?,
        register: row.try_get("register")?,
        lifecycle_status: decode("lifecycle_status", row.try_get("lifecycle_status")?)?,
        from_date: row.try_get("from_date")?,
        to_date: row.try_get("to_date")?,
    })
}

/// Map SQLx errors to repository errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Domain(DomainError::conflict(msg)),
                Some("23503") => RepositoryError::NotFound,
                Some("23514") => RepositoryError::Domain(DomainError::validation(msg)),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::PoolClosed => RepositoryError::Storage(format!("connection pool closed in {}", operation)),
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reports_the_column() {
        let err = decode::<PartyType>("party_type", "PERSON".to_string()).unwrap_err();
        match err {
            sqlx::Error::ColumnDecode { index, .. } => assert_eq!(index, "party_type"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(map_sqlx_error("find", sqlx::Error::RowNotFound).is_not_found());
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolClosed),
            RepositoryError::Storage(_)
        ));
    }

    #[test]
    fn limit_offset_follows_the_page_request() {
        assert_eq!(limit_offset(PageRequest::new(Some(3), Some(25))), (25, 75));
    }

    #[test]
    fn family_name_search_orders_bytewise() {
        assert!(INDIVIDUAL_SORT_ORDER.contains(r#"i.sort COLLATE "C""#));
        assert!(SCHEMA.contains(r#"individual (sort COLLATE "C", id)"#));
    }

    #[test]
    fn schema_creates_the_shared_sequence() {
        assert!(SCHEMA.contains("CREATE SEQUENCE IF NOT EXISTS partybook_id_seq"));
    }
}
