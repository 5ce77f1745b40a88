use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use partybook_core::{LocationId, Page, PageRequest, PartyId, RoleId};
use partybook_parties::{
    Address, Individual, IndividualName, LegalType, LocationType, Organisation, PartySnapshot, PartyType,
    Role, RoleLabels,
};

// -------------------------
// Links and paging
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

pub type Links = BTreeMap<&'static str, Link>;

pub fn individual_href(id: PartyId) -> String {
    format!("/individuals/{id}")
}

pub fn organisation_href(id: PartyId) -> String {
    format!("/organisations/{id}")
}

pub fn role_href(id: RoleId) -> String {
    format!("/roles/{id}")
}

pub fn address_href(id: LocationId) -> String {
    format!("/addresses/{id}")
}

pub fn party_href(snapshot: &PartySnapshot) -> String {
    match snapshot.party_type {
        PartyType::Individual => individual_href(snapshot.party_id),
        PartyType::Organisation => organisation_href(snapshot.party_id),
    }
}

fn party_links(self_href: String, id: PartyId) -> Links {
    Links::from([
        ("self", Link::new(self_href)),
        ("roles", Link::new(format!("/roles/search/findByPartyId?partyId={id}"))),
    ])
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Debug, Deserialize)]
pub struct NameSearchParams {
    pub name: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl NameSearchParams {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySearchParams {
    pub party_id: PartyId,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PartySearchParams {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

/// HAL collection envelope: `_embedded`, navigation `_links` and `page`.
#[derive(Debug, Serialize)]
pub struct PagedModel<T> {
    #[serde(rename = "_embedded")]
    pub embedded: BTreeMap<&'static str, Vec<T>>,
    #[serde(rename = "_links")]
    pub links: Links,
    pub page: PageMetadata,
}

impl<T> PagedModel<T> {
    /// `query` holds the non-paging parameters that every link must repeat.
    pub fn new<E>(
        page: Page<E>,
        collection: &'static str,
        path: &str,
        query: &[(&str, String)],
        to_model: impl FnMut(E) -> T,
    ) -> Self {
        let total_pages = page.total_pages();
        let href = |number: u32| page_href(path, query, number, page.size);

        let mut links = Links::new();
        links.insert("self", Link::new(href(page.number)));
        if total_pages > 0 {
            links.insert("first", Link::new(href(0)));
            links.insert("last", Link::new(href(total_pages - 1)));
        }
        if page.has_previous() {
            links.insert("prev", Link::new(href(page.number.min(total_pages) - 1)));
        }
        if let Some(next) = page.number.checked_add(1).filter(|_| page.has_next()) {
            links.insert("next", Link::new(href(next)));
        }

        let metadata = PageMetadata {
            size: page.size,
            total_elements: page.total_elements,
            total_pages,
            number: page.number,
        };

        Self {
            embedded: BTreeMap::from([(collection, page.content.into_iter().map(to_model).collect())]),
            links,
            page: metadata,
        }
    }
}

fn page_href(path: &str, query: &[(&str, String)], number: u32, size: u32) -> String {
    let mut params: Vec<String> = query
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect();
    params.push(format!("page={number}"));
    params.push(format!("size={size}"));
    format!("{path}?{}", params.join("&"))
}

// -------------------------
// Request DTOs
// -------------------------

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Body of `POST /individuals` and `PATCH /individuals/{id}`.
///
/// Every field is optional; on PATCH an omitted field keeps its stored
/// value. There is no `id` field: an id in the body is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndividualRequest {
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    pub honorific: Option<String>,
    pub salutation: Option<String>,
    pub preferred_name: Option<String>,
    pub initials: Option<String>,
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

impl IndividualRequest {
    /// New unsaved individual; display name defaults to "Family, Given".
    pub fn into_individual(self) -> Individual {
        let mut individual = Individual::new(IndividualName::default());
        self.apply(&mut individual);
        individual
    }

    /// Merge the supplied fields into `individual`.
    ///
    /// A display name that was derived from the name ("Family, Given") is
    /// derived again after a rename; a custom one is kept unless replaced.
    pub fn apply(self, individual: &mut Individual) {
        let derived = self.display_name.is_none() && individual.party.display_name == individual.name.display_name();
        let name = &mut individual.name;
        set(&mut individual.party.display_name, self.display_name);
        set(&mut name.title, self.title);
        set(&mut name.given_name, self.given_name);
        set(&mut name.middle_name, self.middle_name);
        set(&mut name.family_name, self.family_name);
        set(&mut name.honorific, self.honorific);
        set(&mut name.salutation, self.salutation);
        set(&mut name.preferred_name, self.preferred_name);
        set(&mut name.initials, self.initials);
        set_opt(&mut individual.sex, self.sex);
        set_opt(&mut individual.gender, self.gender);
        set_opt(&mut individual.email, self.email);
        set_opt(&mut individual.phone_number, self.phone_number);
        set_opt(&mut individual.photo_url, self.photo_url);
        set_opt(&mut individual.electorate, self.electorate);
        set_opt(&mut individual.date_of_birth, self.date_of_birth);
        set_opt(&mut individual.place_of_birth, self.place_of_birth);
        set_opt(&mut individual.country_of_birth, self.country_of_birth);
        set_opt(&mut individual.date_of_death, self.date_of_death);
        set_opt(&mut individual.place_of_death, self.place_of_death);
        set_opt(&mut individual.country_of_death, self.country_of_death);
        set_opt(
            &mut individual.relationship_lifecycle_status,
            self.relationship_lifecycle_status,
        );
        if derived {
            individual.party.display_name = individual.name.display_name();
        }
    }
}

/// Body of `POST /organisations` and `PATCH /organisations/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganisationRequest {
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub legal_type: Option<LegalType>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl OrganisationRequest {
    /// New unsaved organisation; display name defaults to the name.
    pub fn into_organisation(self) -> Organisation {
        let mut organisation = Organisation::new(self.name.clone().unwrap_or_default());
        self.apply(&mut organisation);
        organisation
    }

    pub fn apply(self, organisation: &mut Organisation) {
        set(&mut organisation.party.display_name, self.display_name);
        set(&mut organisation.name, self.name);
        set_opt(&mut organisation.legal_type, self.legal_type);
        set_opt(&mut organisation.email, self.email);
        set_opt(&mut organisation.phone_number, self.phone_number);
    }
}

/// Body of `POST /roles`. Labels default to the organisation/member pair.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPartiesRequest {
    pub party_id: PartyId,
    pub reciprocal_party_id: PartyId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub reciprocal_role: Option<String>,
    #[serde(default)]
    pub reciprocal_relationship: Option<String>,
}

impl LinkPartiesRequest {
    pub fn labels(&self) -> RoleLabels {
        let defaults = RoleLabels::membership();
        RoleLabels::new(
            self.role.clone().unwrap_or(defaults.role),
            self.relationship.clone().unwrap_or(defaults.relationship),
            self.reciprocal_role.clone().unwrap_or(defaults.reciprocal_role),
            self.reciprocal_relationship
                .clone()
                .unwrap_or(defaults.reciprocal_relationship),
        )
    }
}

// -------------------------
// Response models
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualModel {
    pub id: PartyId,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    pub display_name: String,
    pub title: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub honorific: String,
    pub salutation: String,
    pub preferred_name: String,
    pub initials: String,
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
    pub addresses: Vec<LocationId>,
    pub roles: Vec<RoleId>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl From<Individual> for IndividualModel {
    fn from(individual: Individual) -> Self {
        let id = individual.party.id;
        let name = individual.name;
        Self {
            id,
            party_type: individual.party.party_type,
            display_name: individual.party.display_name,
            title: name.title,
            given_name: name.given_name,
            middle_name: name.middle_name,
            family_name: name.family_name,
            honorific: name.honorific,
            salutation: name.salutation,
            preferred_name: name.preferred_name,
            initials: name.initials,
            sort: individual.sort,
            sex: individual.sex,
            gender: individual.gender,
            email: individual.email,
            phone_number: individual.phone_number,
            photo_url: individual.photo_url,
            electorate: individual.electorate,
            date_of_birth: individual.date_of_birth,
            place_of_birth: individual.place_of_birth,
            country_of_birth: individual.country_of_birth,
            date_of_death: individual.date_of_death,
            place_of_death: individual.place_of_death,
            country_of_death: individual.country_of_death,
            relationship_lifecycle_status: individual.relationship_lifecycle_status,
            addresses: individual.party.addresses.into_iter().collect(),
            roles: individual.party.roles.into_iter().collect(),
            links: party_links(individual_href(id), id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationModel {
    pub id: PartyId,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    pub display_name: String,
    pub name: String,
    pub legal_type: Option<LegalType>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub addresses: Vec<LocationId>,
    pub roles: Vec<RoleId>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl From<Organisation> for OrganisationModel {
    fn from(organisation: Organisation) -> Self {
        let id = organisation.party.id;
        Self {
            id,
            party_type: organisation.party.party_type,
            display_name: organisation.party.display_name,
            name: organisation.name,
            legal_type: organisation.legal_type,
            email: organisation.email,
            phone_number: organisation.phone_number,
            addresses: organisation.party.addresses.into_iter().collect(),
            roles: organisation.party.roles.into_iter().collect(),
            links: party_links(organisation_href(id), id),
        }
    }
}

/// A role with both party snapshots flattened.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleModel {
    pub id: RoleId,
    pub role: String,
    pub party_id: PartyId,
    pub party_type: PartyType,
    pub party_name: String,
    pub party_email: String,
    pub party_phone_number: String,
    pub relationship: String,
    pub reciprocal_role: String,
    pub reciprocal_party_id: PartyId,
    pub reciprocal_party_type: PartyType,
    pub reciprocal_party_name: String,
    pub reciprocal_party_email: String,
    pub reciprocal_party_phone_number: String,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl From<Role> for RoleModel {
    fn from(role: Role) -> Self {
        let links = Links::from([
            ("self", Link::new(role_href(role.id))),
            ("party", Link::new(party_href(&role.party))),
            ("reciprocalParty", Link::new(party_href(&role.reciprocal))),
        ]);
        Self {
            id: role.id,
            role: role.role,
            party_id: role.party.party_id,
            party_type: role.party.party_type,
            party_name: role.party.name,
            party_email: role.party.email,
            party_phone_number: role.party.phone_number,
            relationship: role.relationship,
            reciprocal_role: role.reciprocal_role,
            reciprocal_party_id: role.reciprocal.party_id,
            reciprocal_party_type: role.reciprocal.party_type,
            reciprocal_party_name: role.reciprocal.name,
            reciprocal_party_email: role.reciprocal.email,
            reciprocal_party_phone_number: role.reciprocal.phone_number,
            links,
        }
    }
}

/// Both sides of a newly created relationship.
#[derive(Debug, Serialize)]
pub struct RolePairModel {
    pub role: RoleModel,
    pub reciprocal: RoleModel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressModel {
    pub id: LocationId,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub display_name: String,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: String,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl From<Address> for AddressModel {
    fn from(address: Address) -> Self {
        let location = address.location;
        Self {
            id: location.id,
            location_type: location.location_type,
            display_name: location.display_name,
            name: address.name,
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
            address_type: address.address_type,
            from_date: location.from_date,
            to_date: location.to_date,
            created_by: location.created_by,
            created_at: location.created_at,
            updated_by: location.updated_by,
            updated_at: location.updated_at,
            links: Links::from([("self", Link::new(address_href(location.id)))]),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page_of(total: u64, number: u32, size: u32) -> Page<u64> {
        let offset = u64::from(number) * u64::from(size);
        let content = (0..total).skip(offset as usize).take(size as usize).collect();
        Page::new(content, PageRequest::new(Some(number), Some(size)), total)
    }

    #[test]
    fn middle_page_links_all_directions() {
        let model = PagedModel::new(page_of(151, 3, 20), "individuals", "/individuals", &[], |n| n);
        let value = serde_json::to_value(&model).unwrap();

        assert_eq!(value["page"], json!({"size": 20, "totalElements": 151, "totalPages": 8, "number": 3}));
        assert_eq!(value["_links"]["self"]["href"], "/individuals?page=3&size=20");
        assert_eq!(value["_links"]["first"]["href"], "/individuals?page=0&size=20");
        assert_eq!(value["_links"]["prev"]["href"], "/individuals?page=2&size=20");
        assert_eq!(value["_links"]["next"]["href"], "/individuals?page=4&size=20");
        assert_eq!(value["_links"]["last"]["href"], "/individuals?page=7&size=20");
        assert_eq!(value["_embedded"]["individuals"].as_array().unwrap().len(), 20);
    }

    #[test]
    fn edge_pages_omit_missing_neighbours() {
        let first = PagedModel::new(page_of(5, 0, 20), "roles", "/roles", &[], |n| n);
        assert!(!first.links.contains_key("prev"));
        assert!(!first.links.contains_key("next"));
        assert!(first.links.contains_key("last"));

        let empty = PagedModel::new(page_of(0, 0, 20), "roles", "/roles", &[], |n| n);
        assert_eq!(empty.links.keys().copied().collect::<Vec<_>>(), vec!["self"]);
        assert_eq!(empty.embedded["roles"], Vec::<u64>::new());
    }

    #[test]
    fn page_past_the_end_links_back_without_next() {
        let model = PagedModel::new(page_of(3, u32::MAX, 20), "individuals", "/individuals", &[], |n| n);
        assert!(!model.links.contains_key("next"));
        assert_eq!(model.links["prev"].href, "/individuals?page=0&size=20");
        assert_eq!(model.links["self"].href, format!("/individuals?page={}&size=20", u32::MAX));
    }

    #[test]
    fn search_links_repeat_encoded_query() {
        let model = PagedModel::new(
            page_of(1, 0, 20),
            "organisations",
            "/organisations/search/findByName",
            &[("name", "Pauline Hanson's One Nation".to_string())],
            |n| n,
        );
        assert_eq!(
            model.links["self"].href,
            "/organisations/search/findByName?name=Pauline%20Hanson%27s%20One%20Nation&page=0&size=20"
        );
    }

    #[test]
    fn individual_request_merges_only_supplied_fields() {
        let mut stored = Individual::new(IndividualName::new("Rod", "Miles")).with_contact("rod.mills@onenation.org.au", "1300 857 466");
        let patch: IndividualRequest =
            serde_json::from_value(json!({ "id": 99, "familyName": "Mills", "email": "rod@onenation.org.au" })).unwrap();
        patch.apply(&mut stored);

        assert_eq!(stored.name.family_name, "Mills");
        assert_eq!(stored.name.given_name, "Rod");
        assert_eq!(stored.email.as_deref(), Some("rod@onenation.org.au"));
        assert_eq!(stored.phone_number.as_deref(), Some("1300 857 466"));
        assert_eq!(stored.party.id, PartyId::UNASSIGNED);
    }

    #[test]
    fn rename_rederives_only_a_derived_display_name() {
        let mut derived = Individual::new(IndividualName::new("Rod", "Miles"));
        let rename: IndividualRequest = serde_json::from_value(json!({ "familyName": "Mills" })).unwrap();
        rename.apply(&mut derived);
        assert_eq!(derived.party.display_name, "Mills, Rod");

        let mut custom = Individual::new(IndividualName::new("Jacqui", "Lambie")).with_display_name("Lambie, Ms Jacqui");
        let rename: IndividualRequest = serde_json::from_value(json!({ "givenName": "Jacqueline" })).unwrap();
        rename.apply(&mut custom);
        assert_eq!(custom.party.display_name, "Lambie, Ms Jacqui");
        assert_eq!(custom.name.given_name, "Jacqueline");

        let mut replaced = Individual::new(IndividualName::new("Rod", "Miles"));
        let rename: IndividualRequest =
            serde_json::from_value(json!({ "familyName": "Mills", "displayName": "R. Mills" })).unwrap();
        rename.apply(&mut replaced);
        assert_eq!(replaced.party.display_name, "R. Mills");
    }

    #[test]
    fn new_individual_derives_display_name() {
        let request: IndividualRequest =
            serde_json::from_value(json!({ "givenName": "Jacqui", "familyName": "Lambie" })).unwrap();
        assert_eq!(request.into_individual().party.display_name, "Lambie, Jacqui");
    }

    #[test]
    fn link_request_defaults_to_membership_labels() {
        let request: LinkPartiesRequest =
            serde_json::from_value(json!({ "partyId": 2, "reciprocalPartyId": 1 })).unwrap();
        assert_eq!(request.labels(), RoleLabels::membership());

        let request: LinkPartiesRequest = serde_json::from_value(
            json!({ "partyId": 2, "reciprocalPartyId": 1, "relationship": "Employer" }),
        )
        .unwrap();
        assert_eq!(request.labels().relationship, "Employer");
        assert_eq!(request.labels().role, "Organisation");
    }

    #[test]
    fn models_use_camel_case_and_self_links() {
        let mut individual = Individual::new(IndividualName::new("Glynn", "Williams"));
        individual.party.id = PartyId::new(5);
        let value = serde_json::to_value(IndividualModel::from(individual)).unwrap();
        assert_eq!(value["familyName"], "Williams");
        assert_eq!(value["type"], "INDIVIDUAL");
        assert_eq!(value["_links"]["self"]["href"], "/individuals/5");
        assert_eq!(value["_links"]["roles"]["href"], "/roles/search/findByPartyId?partyId=5");
    }
}
