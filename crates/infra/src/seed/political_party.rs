//! Australian federal political parties and their seed profiles.

use async_trait::async_trait;
use tracing::info;

use partybook_core::Entity;
use partybook_parties::{Address, Individual, IndividualName, LegalType, Location, LocationType, Organisation, RoleLabels};

use super::{SeedContext, SeedError, SeedLoader, SeedReport};

/// Parties that appear in the House of Representatives members file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoliticalParty {
    AustralianGreens,
    AustralianLaborParty,
    CentreAlliance,
    JacquiLambieNetwork,
    LiberalPartyOfAustralia,
    NationalPartyOfAustralia,
    PaulineHansonsOneNation,
    Independent,
}

impl PoliticalParty {
    pub const ALL: [PoliticalParty; 8] = [
        PoliticalParty::AustralianGreens,
        PoliticalParty::AustralianLaborParty,
        PoliticalParty::CentreAlliance,
        PoliticalParty::JacquiLambieNetwork,
        PoliticalParty::LiberalPartyOfAustralia,
        PoliticalParty::NationalPartyOfAustralia,
        PoliticalParty::PaulineHansonsOneNation,
        PoliticalParty::Independent,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            PoliticalParty::AustralianGreens => "AG",
            PoliticalParty::AustralianLaborParty => "ALP",
            PoliticalParty::CentreAlliance => "CA",
            PoliticalParty::JacquiLambieNetwork => "JLN",
            PoliticalParty::LiberalPartyOfAustralia => "LP",
            PoliticalParty::NationalPartyOfAustralia => "NATS",
            PoliticalParty::PaulineHansonsOneNation => "PHON",
            PoliticalParty::Independent => "IND",
        }
    }

    /// Organisation name the party is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            PoliticalParty::AustralianGreens => "Australian Greens",
            PoliticalParty::AustralianLaborParty => "Australian Labor Party",
            PoliticalParty::CentreAlliance => "Centre Alliance",
            PoliticalParty::JacquiLambieNetwork => "Jacqui Lambie Network",
            PoliticalParty::LiberalPartyOfAustralia => "Liberal Party of Australia",
            PoliticalParty::NationalPartyOfAustralia => "National Party of Australia",
            PoliticalParty::PaulineHansonsOneNation => "Pauline Hanson's One Nation",
            PoliticalParty::Independent => "Independent",
        }
    }

    /// Case-insensitive lookup; `None` for anything unrecognised.
    pub fn from_abbreviation(abbreviation: &str) -> Option<Self> {
        let abbreviation = abbreviation.trim().to_uppercase();
        Self::ALL.into_iter().find(|p| p.abbreviation() == abbreviation)
    }

    /// Independents are not an organisation and carry no membership.
    pub fn is_organisation(&self) -> bool {
        !matches!(self, PoliticalParty::Independent)
    }
}

impl core::fmt::Display for PoliticalParty {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
struct PrimaryContact {
    given_name: &'static str,
    family_name: &'static str,
    email: &'static str,
    phone_number: &'static str,
}

/// Seeds one political party: head office, primary contact, the
/// organisation itself, and the membership pair between the two.
#[derive(Debug, Clone)]
pub struct PoliticalPartyLoader {
    party: PoliticalParty,
    order: i32,
    email: &'static str,
    phone_number: &'static str,
    head_office: Address,
    contact: PrimaryContact,
}

impl PoliticalPartyLoader {
    pub fn jacqui_lambie_network() -> Self {
        Self {
            party: PoliticalParty::JacquiLambieNetwork,
            order: 2,
            email: "hey@lambienetwork.com.au",
            phone_number: "(03) 6431 3112",
            head_office: head_office(
                "22 Mount Street Burnie TAS 7320",
                "Shop 4",
                "22 Mount Street",
                "Burnie",
                "TAS",
                "7320",
            ),
            contact: PrimaryContact {
                given_name: "Glynn",
                family_name: "Williams",
                email: "glynn.williams@lambienetwork.com.au",
                phone_number: "(03) 6431 3112",
            },
        }
    }

    pub fn pauline_hansons_one_nation() -> Self {
        Self {
            party: PoliticalParty::PaulineHansonsOneNation,
            order: 4,
            email: "hey@onenation.org.au",
            phone_number: "1300 857 466",
            head_office: head_office("PO Box 136 Pinkenba QLD 4008", "PO Box 136", "", "Pinkenba", "QLD", "4008"),
            contact: PrimaryContact {
                given_name: "Rod",
                family_name: "Miles",
                email: "rod.mills@onenation.org.au",
                phone_number: "1300 857 466",
            },
        }
    }

    pub fn party(&self) -> PoliticalParty {
        self.party
    }
}

fn head_office(
    display_name: &str,
    line1: &str,
    line2: &str,
    city: &str,
    state: &str,
    postal_code: &str,
) -> Address {
    Address {
        location: Location::new(LocationType::Address, display_name),
        line1: line1.to_string(),
        line2: line2.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        postal_code: postal_code.to_string(),
        country: "Australia".to_string(),
        address_type: "Principal Place of Business".to_string(),
        ..Address::default()
    }
}

#[async_trait]
impl SeedLoader for PoliticalPartyLoader {
    fn name(&self) -> &str {
        self.party.name()
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn run(&self, ctx: &SeedContext) -> Result<SeedReport, SeedError> {
        let repositories = &ctx.repositories;

        let head_office = repositories.addresses.save(self.head_office.clone()).await?;

        let contact = Individual::new(IndividualName::new(self.contact.given_name, self.contact.family_name))
            .with_sex("MALE")
            .with_contact(self.contact.email, self.contact.phone_number);
        let contact = repositories.individuals.save(contact).await?;

        let organisation = Organisation::new(self.party.name())
            .with_legal_type(LegalType::OtherIncorporatedEntity)
            .with_contact(self.email, self.phone_number);
        let organisation = repositories.organisations.save(organisation).await?;

        repositories.parties.attach_address(organisation.id(), head_office.id()).await?;
        repositories.parties.attach_address(contact.id(), head_office.id()).await?;

        ctx.relationships
            .link(organisation.snapshot(), contact.snapshot(), &RoleLabels::membership())
            .await?;

        info!(
            organisation_id = %organisation.id(),
            contact_id = %contact.id(),
            "{} created",
            self.party
        );
        Ok(SeedReport { created: 5, skipped: 0 })
    }
}
