//! Members of the House of Representatives, loaded from a CSV file.
//!
//! The file has a header line followed by one row per member. Rows are split
//! on bare commas: quoted fields containing commas are not supported.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use partybook_core::{Entity, LocationId, PageRequest};
use partybook_parties::{Identifier, IdentifierType, Individual, IndividualName, RoleLabels};

use super::parliament_house::PARLIAMENT_HOUSE;
use super::political_party::PoliticalParty;
use super::{SeedContext, SeedError, SeedLoader, SeedReport};

const HONORIFIC: usize = 0;
const SALUTATION: usize = 1;
const POST_NOMINALS: usize = 2;
const SURNAME: usize = 3;
const FIRST_NAME: usize = 4;
const OTHER_NAME: usize = 5;
const PREFERRED_NAME: usize = 6;
const INITIALS: usize = 7;
const ELECTORATE: usize = 8;
const STATE: usize = 9;
const POLITICAL_PARTY: usize = 10;
const SEX: usize = 11;
const COLUMNS: usize = 12;

/// Example business number seeded alongside the members.
pub const EXAMPLE_ABN: &str = "85 087 326 690";

/// One parsed row of the members file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub honorific: String,
    pub salutation: String,
    pub post_nominals: String,
    pub surname: String,
    pub first_name: String,
    pub other_name: String,
    pub preferred_name: String,
    pub initials: String,
    pub electorate: String,
    pub state: String,
    pub political_party: String,
    pub sex: String,
}

impl MemberRow {
    /// Parse `line`; `line_number` is 1-based and only used for errors.
    pub fn parse(line_number: usize, line: &str) -> Result<Self, SeedError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < COLUMNS {
            return Err(SeedError::Row {
                line: line_number,
                reason: format!("expected {COLUMNS} columns, found {}", fields.len()),
            });
        }

        let field = |index: usize| fields[index].to_string();
        Ok(Self {
            honorific: field(HONORIFIC),
            salutation: field(SALUTATION),
            post_nominals: field(POST_NOMINALS),
            surname: field(SURNAME),
            first_name: field(FIRST_NAME),
            other_name: field(OTHER_NAME),
            preferred_name: field(PREFERRED_NAME),
            initials: field(INITIALS),
            electorate: field(ELECTORATE),
            state: field(STATE),
            political_party: field(POLITICAL_PARTY),
            sex: field(SEX),
        })
    }

    /// "Surname, Honorific First".
    pub fn display_name(&self) -> String {
        format!("{}, {} {}", self.surname, self.honorific, self.first_name)
    }

    pub fn email(&self) -> String {
        format!("{}.{}@aph.gov.au", self.first_name, self.surname).to_lowercase()
    }

    /// `None` for independents and unrecognised abbreviations.
    pub fn membership(&self) -> Option<PoliticalParty> {
        PoliticalParty::from_abbreviation(&self.political_party).filter(PoliticalParty::is_organisation)
    }

    pub fn to_individual(&self) -> Individual {
        let name = IndividualName {
            title: self.honorific.clone(),
            given_name: self.first_name.clone(),
            middle_name: self.other_name.clone(),
            family_name: self.surname.clone(),
            honorific: self.post_nominals.clone(),
            salutation: self.salutation.clone(),
            preferred_name: self.preferred_name.clone(),
            initials: self.initials.clone(),
        };
        let mut individual = Individual::new(name)
            .with_display_name(self.display_name())
            .with_contact(self.email(), "")
            .with_sex(self.sex.clone());
        individual.electorate = Some(self.electorate.clone());
        individual
    }
}

/// Seeds an example ABN, then every member listed in the members file.
#[derive(Debug, Clone, Copy, Default)]
pub struct HouseOfRepresentatives;

impl HouseOfRepresentatives {
    async fn senate(ctx: &SeedContext) -> Result<LocationId, SeedError> {
        ctx.repositories
            .addresses
            .find_by_name(PARLIAMENT_HOUSE, PageRequest::new(Some(0), Some(1)))
            .await?
            .content
            .first()
            .map(Entity::id)
            .ok_or_else(|| SeedError::MissingReference(format!("address '{PARLIAMENT_HOUSE}'")))
    }

    /// Place a saved member at Parliament House and link their party;
    /// returns the number of records written.
    async fn attach_member(
        ctx: &SeedContext,
        senate: LocationId,
        row: &MemberRow,
        member: &Individual,
    ) -> Result<usize, SeedError> {
        let repositories = &ctx.repositories;
        repositories.parties.attach_address(member.id(), senate).await?;

        let Some(party) = row.membership() else {
            debug!(party = %row.political_party, member = %member.party.display_name, "no membership");
            return Ok(0);
        };

        let organisation = repositories
            .organisations
            .find_by_name(party.name(), PageRequest::new(Some(0), Some(1)))
            .await?
            .content
            .into_iter()
            .next();
        let Some(organisation) = organisation else {
            warn!(
                party = %party,
                member = %member.party.display_name,
                "organisation not seeded, member saved without membership"
            );
            return Ok(0);
        };

        ctx.relationships
            .link(organisation.snapshot(), member.snapshot(), &RoleLabels::member())
            .await?;
        Ok(2)
    }
}

#[async_trait]
impl SeedLoader for HouseOfRepresentatives {
    fn name(&self) -> &str {
        "House of Representatives"
    }

    fn order(&self) -> i32 {
        i32::MAX
    }

    async fn run(&self, ctx: &SeedContext) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        let identifier = ctx
            .repositories
            .identifiers
            .save(Identifier::new(IdentifierType::Abn, EXAMPLE_ABN).valid_from(Utc::now()))
            .await?;
        report.created += 1;
        if let Ok(json) = serde_json::to_string(&identifier) {
            debug!(identifier = %json, "identifier created");
        }

        let senate = Self::senate(ctx).await?;

        let contents = tokio::fs::read_to_string(&ctx.members_file)
            .await
            .map_err(|source| SeedError::Io {
                path: ctx.members_file.clone(),
                source,
            })?;

        let mut lines = contents.lines().enumerate();
        if let Some((_, header)) = lines.next() {
            debug!(header, "members file header");
        }

        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let line_number = index + 1;
            let row = match MemberRow::parse(line_number, line) {
                Ok(row) => row,
                Err(e) => {
                    warn!(line = line_number, error = %e, "member row skipped");
                    report.skipped += 1;
                    continue;
                }
            };
            let member = match ctx.repositories.individuals.save(row.to_individual()).await {
                Ok(member) => member,
                Err(e) => {
                    warn!(line = line_number, error = %e, "member row skipped");
                    report.skipped += 1;
                    continue;
                }
            };
            report.created += 1;

            match Self::attach_member(ctx, senate, &row, &member).await {
                Ok(created) => report.created += created,
                Err(e) => warn!(
                    line = line_number,
                    member = %member.party.display_name,
                    error = %e,
                    "member saved but not fully linked"
                ),
            }
        }

        info!(created = report.created, skipped = report.skipped, "members loaded");
        Ok(report)
    }
}
