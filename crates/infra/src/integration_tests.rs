//! End-to-end seeding against the in-memory store.
//!
//! Verifies:
//! - The Jacqui Lambie Network profile yields one organisation, one contact
//!   and a reciprocal role pair that cross-references both
//! - The full default run tolerates bad rows and missing organisations
//! - A member whose address link fails still counts as created

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use async_trait::async_trait;
    use partybook_core::{Entity, LocationId, PageRequest, PartyId};
    use partybook_parties::{IdentifierType, Party, PartyType};

    use crate::repository::{PartyRepository, Repositories, RepositoryError, RepositoryResult};
    use crate::seed::{
        DEFAULT_MEMBERS_FILE, HouseOfRepresentatives, ParliamentHouse, PoliticalPartyLoader, SeedContext,
        SeedError, SeedLoader, SeedRunner,
    };

    fn context(members_file: impl Into<std::path::PathBuf>) -> SeedContext {
        SeedContext::new(Repositories::in_memory(), members_file)
    }

    fn members_file(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Honorific,Salutation,Post Nominals,Surname,First Name,Other Name,Preferred Name,Initials,Electorate,State,Political Party,Gender"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn jacqui_lambie_network_seeds_reciprocal_membership() {
        let ctx = context(DEFAULT_MEMBERS_FILE);
        PoliticalPartyLoader::jacqui_lambie_network().run(&ctx).await.unwrap();
        let repositories = &ctx.repositories;

        let organisations = repositories
            .organisations
            .find_by_name("Jacqui Lambie Network", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(organisations.total_elements, 1);
        let organisation = &organisations.content[0];

        let individuals = repositories.individuals.find_all(PageRequest::default()).await.unwrap();
        assert_eq!(individuals.total_elements, 1);
        let glynn = &individuals.content[0];
        assert_eq!(glynn.name.given_name, "Glynn");
        assert_eq!(glynn.name.family_name, "Williams");
        assert_eq!(glynn.email.as_deref(), Some("glynn.williams@lambienetwork.com.au"));

        let roles = repositories.roles.find_all(PageRequest::default()).await.unwrap();
        assert_eq!(roles.total_elements, 2);
        let org_role = roles.content.iter().find(|r| r.owner() == organisation.id()).unwrap();
        let member_role = roles.content.iter().find(|r| r.owner() == glynn.id()).unwrap();

        assert_eq!((org_role.role.as_str(), org_role.relationship.as_str()), ("Organisation", "Primary Contact"));
        assert_eq!((member_role.role.as_str(), member_role.relationship.as_str()), ("Member", "Membership"));

        assert_eq!(org_role.reciprocal.party_id, glynn.id());
        assert_eq!(org_role.reciprocal.name, glynn.party.display_name);
        assert_eq!(org_role.reciprocal.email, "glynn.williams@lambienetwork.com.au");
        assert_eq!(org_role.reciprocal.phone_number, "(03) 6431 3112");

        assert_eq!(member_role.reciprocal.party_id, organisation.id());
        assert_eq!(member_role.reciprocal.party_type, PartyType::Organisation);
        assert_eq!(member_role.reciprocal.name, "Jacqui Lambie Network");
        assert_eq!(member_role.reciprocal.email, "hey@lambienetwork.com.au");
        assert!(org_role.is_reciprocal_of(member_role));

        assert!(organisation.party.roles.contains(&org_role.id));
        assert!(glynn.party.roles.contains(&member_role.id));
        assert_eq!(organisation.party.addresses, glynn.party.addresses);
        assert_eq!(organisation.party.addresses.len(), 1);
    }

    #[tokio::test]
    async fn default_run_seeds_members_and_skips_bad_rows() {
        let file = members_file(&[
            "Ms,Ms,MP,Lambie,Jacqui,Louise,Jacqui,J.L.,Braddon,TAS,JLN,FEMALE",
            "Hon,Mr,MP,Wilkie,Andrew,Damien,Andrew,A.D.,Clark,TAS,IND,MALE",
            "Ms,Ms,MP,Sharkie,Rebekha,,Rebekha,R.,Mayo,SA,CA,FEMALE",
            "Mr,Mr,MP,Short",
        ]);
        let ctx = context(file.path());

        let summary = SeedRunner::with_defaults().run(&ctx).await;
        assert!(summary.is_complete(), "{:?}", summary.failed);

        let (_, house) = summary
            .completed
            .iter()
            .find(|(name, _)| name == "House of Representatives")
            .unwrap();
        assert_eq!(house.skipped, 1);

        let repositories = &ctx.repositories;
        // Two primary contacts plus three members.
        assert_eq!(repositories.individuals.find_all(PageRequest::default()).await.unwrap().total_elements, 5);

        let lambie = repositories
            .individuals
            .find_by_family_name_starts_with("Lambie", PageRequest::default())
            .await
            .unwrap()
            .content
            .remove(0);
        assert_eq!(lambie.party.display_name, "Lambie, Ms Jacqui");
        assert_eq!(lambie.email.as_deref(), Some("jacqui.lambie@aph.gov.au"));
        assert_eq!(lambie.party.roles.len(), 1);
        let membership = repositories
            .roles
            .find_by_party_id(lambie.id(), PageRequest::default())
            .await
            .unwrap()
            .content
            .remove(0);
        assert_eq!(membership.reciprocal.name, "Jacqui Lambie Network");

        let wilkie = repositories
            .individuals
            .find_by_family_name_starts_with("Wilkie", PageRequest::default())
            .await
            .unwrap()
            .content
            .remove(0);
        assert!(wilkie.party.roles.is_empty());
        assert_eq!(wilkie.party.addresses.len(), 1);

        // Centre Alliance is never seeded, so the member has no membership.
        let sharkie = repositories
            .individuals
            .find_by_family_name_starts_with("Sharkie", PageRequest::default())
            .await
            .unwrap()
            .content
            .remove(0);
        assert!(sharkie.party.roles.is_empty());

        let identifiers = repositories.identifiers.find_all(PageRequest::default()).await.unwrap();
        assert_eq!(identifiers.total_elements, 1);
        assert_eq!(identifiers.content[0].identifier_type, IdentifierType::Abn);
        assert_eq!(identifiers.content[0].value, "85 087 326 690");
    }

    #[tokio::test]
    async fn unreadable_members_file_fails_only_that_loader() {
        let ctx = context("does/not/exist.csv");
        ParliamentHouse.run(&ctx).await.unwrap();

        let err = HouseOfRepresentatives.run(&ctx).await.unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));

        let summary = SeedRunner::with_defaults().run(&context("does/not/exist.csv")).await;
        assert_eq!(summary.completed.len(), 3);
        assert_eq!(summary.failed.len(), 1);
    }

    #[tokio::test]
    async fn members_need_parliament_house() {
        let file = members_file(&["Hon,Mr,MP,Wilkie,Andrew,Damien,Andrew,A.D.,Clark,TAS,IND,MALE"]);
        let ctx = context(file.path());

        let err = HouseOfRepresentatives.run(&ctx).await.unwrap_err();
        assert!(matches!(err, SeedError::MissingReference(_)));
    }

    /// Reads through to the real store; address links always fail.
    struct FailingAddressLinks(Arc<dyn PartyRepository>);

    #[async_trait]
    impl PartyRepository for FailingAddressLinks {
        async fn find_party(&self, id: PartyId) -> RepositoryResult<Party> {
            self.0.find_party(id).await
        }

        async fn attach_address(&self, _party_id: PartyId, _location_id: LocationId) -> RepositoryResult<()> {
            Err(RepositoryError::Storage("address link unavailable".into()))
        }
    }

    #[tokio::test]
    async fn member_saved_without_address_counts_as_created() {
        let file = members_file(&["Hon,Mr,MP,Wilkie,Andrew,Damien,Andrew,A.D.,Clark,TAS,IND,MALE"]);
        let ctx = context(file.path());
        ParliamentHouse.run(&ctx).await.unwrap();

        let mut repositories = ctx.repositories.clone();
        repositories.parties = Arc::new(FailingAddressLinks(repositories.parties.clone()));
        let ctx = SeedContext::new(repositories, file.path());

        let report = HouseOfRepresentatives.run(&ctx).await.unwrap();
        // The example ABN and the member.
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 0);

        let wilkie = ctx
            .repositories
            .individuals
            .find_by_family_name_starts_with("Wilkie", PageRequest::default())
            .await
            .unwrap()
            .content
            .remove(0);
        assert!(wilkie.party.addresses.is_empty());
    }
}
