use partybook_infra::{RelationshipBuilder, Repositories};

/// Shared handler state: repository handles plus the relationship builder.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub repositories: Repositories,
    pub relationships: RelationshipBuilder,
}

impl AppServices {
    pub fn new(repositories: Repositories) -> Self {
        let relationships = RelationshipBuilder::new(repositories.clone());
        Self {
            repositories,
            relationships,
        }
    }
}
