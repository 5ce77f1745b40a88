use async_trait::async_trait;
use tracing::info;

use partybook_parties::{Address, Location, LocationType};

use super::{SeedContext, SeedError, SeedLoader, SeedReport};

/// Name under which the Parliament House address is stored and looked up.
pub const PARLIAMENT_HOUSE: &str = "The Senate";

/// Seeds the Parliament House address shared by every parliamentarian.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParliamentHouse;

impl ParliamentHouse {
    pub fn address() -> Address {
        Address {
            location: Location::new(LocationType::Address, "Parliament House Canberra ACT 2600"),
            name: PARLIAMENT_HOUSE.to_string(),
            line1: "Parliament House".to_string(),
            city: "Canberra".to_string(),
            state: "ACT".to_string(),
            postal_code: "2600".to_string(),
            country: "Australia".to_string(),
            ..Address::default()
        }
    }
}

#[async_trait]
impl SeedLoader for ParliamentHouse {
    fn name(&self) -> &str {
        "Parliament House"
    }

    fn order(&self) -> i32 {
        1
    }

    async fn run(&self, ctx: &SeedContext) -> Result<SeedReport, SeedError> {
        let address = ctx.repositories.addresses.save(Self::address()).await?;
        info!(location_id = %address.location.id, name = %address.name, "address created");
        Ok(SeedReport { created: 1, skipped: 0 })
    }
}

#[cfg(test)]
mod tests {
    use partybook_core::PageRequest;

    use super::*;
    use crate::repository::Repositories;
    use crate::seed::DEFAULT_MEMBERS_FILE;

    #[tokio::test]
    async fn senate_address_can_be_found_by_name() {
        let ctx = SeedContext::new(Repositories::in_memory(), DEFAULT_MEMBERS_FILE);
        ParliamentHouse.run(&ctx).await.unwrap();

        let found = ctx
            .repositories
            .addresses
            .find_by_name(PARLIAMENT_HOUSE, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(found.total_elements, 1);
        assert_eq!(found.content[0].postal_code, "2600");
    }
}
