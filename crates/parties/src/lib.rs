//! Parties domain module (individuals, organisations and their relationships).
//!
//! Plain records plus the pure rules that tie them together. No IO, no HTTP,
//! no storage: repositories live in `partybook-infra`.

pub mod identifier;
pub mod individual;
pub mod location;
pub mod organisation;
pub mod party;
pub mod role;

pub use identifier::{Identifier, IdentifierLifecycleStatus, IdentifierType};
pub use individual::{Individual, IndividualName};
pub use location::{Address, Location, LocationType};
pub use organisation::{LegalType, Organisation};
pub use party::{Party, PartyType};
pub use role::{PartySnapshot, Role, RoleLabels, RolePair};
