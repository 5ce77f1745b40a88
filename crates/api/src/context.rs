use partybook_auth::{JwtClaims, Principal};

/// The authenticated principal for one request, stored as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

impl From<Principal> for PrincipalContext {
    fn from(principal: Principal) -> Self {
        Self { principal }
    }
}

impl From<&JwtClaims> for PrincipalContext {
    fn from(claims: &JwtClaims) -> Self {
        Principal::from(claims).into()
    }
}
