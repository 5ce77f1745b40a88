use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    routing::get,
};

use partybook_auth::permissions::scopes;
use partybook_core::LocationId;

use crate::app::dto::{AddressModel, PageParams, PagedModel};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_addresses))
        .route("/:id", get(get_address))
}

pub async fn list_addresses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<PageParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ADDRESS_READ) {
        return denied;
    }

    match services.repositories.addresses.find_all(params.to_request()).await {
        Ok(page) => Json(PagedModel::new(page, "addresses", "/addresses", &[], AddressModel::from)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_address(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ADDRESS_READ) {
        return denied;
    }
    let Ok(id) = id.parse::<LocationId>() else {
        return errors::not_found();
    };

    match services.repositories.addresses.find_by_id(id).await {
        Ok(address) => Json(AddressModel::from(address)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}
