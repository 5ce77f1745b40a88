use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use partybook_auth::permissions::scopes;
use partybook_core::RoleId;

use crate::app::dto::{self, LinkPartiesRequest, PagedModel, PartySearchParams, RoleModel, RolePairModel};
use crate::app::routes::common::created;
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(link_parties))
        .route("/search/findByPartyId", get(find_by_party_id))
        .route("/:id", get(get_role))
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ROLE_READ) {
        return denied;
    }
    let Ok(id) = id.parse::<RoleId>() else {
        return errors::not_found();
    };

    match services.repositories.roles.find_by_id(id).await {
        Ok(role) => Json(RoleModel::from(role)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Roles owned by `partyId`, ordered by id.
pub async fn find_by_party_id(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<PartySearchParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ROLE_READ) {
        return denied;
    }

    let result = services
        .repositories
        .roles
        .find_by_party_id(params.party_id, params.to_request())
        .await;
    match result {
        Ok(page) => Json(PagedModel::new(
            page,
            "roles",
            "/roles/search/findByPartyId",
            &[("partyId", params.party_id.to_string())],
            RoleModel::from,
        ))
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Link two stored parties with a reciprocal pair of roles.
pub async fn link_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<LinkPartiesRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ROLE_POST) {
        return denied;
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    let labels = body.labels();
    match services
        .relationships
        .link_by_id(body.party_id, body.reciprocal_party_id, &labels)
        .await
    {
        Ok((forward, reverse)) => {
            let location = dto::role_href(forward.id);
            created(
                location,
                RolePairModel {
                    role: RoleModel::from(forward),
                    reciprocal: RoleModel::from(reverse),
                },
            )
        }
        Err(e) => errors::bad_request(e),
    }
}
