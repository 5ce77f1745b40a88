use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::get,
};

use partybook_auth::permissions::scopes;
use partybook_core::PartyId;

use crate::app::dto::{self, NameSearchParams, OrganisationModel, OrganisationRequest, PageParams, PagedModel};
use crate::app::routes::common::{created, no_content};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

const COLLECTION: &str = "organisations";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_organisations).post(create_organisation))
        .route("/search/findByName", get(find_by_name))
        .route("/:id", get(get_organisation).patch(update_organisation))
}

pub async fn list_organisations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<PageParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ORGANISATION_READ) {
        return denied;
    }

    match services.repositories.organisations.find_all(params.to_request()).await {
        Ok(page) => {
            Json(PagedModel::new(page, COLLECTION, "/organisations", &[], OrganisationModel::from)).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_organisation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ORGANISATION_READ) {
        return denied;
    }
    let Ok(id) = id.parse::<PartyId>() else {
        return errors::not_found();
    };

    match services.repositories.organisations.find_by_id(id).await {
        Ok(organisation) => Json(OrganisationModel::from(organisation)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Exact name match.
pub async fn find_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<NameSearchParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ORGANISATION_READ) {
        return denied;
    }

    let result = services
        .repositories
        .organisations
        .find_by_name(&params.name, params.to_request())
        .await;
    match result {
        Ok(page) => Json(PagedModel::new(
            page,
            COLLECTION,
            "/organisations/search/findByName",
            &[("name", params.name.clone())],
            OrganisationModel::from,
        ))
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_organisation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<OrganisationRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ORGANISATION_POST) {
        return denied;
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    match services.repositories.organisations.save(body.into_organisation()).await {
        Ok(saved) => created(dto::organisation_href(saved.party.id), OrganisationModel::from(saved)),
        Err(e) => errors::bad_request(e),
    }
}

pub async fn update_organisation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<OrganisationRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::ORGANISATION_PATCH) {
        return denied;
    }
    let id = match id.parse::<PartyId>() {
        Ok(id) => id,
        Err(e) => return errors::bad_request(e),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    let organisations = &services.repositories.organisations;
    let mut organisation = match organisations.find_by_id(id).await {
        Ok(organisation) => organisation,
        Err(e) => return errors::bad_request(e),
    };
    body.apply(&mut organisation);
    organisation.party.id = id;

    match organisations.update(organisation).await {
        Ok(_) => no_content(dto::organisation_href(id)),
        Err(e) => errors::bad_request(e),
    }
}
