use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::get,
};

use partybook_auth::permissions::scopes;
use partybook_core::PartyId;

use crate::app::dto::{self, IndividualModel, IndividualRequest, NameSearchParams, PageParams, PagedModel};
use crate::app::routes::common::{created, no_content};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

const COLLECTION: &str = "individuals";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_individuals).post(create_individual))
        .route("/search/findByFamilyNameStartsWith", get(find_by_family_name_starts_with))
        .route("/:id", get(get_individual).patch(update_individual))
}

pub async fn list_individuals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<PageParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::INDIVIDUAL_READ) {
        return denied;
    }

    match services.repositories.individuals.find_all(params.to_request()).await {
        Ok(page) => Json(PagedModel::new(page, COLLECTION, "/individuals", &[], IndividualModel::from)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_individual(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::INDIVIDUAL_READ) {
        return denied;
    }
    // An id that cannot exist is reported the same as an unknown one.
    let Ok(id) = id.parse::<PartyId>() else {
        return errors::not_found();
    };

    match services.repositories.individuals.find_by_id(id).await {
        Ok(individual) => Json(IndividualModel::from(individual)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn find_by_family_name_starts_with(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<NameSearchParams>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::INDIVIDUAL_READ) {
        return denied;
    }

    let result = services
        .repositories
        .individuals
        .find_by_family_name_starts_with(&params.name, params.to_request())
        .await;
    match result {
        Ok(page) => Json(PagedModel::new(
            page,
            COLLECTION,
            "/individuals/search/findByFamilyNameStartsWith",
            &[("name", params.name.clone())],
            IndividualModel::from,
        ))
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Always inserts under a fresh id.
pub async fn create_individual(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<IndividualRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::INDIVIDUAL_POST) {
        return denied;
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    match services.repositories.individuals.save(body.into_individual()).await {
        Ok(saved) => created(dto::individual_href(saved.party.id), IndividualModel::from(saved)),
        Err(e) => errors::bad_request(e),
    }
}

/// Merge the body into the stored record. The path id always wins.
pub async fn update_individual(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<IndividualRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::guard(&principal, &scopes::INDIVIDUAL_PATCH) {
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

    let individuals = &services.repositories.individuals;
    let mut individual = match individuals.find_by_id(id).await {
        Ok(individual) => individual,
        Err(e) => return errors::bad_request(e),
    };
    body.apply(&mut individual);
    individual.party.id = id;

    match individuals.update(individual).await {
        Ok(_) => no_content(dto::individual_href(id)),
        Err(e) => errors::bad_request(e),
    }
}
