use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 201 with a `Location` header and the stored model.
pub fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}

/// 204 with a `Location` header.
pub fn no_content(location: String) -> Response {
    (StatusCode::NO_CONTENT, [(header::LOCATION, location)]).into_response()
}
