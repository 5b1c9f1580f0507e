use axum::{
    extract::{FromRequest, FromRequestParts, Json, Path, Query},
};

use crate::error::ApiError;

// Thin wrappers over axum's extractors so malformed input is rejected with the
// same `{"message": ...}` body as every other error.

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
