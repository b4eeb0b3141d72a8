//! REST endpoint handlers organized by resource.

pub mod poll;
pub mod room;
pub mod system;

use axum::extract::Path;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::EngineError;

/// Composes all resource routes mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(room::routes())
        .merge(poll::routes())
}

/// Unwraps a JSON body, turning extractor rejections into
/// [`EngineError::InvalidRequest`] so they share the error envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, EngineError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| EngineError::InvalidRequest(e.body_text()))
}

/// Unwraps a path parameter the same way as [`json_body`].
fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, EngineError> {
    param
        .map(|Path(value)| value)
        .map_err(|e| EngineError::InvalidRequest(e.body_text()))
}
