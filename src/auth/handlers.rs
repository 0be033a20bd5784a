use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginQuery, RegisterRequest, UserData},
        services,
    },
    error::AuthError,
    pocketbase::AuthStore,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth", post(register).get(login))
}

/// POST /auth
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserData>, AuthError> {
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "register body rejected");
        AuthError::MalformedBody(e.body_text())
    })?;
    let req = parse_register_body(body)?;

    let user = services::register(
        state.users.as_ref(),
        &req,
        state.config.pocketbase.request_verification,
    )
    .await?;
    Ok(Json(user))
}

/// Only a JSON object maps onto the request; serde would otherwise accept
/// an array and assign its elements to fields by position.
fn parse_register_body(body: Value) -> Result<RegisterRequest, AuthError> {
    if !body.is_object() {
        warn!("register body is not a JSON object");
        return Err(AuthError::MalformedBody(
            "request body must be a JSON object".into(),
        ));
    }
    serde_json::from_value(body).map_err(|e| AuthError::MalformedBody(e.to_string()))
}

/// GET /auth?email=..&password=..
#[instrument(skip(state, query))]
pub async fn login(
    State(state): State<AppState>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<UserData>, AuthError> {
    let Query(query) = query.map_err(|e| {
        warn!(error = %e, "login query rejected");
        AuthError::MalformedBody(e.body_text())
    })?;
    let mut store = AuthStore::default();
    let user = services::login(state.users.as_ref(), &mut store, &query).await?;
    Ok(Json(user))
}
