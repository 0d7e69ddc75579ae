use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::AppError,
    response::Envelope,
    state::AppState,
    users::{
        dto::{UserRegister, UserUpdatePassword},
        repo_types::User,
    },
    validation::ValidatedJson,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/update", put(update))
        .route("/list", get(list))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UserRegister>,
) -> Result<Json<Envelope>, AppError> {
    state.users.register(&payload).await?;
    info!("user registered");
    Ok(Json(Envelope::ok("User registered successfully")))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn update(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UserUpdatePassword>,
) -> Result<Json<Envelope>, AppError> {
    state.users.update_password(&payload).await?;
    info!("user password updated");
    Ok(Json(Envelope::ok("User updated successfully")))
}

#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Envelope<Vec<User>>>, AppError> {
    let users = state.users.list().await?;
    info!(count = users.len(), "users listed");
    Ok(Json(Envelope::success("Users listed successfully", users)))
}
