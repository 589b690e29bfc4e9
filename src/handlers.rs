use crate::accounts;
use crate::errors::AppError;
use crate::models::{Counters, CredentialsRequest, DeltaRequest, SessionResponse, TargetsRequest};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .commit(|data| accounts::register(data, &payload.username, &payload.password, Utc::now()))
        .await?;

    info!(username = payload.username.trim(), "account registered");
    Ok(Json(SessionResponse { session }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let now = Utc::now();
    let session = state
        .commit(|data| {
            accounts::prune_sessions(data, now);
            accounts::login(data, &payload.username, &payload.password, now)
        })
        .await?;

    Ok(Json(SessionResponse { session }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let session = session_token(&headers)?;
    state
        .commit_if_changed(|data| Ok(((), accounts::logout(data, session))))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_counters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Counters>, AppError> {
    let session = session_token(&headers)?;
    let counters = state
        .commit_if_changed(|data| accounts::fetch_counters(data, session, Utc::now()))
        .await?;
    Ok(Json(counters))
}

pub async fn apply_delta(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeltaRequest>,
) -> Result<Json<Counters>, AppError> {
    let session = session_token(&headers)?;
    let counters = state
        .commit(|data| accounts::apply_delta(data, session, payload.delta, Utc::now()))
        .await?;

    info!(delta = payload.delta, total = counters.total_count, "delta applied");
    Ok(Json(counters))
}

pub async fn update_targets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TargetsRequest>,
) -> Result<Json<Counters>, AppError> {
    let session = session_token(&headers)?;
    let counters = state
        .commit(|data| accounts::update_targets(data, session, payload, Utc::now()))
        .await?;

    Ok(Json(counters))
}

fn session_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("missing session"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;
    use axum::http::HeaderValue;

    fn bearer(session: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {session}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn unpersisted_delta_is_not_applied_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = AppData::default();
        let session = accounts::register(&mut data, "mira", "pw", Utc::now()).unwrap();
        let data_dir = dir.path().join("not-created-yet");
        let state = AppState::new(data_dir.join("accounts.json"), data);

        for _ in 0..2 {
            let err = apply_delta(
                State(state.clone()),
                bearer(&session),
                Json(DeltaRequest { delta: 3 }),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(state.data.lock().await.accounts["mira"].counters.total_count, 0);

        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        let Json(counters) = apply_delta(
            State(state.clone()),
            bearer(&session),
            Json(DeltaRequest { delta: 3 }),
        )
        .await
        .unwrap();
        assert_eq!(counters.total_count, 3);
        assert_eq!(counters.daily_count, 3);
    }

    #[tokio::test]
    async fn unpersisted_registration_leaves_no_account() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            dir.path().join("missing").join("accounts.json"),
            AppData::default(),
        );
        let payload = CredentialsRequest {
            username: "mira".to_string(),
            password: "pw".to_string(),
        };

        let err = register(State(state.clone()), Json(payload)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let data = state.data.lock().await;
        assert!(data.accounts.is_empty());
        assert!(data.sessions.is_empty());
    }
}
