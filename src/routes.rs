use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::TripError,
    flows,
    gemini::GenerativeBackend,
    models::{SetSummaryRequest, SuggestionFilters, SuggestionOptions, SummaryRequest, Trip, TripDraft, TripReplace, TripSuggestions, TripSummary},
    pdf::generate_itinerary_pdf,
    store::TripStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TripStore>,
    pub backend: Arc<dyn GenerativeBackend>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/trips", get(list_trips).post(create_trip))
        .route("/api/trips/:id", get(get_trip).put(replace_trip).delete(delete_trip))
        .route("/api/trips/:id/summary", put(set_summary).post(generate_trip_summary))
        .route("/api/trips/:id/pdf", get(export_pdf))
        .route("/api/suggestions", post(generate_suggestions))
        .route("/api/suggestions/options", get(suggestion_options))
        .route("/api/summary", post(generate_summary))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

// Malformed bodies are caller input errors like any other validation failure.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, TripError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| TripError::validation("body", rejection.body_text()))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "ready": state.store.is_ready(), "state": state.store.readiness() }))
}

pub async fn list_trips(State(state): State<AppState>) -> Json<Vec<Trip>> {
    Json(state.store.list())
}

pub async fn create_trip(
    State(state): State<AppState>,
    payload: Result<Json<TripDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Trip>), TripError> {
    let draft = body(payload)?.validated()?;
    let trip = state.store.add(draft)?;
    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn get_trip(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<Trip>, TripError> {
    state.store.get_by_id(&id).map(Json).ok_or(TripError::NotFound(id))
}

pub async fn replace_trip(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<TripReplace>, JsonRejection>,
) -> Result<Json<Trip>, TripError> {
    let TripReplace { draft, ai_summary } = body(payload)?;
    let trip = draft.validated()?.into_trip(id, ai_summary);
    Ok(Json(state.store.update(trip)?))
}

pub async fn delete_trip(Path(id): Path<String>, State(state): State<AppState>) -> Result<StatusCode, TripError> {
    state.store.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_summary(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<SetSummaryRequest>, JsonRejection>,
) -> Result<Json<Trip>, TripError> {
    let SetSummaryRequest { summary } = body(payload)?;
    Ok(Json(state.store.set_ai_summary(&id, summary)?))
}

pub async fn generate_trip_summary(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<Trip>, TripError> {
    tracing::info!("📝 Summarising trip {}", id);
    let trip = flows::summarize_stored_trip(&state.store, state.backend.as_ref(), &id).await?;
    Ok(Json(trip))
}

pub async fn export_pdf(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let Some(trip) = state.store.get_by_id(&id) else {
        return TripError::NotFound(id).into_response();
    };
    match generate_itinerary_pdf(&trip) {
        Ok(pdf_bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"trip_{}.pdf\"", id)),
            ],
            pdf_bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Failed to render itinerary for {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn generate_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<SuggestionFilters>, JsonRejection>,
) -> Result<Json<TripSuggestions>, TripError> {
    let filters = body(payload)?;
    Ok(Json(flows::generate_trip_suggestions(state.backend.as_ref(), &filters).await?))
}

pub async fn suggestion_options() -> Json<SuggestionOptions> {
    Json(SuggestionOptions::default())
}

pub async fn generate_summary(
    State(state): State<AppState>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<TripSummary>, TripError> {
    let input = body(payload)?.into_input()?;
    Ok(Json(flows::summarize_trip_details(state.backend.as_ref(), &input).await?))
}
