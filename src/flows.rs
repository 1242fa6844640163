//! Prompt flows: validate the caller's input, render a fixed template, run it
//! against a [`GenerativeBackend`] once, and check the answer's shape.
//!
//! Nothing here retries, caches, or persists; the only side effect is the
//! outbound backend call.

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::TripError,
    gemini::{GeminiError, GenerativeBackend, PromptRequest},
    models::{SuggestionFilters, SummaryInput, Trip, TripSuggestions, TripSummary},
    store::TripStore,
};

pub const SUGGESTIONS_PROMPT: &str = "trip_suggestions";
pub const SUMMARY_PROMPT: &str = "trip_summary";

pub fn suggestions_prompt(filters: &SuggestionFilters) -> String {
    format!(
        "You are a trip planning expert who tailors travel ideas to a traveller's interests, budget and travel style.\n\n\
        Interests: {}\n\
        Budget: {}\n\
        Travel Style: {}\n\
        Location: {}\n\n\
        Using the preferences above, suggest trips personalised to this traveller. \
        If no location is given, suggestions may be anywhere in the world. \
        Answer with a list of suggestion strings.",
        filters.interests,
        filters.budget,
        filters.travel_style,
        filters.location.as_deref().unwrap_or_default(),
    )
}

pub fn summary_prompt(input: &SummaryInput) -> String {
    format!(
        "You are a helpful travel assistant. Summarise the trip below in a concise form that is easy to share.\n\n\
        Destinations: {}\n\
        Activities: {}\n\
        Notes: {}\n\n\
        Summary:",
        input.destinations.join(", "),
        input.activities.join(", "),
        input.notes,
    )
}

fn require_non_empty(field: &str, value: &str) -> Result<(), TripError> {
    if value.trim().is_empty() {
        return Err(TripError::validation(field, "must not be empty"));
    }
    Ok(())
}

async fn run_prompt<T: DeserializeOwned>(
    backend: &dyn GenerativeBackend,
    request: PromptRequest,
) -> Result<T, TripError> {
    let value = backend.generate(&request).await.map_err(|e| {
        warn!("❌ Prompt '{}' failed: {}", request.name, e);
        e
    })?;
    serde_json::from_value(value).map_err(|e| {
        warn!("❌ Prompt '{}' returned an unexpected shape: {}", request.name, e);
        TripError::Upstream(GeminiError::Shape(e.to_string()))
    })
}

/// Personalised trip ideas for the given filters, in the order the model produced them.
pub async fn generate_trip_suggestions(
    backend: &dyn GenerativeBackend,
    filters: &SuggestionFilters,
) -> Result<TripSuggestions, TripError> {
    require_non_empty("interests", &filters.interests)?;
    require_non_empty("budget", &filters.budget)?;
    require_non_empty("travelStyle", &filters.travel_style)?;

    let request = PromptRequest {
        name: SUGGESTIONS_PROMPT,
        text: suggestions_prompt(filters),
        output_schema: json!({
            "type": "OBJECT",
            "properties": {
                "suggestions": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["suggestions"]
        }),
    };
    let out: TripSuggestions = run_prompt(backend, request).await?;
    info!("✨ Generated {} trip suggestions", out.suggestions.len());
    Ok(out)
}

/// A shareable summary of a trip's destinations, activities and notes.
/// Empty lists are accepted here; callers decide whether a summary makes sense.
pub async fn summarize_trip_details(
    backend: &dyn GenerativeBackend,
    input: &SummaryInput,
) -> Result<TripSummary, TripError> {
    let request = PromptRequest {
        name: SUMMARY_PROMPT,
        text: summary_prompt(input),
        output_schema: json!({
            "type": "OBJECT",
            "properties": { "summary": { "type": "STRING" } },
            "required": ["summary"]
        }),
    };
    run_prompt(backend, request).await
}

/// Summarises a stored trip and records the result as its AI summary.
pub async fn summarize_stored_trip(
    store: &TripStore,
    backend: &dyn GenerativeBackend,
    trip_id: &str,
) -> Result<Trip, TripError> {
    let trip = store.get_by_id(trip_id).ok_or_else(|| TripError::NotFound(trip_id.to_string()))?;
    if trip.destinations.is_empty() {
        return Err(TripError::validation("destinations", "add destinations before summarising"));
    }
    if trip.activities.is_empty() {
        return Err(TripError::validation("activities", "add activities before summarising"));
    }

    let input = SummaryInput {
        destinations: trip.destinations,
        activities: trip.activities,
        notes: trip.notes.unwrap_or_default(),
    };
    let TripSummary { summary } = summarize_trip_details(backend, &input).await?;
    store.set_ai_summary(trip_id, summary)
}
