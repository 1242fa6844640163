use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::{dates::parse_iso_date, error::TripError};

pub const BUDGET_OPTIONS: [&str; 4] = ["economy", "moderate", "luxury", "flexible"];
pub const TRAVEL_STYLE_OPTIONS: [&str; 6] = ["adventure", "relaxation", "cultural", "family-friendly", "solo", "romantic"];

const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/600x400.png";

// Same reserved set as JavaScript's encodeURIComponent.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const MIN_NAME_CHARS: usize = 3;

/// A stored trip. Serialized with the camelCase keys of the browser storage format.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

/// A trip that has not been created yet: no id, no AI summary.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub destinations: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub activities: Option<Vec<String>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub travel_style: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
}

/// Body of a full replace: every trip field except the id, which comes from the path.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TripReplace {
    #[serde(flatten)]
    pub draft: TripDraft,
    #[serde(default)]
    pub ai_summary: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SetSummaryRequest {
    pub summary: String,
}

impl TripDraft {
    pub fn named(name: impl Into<String>, destinations: &[&str]) -> Self {
        Self {
            name: name.into(),
            destinations: Some(destinations.iter().map(|d| d.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Form-level checks applied at the HTTP boundary; the store itself accepts any draft.
    /// Name and destination lengths count characters as given, surrounding spaces included.
    /// Blank activities are dropped rather than rejected.
    pub fn validated(mut self) -> Result<Self, TripError> {
        if self.name.chars().count() < MIN_NAME_CHARS {
            return Err(TripError::validation("name", format!("must be at least {MIN_NAME_CHARS} characters")));
        }
        let destinations = self.destinations.as_deref().unwrap_or_default();
        if destinations.is_empty() {
            return Err(TripError::validation("destinations", "at least one destination is required"));
        }
        if destinations.iter().any(|d| d.is_empty()) {
            return Err(TripError::validation("destinations", "destination cannot be empty"));
        }
        for (field, value) in [("startDate", &self.start_date), ("endDate", &self.end_date)] {
            if let Some(v) = value {
                if parse_iso_date(v).is_none() {
                    return Err(TripError::validation(field, format!("not an ISO-8601 date: {v}")));
                }
            }
        }
        if let Some(url) = self.image_url.as_deref().filter(|u| !u.is_empty()) {
            if reqwest::Url::parse(url).is_err() {
                return Err(TripError::validation("imageUrl", "must be a valid URL"));
            }
        }
        if let Some(activities) = self.activities.as_mut() {
            activities.retain(|a| !a.trim().is_empty());
        }
        Ok(self)
    }

    /// Builds the stored record for `id` verbatim, without any defaulted image.
    pub fn into_trip(self, id: String, ai_summary: Option<String>) -> Trip {
        Trip {
            id,
            name: self.name,
            destinations: self.destinations.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self.notes,
            activities: self.activities.unwrap_or_default(),
            image_url: self.image_url,
            ai_summary,
            budget: self.budget,
            travel_style: self.travel_style,
            interests: self.interests,
        }
    }
}

/// Deterministic placeholder image for a trip without one, keyed by the trip name.
pub fn placeholder_image_url(name: &str) -> String {
    format!("{PLACEHOLDER_IMAGE_BASE}?text={}", utf8_percent_encode(name, URI_COMPONENT))
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFilters {
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub travel_style: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TripSuggestions {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInput {
    pub destinations: Vec<String>,
    pub activities: Vec<String>,
    pub notes: String,
}

/// Wire form of [`SummaryInput`]; every field must be present, lists may be empty.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SummaryRequest {
    #[serde(default)]
    pub destinations: Option<Vec<String>>,
    #[serde(default)]
    pub activities: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SummaryRequest {
    pub fn into_input(self) -> Result<SummaryInput, TripError> {
        let missing = |field: &str| TripError::validation(field, "is required");
        Ok(SummaryInput {
            destinations: self.destinations.ok_or_else(|| missing("destinations"))?,
            activities: self.activities.ok_or_else(|| missing("activities"))?,
            notes: self.notes.ok_or_else(|| missing("notes"))?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TripSummary {
    pub summary: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionOptions {
    pub budgets: Vec<&'static str>,
    pub travel_styles: Vec<&'static str>,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self { budgets: BUDGET_OPTIONS.to_vec(), travel_styles: TRAVEL_STYLE_OPTIONS.to_vec() }
    }
}
