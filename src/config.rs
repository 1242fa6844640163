use std::{net::SocketAddr, path::PathBuf};

use crate::gemini::DEMO_KEY;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_PORT: u16 = 8080;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or_else(|| DEMO_KEY.into()),
            gemini_api_base: non_empty("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            data_dir: non_empty("ROAM_EASY_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
            port: non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// First characters of the key, safe to log.
    pub fn key_hint(&self) -> &str {
        let end = self.gemini_api_key.char_indices().nth(6).map(|(i, _)| i).unwrap_or(self.gemini_api_key.len());
        &self.gemini_api_key[..end]
    }
}
