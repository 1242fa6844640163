pub mod config;
pub mod dates;
pub mod error;
pub mod flows;
pub mod gemini;
pub mod models;
pub mod pdf;
pub mod routes;
pub mod slot;
pub mod store;
