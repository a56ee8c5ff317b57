#![warn(clippy::all, missing_docs)]

//! Core domain logic for the wordcards flashcard viewer.
//!
//! This crate hosts the card and deck models, configuration handling,
//! CSV loading and persistence, and the study session used by the
//! terminal UI.

pub mod config;
pub mod deck;
pub mod error;
pub mod models;
pub mod progress;
pub mod save;
pub mod session;

pub use config::AppConfig;
pub use deck::{CsvOptions, Deck, DeckLoader};
pub use error::{DeckError, DeckResult};
pub use models::{Card, CardLayout};
pub use progress::ProgressStore;
pub use save::DeckWriter;
pub use session::{Cursor, StudySession};
