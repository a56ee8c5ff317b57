//! Deck storage and CSV loading.

/// CSV decoding of deck files.
pub mod loader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::Card;

pub use loader::DeckLoader;

/// Dialect options shared by the loader and the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator. Must be a single ASCII character.
    pub delimiter: char,
    /// Treat the first record as a header row that is kept but not shown as a card.
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
        }
    }
}

impl CsvOptions {
    /// The delimiter as a byte, or `None` when it is not a single ASCII
    /// character usable as a separator (quotes and line breaks are rejected).
    pub fn delimiter_byte(&self) -> Option<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|byte| byte.is_ascii() && !matches!(*byte, b'"' | b'\n' | b'\r'))
    }
}

/// An ordered collection of cards loaded from a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    path: PathBuf,
    headers: Option<Vec<String>>,
    cards: Vec<Card>,
    width: usize,
}

impl Deck {
    /// Assemble a deck. `width` is the column count every row shares.
    /// `Some(vec![])` as `headers` marks a headed deck whose file was empty;
    /// the header is filled in when the first card is added.
    pub fn new(
        path: impl Into<PathBuf>,
        headers: Option<Vec<String>>,
        cards: Vec<Card>,
        width: usize,
    ) -> Self {
        Self {
            path: path.into(),
            headers,
            cards,
            width,
        }
    }

    /// File the deck was read from and is written back to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header record, if the file has one.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref().filter(|headers| !headers.is_empty())
    }

    /// A header is expected but the file had no rows to take it from.
    pub(crate) fn awaits_header(&self) -> bool {
        matches!(&self.headers, Some(headers) if headers.is_empty())
    }

    pub(crate) fn set_headers(&mut self, headers: Vec<String>) {
        if self.width == 0 {
            self.width = headers.len();
        }
        self.headers = Some(headers);
    }

    /// Header text for a column, when present and non-blank.
    pub fn column_label(&self, column: usize) -> Option<&str> {
        self.headers
            .as_ref()?
            .get(column)
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
    }

    /// All cards in file order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Card at `index`.
    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Column count shared by every row (0 for a file with no records).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Append a card, shaping it to the deck width. An empty, headerless
    /// deck adopts the width of the first card pushed.
    pub(crate) fn push(&mut self, mut card: Card) -> usize {
        if self.width == 0 {
            self.width = card.width();
        }
        card.fit_width(self.width);
        self.cards.push(card);
        self.cards.len() - 1
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Card> {
        (index < self.cards.len()).then(|| self.cards.remove(index))
    }
}
