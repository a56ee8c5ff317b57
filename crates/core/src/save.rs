//! Writing decks back to their CSV files.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{
    deck::{CsvOptions, Deck},
    error::{DeckError, DeckResult},
};

/// Persists decks using the same dialect they were loaded with.
#[derive(Debug, Clone, Default)]
pub struct DeckWriter {
    options: CsvOptions,
}

impl DeckWriter {
    /// Create a writer for the given dialect.
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Overwrite the deck's source file with its current contents.
    ///
    /// Rows are staged in a temporary file next to the target and renamed
    /// over it, so a failed write leaves the previous file in place.
    pub fn save(&self, deck: &Deck) -> DeckResult<()> {
        let path = deck.path();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)
            .map_err(|err| DeckError::file("failed to stage", path, err))?;
        if let Ok(metadata) = fs::metadata(path) {
            if let Err(err) = staged.as_file().set_permissions(metadata.permissions()) {
                warn!(path = %path.display(), "Could not copy permissions: {err}");
            }
        }

        self.write_rows(deck, staged.as_file_mut())
            .map_err(|err| DeckError::file("failed to write", path, err))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|err| DeckError::file("failed to flush", path, err))?;
        staged
            .persist(path)
            .map_err(|err| DeckError::file("failed to replace", path, err.error))?;

        info!(path = %path.display(), cards = deck.len(), "Deck saved");
        Ok(())
    }

    /// Encode the deck (header first, then every card) into `out`.
    pub fn write_rows<W: Write>(&self, deck: &Deck, out: W) -> io::Result<()> {
        let delimiter = self.options.delimiter_byte().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported delimiter {:?}", self.options.delimiter),
            )
        })?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(false)
            .from_writer(out);
        if let Some(headers) = deck.headers() {
            writer.write_record(headers).map_err(io::Error::from)?;
        }
        for card in deck.cards() {
            writer.write_record(card.fields()).map_err(io::Error::from)?;
        }
        writer.flush()
    }
}
