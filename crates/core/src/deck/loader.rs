use std::{fs::File, io::Read, path::Path};

use tracing::{debug, info};

use super::{CsvOptions, Deck};
use crate::{
    error::{DeckError, DeckResult},
    models::Card,
};

/// Reads deck files using a fixed CSV dialect.
#[derive(Debug, Clone, Default)]
pub struct DeckLoader {
    options: CsvOptions,
}

impl DeckLoader {
    /// Build a loader for the given dialect.
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Dialect used by this loader.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Load every row of the file at `path`, in file order.
    ///
    /// Rows whose column count differs from the first record are rejected
    /// with [`DeckError::Format`]; nothing is recovered from a partial read.
    pub fn load(&self, path: impl AsRef<Path>) -> DeckResult<Deck> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| DeckError::file("failed to open", path, err))?;
        let deck = self.read_from(path, file)?;
        info!(
            path = %path.display(),
            cards = deck.len(),
            columns = deck.width(),
            "Deck loaded"
        );
        Ok(deck)
    }

    /// Decode a deck from any reader; `path` is recorded as the deck's save target.
    pub fn read_from<R: Read>(&self, path: &Path, source: R) -> DeckResult<Deck> {
        let delimiter = self.options.delimiter_byte().ok_or_else(|| DeckError::Format {
            path: path.to_path_buf(),
            line: 0,
            detail: format!("unsupported delimiter {:?}", self.options.delimiter),
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .delimiter(delimiter)
            .from_reader(source);

        let mut headers = None;
        let mut cards = Vec::new();
        let mut width = 0;

        for result in reader.records() {
            let record = result.map_err(|err| map_csv_error(path, err))?;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            width = fields.len();
            if self.options.has_headers && headers.is_none() && cards.is_empty() {
                debug!(columns = width, "Header row read");
                headers = Some(fields);
                continue;
            }
            cards.push(Card::new(fields));
        }
        if self.options.has_headers && headers.is_none() {
            headers = Some(Vec::new());
        }

        Ok(Deck::new(path, headers, cards, width))
    }
}

fn map_csv_error(path: &Path, err: csv::Error) -> DeckError {
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    let malformed = |line: u64, detail: String| DeckError::Format {
        path: path.to_path_buf(),
        line,
        detail,
    };
    match err.into_kind() {
        csv::ErrorKind::Io(source) => DeckError::file("failed to read", path, source),
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => malformed(
            pos.map(|pos| pos.line()).unwrap_or(line),
            format!("expected {expected_len} fields, found {len}"),
        ),
        csv::ErrorKind::Utf8 { pos, err } => malformed(
            pos.map(|pos| pos.line()).unwrap_or(line),
            format!("field {} is not valid UTF-8", err.field() + 1),
        ),
        other => malformed(line, format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "term,meaning\napple,a fruit\nbank,a financial institution\n";

    #[test]
    fn loads_rows_in_file_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("words.csv");
        fs::write(&path, SAMPLE)?;

        let deck = DeckLoader::default().load(&path)?;
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.width(), 2);
        assert_eq!(deck.path(), path.as_path());
        assert_eq!(
            deck.headers(),
            Some(&["term".to_string(), "meaning".to_string()][..])
        );
        assert_eq!(deck.cards()[0].field(0), "apple");
        assert_eq!(deck.cards()[1].field(1), "a financial institution");
        Ok(())
    }

    #[test]
    fn headerless_files_keep_first_row_as_card() -> Result<()> {
        let loader = DeckLoader::new(CsvOptions {
            delimiter: ';',
            has_headers: false,
        });
        let deck = loader.read_from(Path::new("mem.csv"), "apple;りんご\nbook;本\n".as_bytes())?;
        assert!(deck.headers().is_none());
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.cards()[0].field(1), "りんご");
        Ok(())
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let dir = tempdir().unwrap();
        let err = DeckLoader::default()
            .load(dir.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, DeckError::File { .. }));
    }

    #[test]
    fn inconsistent_columns_are_a_format_error() {
        let input = "term,meaning\napple,a fruit\nbank,a,bank\n";
        let err = DeckLoader::default()
            .read_from(Path::new("bad.csv"), input.as_bytes())
            .unwrap_err();
        match err {
            DeckError::Format { line, detail, .. } => {
                assert_eq!(line, 3);
                assert_eq!(detail, "expected 2 fields, found 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_and_header_only_files_yield_empty_decks() -> Result<()> {
        let loader = DeckLoader::default();
        let empty = loader.read_from(Path::new("empty.csv"), "".as_bytes())?;
        assert!(empty.is_empty());
        assert_eq!(empty.width(), 0);
        assert!(empty.headers().is_none());
        assert!(empty.awaits_header());

        let header_only = loader.read_from(Path::new("h.csv"), "term,meaning\n".as_bytes())?;
        assert!(header_only.is_empty());
        assert_eq!(header_only.width(), 2);
        assert_eq!(header_only.column_label(1), Some("meaning"));
        Ok(())
    }

    #[test]
    fn unusable_delimiter_is_rejected() {
        let loader = DeckLoader::new(CsvOptions {
            delimiter: '、',
            has_headers: true,
        });
        let err = loader
            .read_from(Path::new("x.csv"), "a、b\n".as_bytes())
            .unwrap_err();
        match err {
            DeckError::Format { line, detail, .. } => {
                assert_eq!(line, 0);
                assert!(detail.contains("unsupported delimiter"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn quoted_fields_survive() -> Result<()> {
        let input = "term,meaning\n\"bank\",\"a place, for money\"\n";
        let deck = DeckLoader::default().read_from(Path::new("q.csv"), input.as_bytes())?;
        assert_eq!(deck.cards()[0].field(1), "a place, for money");
        Ok(())
    }
}
