//! Shared domain models.

use serde::{Deserialize, Serialize};

/// One row of a deck, fields kept in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Card {
    fields: Vec<String>,
}

impl Card {
    /// Build a card from its raw fields.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Field at `index`, or `""` when the row is shorter.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// All fields in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of columns in this row.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Replace a single field. Returns `false` if `index` is out of range.
    pub fn set_field(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Pad with empty fields or truncate so the row has exactly `width` columns.
    pub fn fit_width(&mut self, width: usize) {
        self.fields.resize(width, String::new());
    }
}

/// Which columns of a row make up the term, the detail and the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    /// Column shown on the front of the card.
    pub term_column: usize,
    /// Columns revealed by the detail view. `None` means every other column.
    pub detail_columns: Option<Vec<usize>>,
    /// Column whose value groups cards (a genre, a lesson). Navigation can be
    /// narrowed to one group at a time.
    pub group_column: Option<usize>,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            term_column: 0,
            detail_columns: None,
            group_column: None,
        }
    }
}

impl CardLayout {
    /// The front-side text of `card`.
    pub fn term<'a>(&self, card: &'a Card) -> &'a str {
        card.field(self.term_column)
    }

    /// Column indices used for the detail view of a deck `width` columns wide.
    pub fn detail_indices(&self, width: usize) -> Vec<usize> {
        match &self.detail_columns {
            Some(columns) => columns
                .iter()
                .copied()
                .filter(|idx| *idx < width && *idx != self.term_column)
                .collect(),
            None => (0..width).filter(|idx| *idx != self.term_column).collect(),
        }
    }

    /// `(column, value)` pairs revealed by the detail view.
    pub fn details<'a>(&self, card: &'a Card, width: usize) -> Vec<(usize, &'a str)> {
        self.detail_indices(width)
            .into_iter()
            .map(|idx| (idx, card.field(idx)))
            .collect()
    }

    /// Group of `card`, trimmed. `None` when no group column is configured.
    pub fn group<'a>(&self, card: &'a Card) -> Option<&'a str> {
        self.group_column.map(|column| card.field(column).trim())
    }

    /// Columns the editor walks through: term first, then detail, then the
    /// group column if the detail view leaves it out.
    pub fn editable_columns(&self, width: usize) -> Vec<usize> {
        let mut columns = Vec::with_capacity(width);
        if self.term_column < width {
            columns.push(self.term_column);
        }
        columns.extend(self.detail_indices(width));
        if let Some(group) = self.group_column {
            if group < width && !columns.contains(&group) {
                columns.push(group);
            }
        }
        columns
    }

    /// Header written for a deck that had none to keep: `term`, `group`,
    /// then `detail`, `detail 2`, ... for the remaining columns.
    pub fn default_labels(&self, width: usize) -> Vec<String> {
        let mut details = 0;
        (0..width)
            .map(|column| {
                if column == self.term_column {
                    "term".to_string()
                } else if Some(column) == self.group_column {
                    "group".to_string()
                } else {
                    details += 1;
                    match details {
                        1 => "detail".to_string(),
                        n => format!("detail {n}"),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(fields: &[&str]) -> Card {
        Card::new(fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn default_layout_uses_first_column_as_term() {
        let layout = CardLayout::default();
        let card = card(&["apple", "a fruit", "food"]);
        assert_eq!(layout.term(&card), "apple");
        assert_eq!(layout.details(&card, 3), vec![(1, "a fruit"), (2, "food")]);
    }

    #[test]
    fn explicit_detail_columns_skip_term_and_out_of_range() {
        let layout = CardLayout {
            term_column: 1,
            detail_columns: Some(vec![1, 2, 0, 7]),
            group_column: None,
        };
        assert_eq!(layout.detail_indices(3), vec![2, 0]);
        assert_eq!(layout.editable_columns(3), vec![1, 2, 0]);
    }

    #[test]
    fn group_column_is_trimmed_and_stays_editable() {
        let layout = CardLayout {
            term_column: 0,
            detail_columns: Some(vec![1]),
            group_column: Some(2),
        };
        let card = card(&["apple", "a fruit", " food "]);
        assert_eq!(layout.group(&card), Some("food"));
        assert_eq!(layout.editable_columns(3), vec![0, 1, 2]);
        assert_eq!(CardLayout::default().group(&card), None);
    }

    #[test]
    fn default_labels_name_every_column() {
        let layout = CardLayout {
            term_column: 1,
            detail_columns: None,
            group_column: Some(3),
        };
        assert_eq!(
            layout.default_labels(5),
            vec!["detail", "term", "detail 2", "group", "detail 3"]
        );
        assert_eq!(CardLayout::default().default_labels(2), vec!["term", "detail"]);
    }

    #[test]
    fn fit_width_pads_and_truncates() {
        let mut short = card(&["bank"]);
        short.fit_width(3);
        assert_eq!(short.fields(), &["bank", "", ""]);

        let mut long = card(&["a", "b", "c", "d"]);
        long.fit_width(2);
        assert_eq!(long.fields(), &["a", "b"]);
        assert!(!long.set_field(5, "x"));
        assert_eq!(long.field(5), "");
    }
}
