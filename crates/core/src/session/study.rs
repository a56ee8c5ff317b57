use tracing::{debug, info};

use super::Cursor;
use crate::{
    deck::Deck,
    error::DeckResult,
    models::{Card, CardLayout},
    save::DeckWriter,
};

/// A deck being studied: one cursor, one detail toggle, and a dirty flag
/// tracking edits not yet written back.
///
/// With a group column configured, navigation can be narrowed to the cards
/// of one group. `None` means every card is in scope.
#[derive(Debug, Clone)]
pub struct StudySession {
    deck: Deck,
    layout: CardLayout,
    cursor: Cursor,
    detail_visible: bool,
    dirty: bool,
    active_group: Option<String>,
}

impl StudySession {
    /// Start at the first card with the detail hidden.
    pub fn new(deck: Deck, layout: CardLayout) -> Self {
        let cursor = Cursor::new(deck.len());
        Self {
            deck,
            layout,
            cursor,
            detail_visible: false,
            dirty: false,
            active_group: None,
        }
    }

    /// Start at a remembered position, clamped into the deck.
    pub fn resume_at(deck: Deck, layout: CardLayout, index: usize) -> Self {
        let mut session = Self::new(deck, layout);
        session.cursor = Cursor::at(index, session.deck.len());
        session
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    pub fn index(&self) -> Option<usize> {
        self.cursor.index()
    }

    pub fn len(&self) -> usize {
        self.deck.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deck.is_empty()
    }

    /// Card under the cursor.
    pub fn current(&self) -> Option<&Card> {
        self.cursor.index().and_then(|idx| self.deck.get(idx))
    }

    /// Front-side text of the current card.
    pub fn term(&self) -> Option<&str> {
        self.current().map(|card| self.layout.term(card))
    }

    /// Labelled detail fields of the current card.
    pub fn details(&self) -> Vec<(String, &str)> {
        let Some(card) = self.current() else {
            return Vec::new();
        };
        self.layout
            .details(card, self.deck.width())
            .into_iter()
            .map(|(column, value)| (self.column_label(column), value))
            .collect()
    }

    /// Header text for `column`, or a positional fallback.
    pub fn column_label(&self, column: usize) -> String {
        self.deck
            .column_label(column)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Column {}", column + 1))
    }

    /// `"3/10"` style position within the active scope, `"0/0"` when empty.
    pub fn position_label(&self) -> String {
        let Some(idx) = self.cursor.index() else {
            return "0/0".to_string();
        };
        if self.active_group.is_none() {
            return format!("{}/{}", idx + 1, self.deck.len());
        }
        let members = self.members();
        let position = members.iter().position(|member| *member == idx).unwrap_or(0);
        format!("{}/{}", position + 1, members.len())
    }

    /// Cards reachable by navigation: the active group, or the whole deck.
    pub fn scope_len(&self) -> usize {
        match self.active_group {
            None => self.deck.len(),
            Some(_) => self.members().len(),
        }
    }

    /// Distinct groups in order of first appearance. Empty without a group column.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for card in self.deck.cards() {
            if let Some(group) = self.layout.group(card) {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// Group navigation is narrowed to, if any.
    pub fn active_group(&self) -> Option<&str> {
        self.active_group.as_deref()
    }

    /// Step to the next group, wrapping from the last group back to all
    /// cards. Entering a group moves the cursor onto its first card.
    pub fn cycle_group(&mut self) -> Option<&str> {
        let groups = self.groups();
        let next = match &self.active_group {
            None => groups.first().copied(),
            Some(active) => groups
                .iter()
                .position(|group| group == active)
                .and_then(|pos| groups.get(pos + 1))
                .copied(),
        }
        .map(str::to_string);
        self.active_group = next;
        if self.active_group.is_some() {
            if let Some(first) = self.members().first().copied() {
                self.cursor.jump(first, self.deck.len());
            }
        }
        self.detail_visible = false;
        debug!(group = ?self.active_group, "Group scope changed");
        self.active_group.as_deref()
    }

    fn in_scope(&self, index: usize) -> bool {
        match &self.active_group {
            None => true,
            Some(active) => self
                .deck
                .get(index)
                .and_then(|card| self.layout.group(card))
                .is_some_and(|group| group == active),
        }
    }

    fn members(&self) -> Vec<usize> {
        (0..self.deck.len()).filter(|idx| self.in_scope(*idx)).collect()
    }

    fn move_to(&mut self, target: Option<usize>) -> bool {
        let moved = match target {
            Some(idx) => self.cursor.jump(idx, self.deck.len()),
            None => false,
        };
        self.after_move(moved)
    }

    pub fn advance(&mut self) -> bool {
        if self.active_group.is_none() {
            let moved = self.cursor.advance(self.deck.len());
            return self.after_move(moved);
        }
        let Some(idx) = self.cursor.index() else {
            return false;
        };
        let target = (idx + 1..self.deck.len()).find(|next| self.in_scope(*next));
        self.move_to(target)
    }

    pub fn retreat(&mut self) -> bool {
        if self.active_group.is_none() {
            let moved = self.cursor.retreat();
            return self.after_move(moved);
        }
        let Some(idx) = self.cursor.index() else {
            return false;
        };
        let target = (0..idx).rev().find(|prev| self.in_scope(*prev));
        self.move_to(target)
    }

    pub fn first(&mut self) -> bool {
        let target = self.members().first().copied();
        self.move_to(target)
    }

    pub fn last(&mut self) -> bool {
        let target = self.members().last().copied();
        self.move_to(target)
    }

    fn after_move(&mut self, moved: bool) -> bool {
        if moved {
            self.detail_visible = false;
        }
        moved
    }

    /// Flip the detail view for the current card. Returns the new state.
    pub fn toggle_detail(&mut self) -> bool {
        if self.cursor.index().is_some() {
            self.detail_visible = !self.detail_visible;
        }
        self.detail_visible
    }

    pub fn detail_visible(&self) -> bool {
        self.detail_visible
    }

    /// Edits made since the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace one column of the current card. Returns `false` when there is
    /// no current card, the column is out of range, or the value is unchanged.
    pub fn edit_current(&mut self, column: usize, value: impl Into<String>) -> bool {
        let Some(idx) = self.cursor.index() else {
            return false;
        };
        let value = value.into();
        let Some(card) = self.deck.get_mut(idx) else {
            return false;
        };
        if column >= card.width() || card.field(column) == value {
            return false;
        }
        card.set_field(column, value);
        self.dirty = true;
        self.follow_current_group();
        debug!(index = idx, column, "Card edited");
        true
    }

    /// Append a card and move the cursor onto it.
    ///
    /// A headed deck loaded from an empty file gets a generated header first,
    /// so the new card is not taken for the header when the file is reread.
    pub fn add_card(&mut self, fields: Vec<String>) -> usize {
        if self.deck.awaits_header() {
            let width = fields
                .len()
                .max(self.layout.term_column + 1)
                .max(self.deck.width());
            self.deck.set_headers(self.layout.default_labels(width));
        }
        let index = self.deck.push(Card::new(fields));
        self.cursor.jump(index, self.deck.len());
        self.detail_visible = false;
        self.dirty = true;
        self.follow_current_group();
        info!(index, total = self.deck.len(), "Card added");
        index
    }

    /// Remove the current card. The cursor keeps its index, clamped to the
    /// new last card, or is disabled once the deck is empty. Inside a group
    /// it settles on the next member, else the previous one; when the group
    /// empties, every card is back in scope.
    pub fn delete_current(&mut self) -> Option<Card> {
        let idx = self.cursor.index()?;
        let removed = self.deck.remove(idx)?;
        self.cursor.clamp(self.deck.len());
        if self.active_group.is_some() {
            let members = self.members();
            let target = members
                .iter()
                .find(|member| **member >= idx)
                .or_else(|| members.last())
                .copied();
            match target {
                Some(member) => {
                    self.cursor.jump(member, self.deck.len());
                }
                None => self.active_group = None,
            }
        }
        self.detail_visible = false;
        self.dirty = true;
        info!(index = idx, remaining = self.deck.len(), "Card deleted");
        Some(removed)
    }

    // An edited or added card whose group differs takes the scope with it.
    fn follow_current_group(&mut self) {
        if self.active_group.is_none() {
            return;
        }
        let group = self
            .current()
            .and_then(|card| self.layout.group(card))
            .map(str::to_string);
        if group.is_some() && group != self.active_group {
            self.active_group = group;
        }
    }

    /// Write the deck back to its source file. The dirty flag is cleared
    /// only when the write succeeds.
    pub fn save(&mut self, writer: &DeckWriter) -> DeckResult<()> {
        writer.save(&self.deck)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckLoader;
    use anyhow::Result;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    const SAMPLE: &str = "term,meaning\napple,a fruit\nbank,a financial institution\n";

    const GENRES: &str = "term,meaning,genre\n\
        apple,a fruit,food\n\
        book,a bound text,school\n\
        bread,baked dough,food\n\
        pencil,a writing tool,school\n\
        rice,a grain,food\n";

    fn session(input: &str) -> StudySession {
        let deck = DeckLoader::default()
            .read_from(Path::new("mem.csv"), input.as_bytes())
            .expect("valid deck");
        StudySession::new(deck, CardLayout::default())
    }

    fn grouped(input: &str) -> StudySession {
        let deck = DeckLoader::default()
            .read_from(Path::new("mem.csv"), input.as_bytes())
            .expect("valid deck");
        let layout = CardLayout {
            group_column: Some(2),
            ..CardLayout::default()
        };
        StudySession::new(deck, layout)
    }

    #[test]
    fn navigation_walks_in_file_order() {
        let mut s = session(SAMPLE);
        assert_eq!(s.index(), Some(0));
        assert_eq!(s.term(), Some("apple"));
        assert!(s.advance());
        assert_eq!(s.index(), Some(1));
        assert_eq!(s.term(), Some("bank"));
        assert!(!s.advance());
        assert!(s.retreat());
        assert_eq!(s.index(), Some(0));
        assert!(!s.retreat());
        assert_eq!(s.position_label(), "1/2");
    }

    #[test]
    fn detail_toggle_pairs_and_hides_on_move() {
        let mut s = session(SAMPLE);
        let before = s.detail_visible();
        s.toggle_detail();
        s.toggle_detail();
        assert_eq!(s.detail_visible(), before);

        assert!(s.toggle_detail());
        assert_eq!(s.details(), vec![("meaning".to_string(), "a fruit")]);
        s.advance();
        assert!(!s.detail_visible());
    }

    #[test]
    fn empty_deck_ignores_every_action() {
        let mut s = session("term,meaning\n");
        assert!(s.is_empty());
        assert_eq!(s.index(), None);
        assert!(!s.advance());
        assert!(!s.retreat());
        assert!(!s.toggle_detail());
        assert!(!s.edit_current(0, "x"));
        assert!(s.delete_current().is_none());
        assert!(s.details().is_empty());
        assert_eq!(s.position_label(), "0/0");
        assert!(!s.is_dirty());
    }

    #[test]
    fn resume_clamps_into_range() {
        let deck = DeckLoader::default()
            .read_from(Path::new("mem.csv"), SAMPLE.as_bytes())
            .unwrap();
        let s = StudySession::resume_at(deck, CardLayout::default(), 40);
        assert_eq!(s.index(), Some(1));
    }

    #[test]
    fn delete_clamps_cursor_and_disables_when_empty() {
        let mut s = session(SAMPLE);
        s.last();
        let removed = s.delete_current().expect("card removed");
        assert_eq!(removed.field(0), "bank");
        assert_eq!(s.index(), Some(0));
        s.delete_current();
        assert_eq!(s.index(), None);
        assert!(s.is_dirty());
    }

    #[test]
    fn add_card_fits_width_and_moves_cursor() {
        let mut s = session(SAMPLE);
        let idx = s.add_card(vec!["computer".into()]);
        assert_eq!(idx, 2);
        assert_eq!(s.index(), Some(2));
        assert_eq!(s.current().map(|c| c.fields().len()), Some(2));

        let mut empty = session("");
        empty.add_card(vec!["apple".into(), "りんご".into()]);
        assert_eq!(empty.deck().width(), 2);
        assert_eq!(empty.index(), Some(0));
    }

    #[test]
    fn card_added_to_empty_headed_file_survives_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("words.csv");
        fs::write(&path, "")?;

        let loader = DeckLoader::default();
        let mut s = StudySession::new(loader.load(&path)?, CardLayout::default());
        s.add_card(vec!["apple".into(), "a fruit".into()]);
        s.save(&DeckWriter::default())?;

        assert_eq!(fs::read_to_string(&path)?, "term,detail\napple,a fruit\n");
        let reloaded = loader.load(&path)?;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(0).map(|card| card.field(0)), Some("apple"));
        Ok(())
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let s = grouped(GENRES);
        assert_eq!(s.groups(), vec!["food", "school"]);
        assert!(session(GENRES).groups().is_empty());
    }

    #[test]
    fn group_scope_narrows_navigation_and_clamps() {
        let mut s = grouped(GENRES);
        s.advance();
        assert_eq!(s.cycle_group(), Some("food"));
        assert_eq!(s.index(), Some(0));
        assert_eq!(s.position_label(), "1/3");
        assert_eq!(s.scope_len(), 3);

        assert!(s.advance());
        assert_eq!(s.term(), Some("bread"));
        assert!(s.advance());
        assert_eq!(s.term(), Some("rice"));
        assert!(!s.advance());
        assert_eq!(s.position_label(), "3/3");
        assert!(s.retreat());
        assert!(s.retreat());
        assert!(!s.retreat());
        assert_eq!(s.term(), Some("apple"));

        assert_eq!(s.cycle_group(), Some("school"));
        assert_eq!(s.term(), Some("book"));
        assert!(s.last());
        assert_eq!(s.term(), Some("pencil"));
        assert!(s.first());
        assert_eq!(s.term(), Some("book"));

        assert_eq!(s.cycle_group(), None);
        assert_eq!(s.index(), Some(1));
        assert_eq!(s.position_label(), "2/5");
        assert!(s.advance());
        assert_eq!(s.term(), Some("bread"));
    }

    #[test]
    fn cycling_without_group_column_is_a_no_op() {
        let mut s = session(GENRES);
        s.advance();
        assert_eq!(s.cycle_group(), None);
        assert_eq!(s.index(), Some(1));
    }

    #[test]
    fn deleting_inside_a_group_settles_on_a_member() {
        let mut s = grouped(GENRES);
        s.cycle_group();
        s.cycle_group();
        s.last();
        assert_eq!(s.term(), Some("pencil"));
        s.delete_current();
        assert_eq!(s.term(), Some("book"));
        assert_eq!(s.active_group(), Some("school"));
        s.delete_current();
        assert_eq!(s.active_group(), None);
        assert_eq!(s.len(), 3);
        assert!(s.index().is_some());
    }

    #[test]
    fn regrouped_card_takes_the_scope_along() {
        let mut s = grouped(GENRES);
        s.cycle_group();
        assert!(s.edit_current(2, "fruit"));
        assert_eq!(s.active_group(), Some("fruit"));
        assert_eq!(s.position_label(), "1/1");
        assert!(!s.advance());
    }

    #[test]
    fn edits_mark_dirty_until_saved() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("words.csv");
        fs::write(&path, SAMPLE)?;
        let deck = DeckLoader::default().load(&path)?;
        let mut s = StudySession::new(deck, CardLayout::default());

        assert!(!s.edit_current(1, "a fruit"));
        assert!(!s.is_dirty());
        assert!(s.edit_current(1, "a red fruit"));
        assert!(s.is_dirty());

        s.save(&DeckWriter::default())?;
        assert!(!s.is_dirty());
        assert_eq!(
            fs::read_to_string(&path)?,
            "term,meaning\napple,a red fruit\nbank,a financial institution\n"
        );
        Ok(())
    }

    #[test]
    fn failed_save_keeps_dirty_flag() -> Result<()> {
        let dir = tempdir()?;
        let deck = DeckLoader::default().read_from(
            &dir.path().join("gone").join("words.csv"),
            SAMPLE.as_bytes(),
        )?;
        let mut s = StudySession::new(deck, CardLayout::default());
        s.edit_current(0, "pear");
        assert!(s.save(&DeckWriter::default()).is_err());
        assert!(s.is_dirty());
        Ok(())
    }
}
