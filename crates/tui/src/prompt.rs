use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_FIELD_LEN: usize = 512;

/// What the prompt writes back when submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTarget {
    /// Replace fields of the card at this index.
    Edit(usize),
    /// Append a new card.
    New,
}

#[derive(Debug, Clone)]
pub struct PromptField {
    pub column: usize,
    pub label: String,
    pub value: String,
}

/// Outcome of feeding a key to the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Pending,
    Cancelled,
    Submitted,
}

/// Modal editor walking through a card's columns one at a time.
#[derive(Debug, Clone)]
pub struct EditPrompt {
    pub target: PromptTarget,
    pub fields: Vec<PromptField>,
    active: usize,
    // cursor counts chars, not bytes
    cursor: usize,
}

impl EditPrompt {
    pub fn new(target: PromptTarget, fields: Vec<PromptField>) -> Self {
        let cursor = fields
            .first()
            .map(|field| field.value.chars().count())
            .unwrap_or(0);
        Self {
            target,
            fields,
            active: 0,
            cursor,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active_value(&self) -> &str {
        self.fields
            .get(self.active)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }

    /// `(column, value)` pairs in prompt order, exactly as typed.
    pub fn values(&self) -> Vec<(usize, String)> {
        self.fields
            .iter()
            .map(|field| (field.column, field.value.clone()))
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptOutcome {
        match key.code {
            KeyCode::Esc => return PromptOutcome::Cancelled,
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return PromptOutcome::Submitted
            }
            KeyCode::Enter => {
                if self.active + 1 >= self.fields.len() {
                    return PromptOutcome::Submitted;
                }
                self.focus(self.active + 1);
            }
            KeyCode::Tab | KeyCode::Down => {
                if self.active + 1 < self.fields.len() {
                    self.focus(self.active + 1);
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if self.active > 0 {
                    self.focus(self.active - 1);
                }
            }
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.active_len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert(ch)
            }
            _ => {}
        }
        PromptOutcome::Pending
    }

    fn focus(&mut self, index: usize) {
        self.active = index;
        self.cursor = self.active_len();
    }

    fn active_len(&self) -> usize {
        self.active_value().chars().count()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.active_len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len);
        self.cursor = next as usize;
    }

    fn byte_offset(value: &str, chars: usize) -> usize {
        value
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| offset)
            .unwrap_or(value.len())
    }

    fn insert(&mut self, ch: char) {
        if ch.is_control() || self.active_len() >= MAX_FIELD_LEN {
            return;
        }
        let cursor = self.cursor;
        if let Some(field) = self.fields.get_mut(self.active) {
            let offset = Self::byte_offset(&field.value, cursor);
            field.value.insert(offset, ch);
            self.cursor += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let cursor = self.cursor;
        if let Some(field) = self.fields.get_mut(self.active) {
            let offset = Self::byte_offset(&field.value, cursor - 1);
            field.value.remove(offset);
            self.cursor -= 1;
        }
    }

    fn delete(&mut self) {
        if self.cursor >= self.active_len() {
            return;
        }
        let cursor = self.cursor;
        if let Some(field) = self.fields.get_mut(self.active) {
            let offset = Self::byte_offset(&field.value, cursor);
            field.value.remove(offset);
        }
    }
}
