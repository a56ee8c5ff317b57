/// Position of the displayed card. `None` while the deck is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    index: Option<usize>,
}

impl Cursor {
    /// Cursor at the first card of a deck with `len` cards.
    pub fn new(len: usize) -> Self {
        Self::at(0, len)
    }

    /// Cursor at `index`, clamped into a deck with `len` cards.
    pub fn at(index: usize, len: usize) -> Self {
        Self {
            index: (len > 0).then(|| index.min(len - 1)),
        }
    }

    /// Current index, or `None` when disabled.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Move forward one card. Stays put on the last card.
    pub fn advance(&mut self, len: usize) -> bool {
        match self.index {
            Some(idx) if idx + 1 < len => {
                self.index = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    /// Move back one card. Stays put on the first card.
    pub fn retreat(&mut self) -> bool {
        match self.index {
            Some(idx) if idx > 0 => {
                self.index = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    /// Jump to `index` (clamped). Returns whether the position changed.
    pub fn jump(&mut self, index: usize, len: usize) -> bool {
        let next = Self::at(index, len);
        let moved = next != *self;
        *self = next;
        moved
    }

    /// Re-establish the invariant after the deck shrank or grew.
    pub fn clamp(&mut self, len: usize) {
        *self = Self::at(self.index.unwrap_or(0), len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_deck_disables_cursor() {
        let mut cursor = Cursor::new(0);
        assert_eq!(cursor.index(), None);
        assert!(!cursor.advance(0));
        assert!(!cursor.retreat());
        assert!(!cursor.jump(4, 0));
    }

    #[test]
    fn advance_then_retreat_round_trips() {
        let len = 5;
        for start in 1..len - 1 {
            let mut cursor = Cursor::at(start, len);
            assert!(cursor.advance(len));
            assert!(cursor.retreat());
            assert_eq!(cursor.index(), Some(start));
        }
    }

    #[test]
    fn boundaries_clamp() {
        let mut cursor = Cursor::at(2, 3);
        assert!(!cursor.advance(3));
        assert_eq!(cursor.index(), Some(2));

        let mut cursor = Cursor::new(3);
        assert!(!cursor.retreat());
        assert_eq!(cursor.index(), Some(0));
    }

    #[test]
    fn clamp_follows_length_changes() {
        let mut cursor = Cursor::at(4, 5);
        cursor.clamp(3);
        assert_eq!(cursor.index(), Some(2));
        cursor.clamp(0);
        assert_eq!(cursor.index(), None);
        cursor.clamp(2);
        assert_eq!(cursor.index(), Some(0));
    }
}
