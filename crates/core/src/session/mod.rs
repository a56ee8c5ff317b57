#![allow(missing_docs)]

//! Study session state: cursor, detail view and in-place edits.

mod cursor;
mod study;

pub use cursor::Cursor;
pub use study::StudySession;
