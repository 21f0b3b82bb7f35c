//! Durable storage: Maildir message tree and sync cursors
//!
//! Both stores use write-to-temp-then-rename so a crash at any point
//! leaves either the old state or the new state, never a torn file.

mod cursor;
mod maildir;

pub use cursor::CursorStore;
pub use maildir::MaildirStore;
