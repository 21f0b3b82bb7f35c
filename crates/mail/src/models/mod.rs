//! Domain models for mail entities

mod cursor;
mod message;

pub use cursor::SyncCursor;
pub use message::MessageId;
