//! Email parsing: MBOX splitting, header handling, and MIME body flattening.

pub mod header;
pub mod mbox;
pub mod mime;

pub use mime::RecordParser;
