//! Raw mail parsing: MBOX splitting, MIME tree conversion and date fallback.

pub mod header;
pub mod mbox;
pub mod mime;
