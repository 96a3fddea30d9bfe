//! Core data model: source messages, their part trees, walk results and rendition specs.

pub mod address;
pub mod message;
pub mod rendition;
pub mod result;
