//! Core value types: addresses, parsed and cleaned messages, conversation pairs.

pub mod address;
pub mod message;
pub mod pair;
