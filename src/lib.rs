//! `mboxtune`: turn an MBOX mail export into a (prompt, response) fine-tuning dataset.
//!
//! This crate provides the core library: splitting MBOX files into records,
//! parsing and sanitizing messages, filtering noise, pairing the owner's
//! replies with the messages they answer, and writing the result as JSONL.

pub mod clean;
pub mod config;
pub mod enhance;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
pub mod pipeline;
