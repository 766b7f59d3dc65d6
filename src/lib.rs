// src/lib.rs

//! wikigear Library
//!
//! Turns exported wiki gear pages (rendered HTML or JSON-wrapped wikitext)
//! into canonical gear-set records, stores them and re-emits them as JSON.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
