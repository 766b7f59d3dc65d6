//! Service layer for gear extraction.
//!
//! This module contains the business logic for:
//! - Document decoding (`SourceFormat`, `HtmlDecoder`, `WikitextDecoder`)
//! - Stat cell parsing (`NumericParser`)
//! - Classification rules (`Classifier`)
//! - Gear-set extraction (`GearExtractor`)

pub mod classify;
pub mod decoder;
mod extractor;
mod numeric;

pub use classify::Classifier;
pub use decoder::{HtmlDecoder, RawDocument, RawRow, RawTable, SourceFormat, WikitextDecoder};
pub use extractor::{Extraction, GearExtractor};
pub use numeric::NumericParser;
