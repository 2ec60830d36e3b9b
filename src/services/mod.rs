//! Service layer for the listing watcher.
//!
//! This module contains the page processing logic:
//! - Charset detection and decoding (`EncodingResolver`)
//! - Listing extraction (`ListingExtractor`, `SelectorExtractor`)
//! - URL canonicalization (`UrlNormalizer`)

pub mod encoding;
mod extractor;
mod normalizer;

pub use encoding::{CharsetSource, DecodedPage, EncodingResolver};
pub use extractor::{ListingExtractor, SelectorExtractor};
pub use normalizer::UrlNormalizer;
