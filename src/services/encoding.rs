//! Character encoding resolution for fetched pages.
//!
//! The listing site does not reliably declare its encoding, so the charset is
//! picked in order from:
//! 1. the `charset=` parameter of the `Content-Type` header,
//! 2. a `<meta>` declaration in the first [`META_SNIFF_BYTES`] of the body,
//! 3. the configured default.
//!
//! A label that names no supported encoding decodes as UTF-8. Decoding never
//! fails; malformed sequences become U+FFFD.

use encoding_rs::{Encoding, REPLACEMENT, UTF_8};
use regex::Regex;

/// How many leading body bytes are scanned for a `<meta>` charset.
pub const META_SNIFF_BYTES: usize = 4096;

/// Which step picked the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSource {
    Header,
    Meta,
    Default,
    /// The chosen label was not a supported encoding; UTF-8 was used.
    Fallback,
}

/// A decoded page body.
#[derive(Debug, Clone)]
pub struct DecodedPage {
    pub text: String,
    pub encoding: &'static Encoding,
    pub source: CharsetSource,
}

/// Decodes raw page bytes using header, markup and configured hints.
#[derive(Debug, Clone)]
pub struct EncodingResolver {
    default_label: String,
}

impl EncodingResolver {
    /// Create a resolver that falls back to `default_label`.
    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            default_label: canonical_label(&default_label.into()),
        }
    }

    /// Decode `bytes` to text.
    pub fn resolve(&self, bytes: &[u8], content_type: Option<&str>) -> String {
        self.decode(bytes, content_type).text
    }

    /// Decode `bytes`, reporting which encoding was used and why.
    pub fn decode(&self, bytes: &[u8], content_type: Option<&str>) -> DecodedPage {
        let (label, source) = self.pick_label(bytes, content_type);

        let (encoding, source) = match lookup(&label) {
            Some(encoding) => (encoding, source),
            None => {
                log::warn!("Unsupported charset '{}', decoding as UTF-8", label);
                (UTF_8, CharsetSource::Fallback)
            }
        };

        let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
        if had_errors {
            log::debug!(
                "Malformed {} sequences replaced while decoding",
                encoding.name()
            );
        }

        DecodedPage {
            text: text.into_owned(),
            encoding,
            source,
        }
    }

    fn pick_label(&self, bytes: &[u8], content_type: Option<&str>) -> (String, CharsetSource) {
        if let Some(label) = content_type.and_then(charset_from_content_type) {
            return (canonical_label(&label), CharsetSource::Header);
        }

        let head = latin1_head(bytes);
        if let Some(label) = charset_from_meta(&head) {
            return (canonical_label(&label), CharsetSource::Meta);
        }

        (self.default_label.clone(), CharsetSource::Default)
    }
}

/// Extract the charset parameter from a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)charset\s*=\s*["']?([^;"'\s]+)"#).ok()?;
    let caps = pattern.captures(content_type)?;
    Some(caps.get(1)?.as_str().trim().to_lowercase())
}

/// Find a charset declared in markup.
///
/// Checks `<meta charset=...>` first, then a `content="...; charset=..."`
/// attribute as used by `http-equiv` meta tags.
pub fn charset_from_meta(head: &str) -> Option<String> {
    let patterns = [
        Regex::new(r#"(?i)<meta[^>]*charset\s*=\s*["']?([^"'>\s]+)"#).ok()?,
        Regex::new(r#"(?i)content\s*=\s*["'][^"']*charset\s*=\s*([^"';\s]+)"#).ok()?,
    ];

    patterns.iter().find_map(|pattern| {
        pattern
            .captures(head)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
    })
}

/// Lower-case a label and map known shorthands to their canonical names.
pub fn canonical_label(label: &str) -> String {
    let label = label.trim().to_lowercase();
    match label.as_str() {
        "utf8" => "utf-8".to_string(),
        "win-1251" => "windows-1251".to_string(),
        _ => label,
    }
}

/// Look up a supported encoding by label.
///
/// The WHATWG "replacement" encoding is treated as unsupported, since it
/// would discard the whole body.
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(canonical_label(label).as_bytes()).filter(|e| *e != REPLACEMENT)
}

/// View the head of the body byte-for-byte as Latin-1 so ASCII markup is
/// searchable before the real encoding is known.
fn latin1_head(bytes: &[u8]) -> String {
    bytes[..bytes.len().min(META_SNIFF_BYTES)]
        .iter()
        .map(|&b| b as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1251;

    // "Шкода" in windows-1251
    const SKODA_CP1251: &[u8] = &[0xD8, 0xEA, 0xEE, 0xE4, 0xE0];

    fn resolver() -> EncodingResolver {
        EncodingResolver::new("windows-1251")
    }

    #[test]
    fn test_header_charset_wins() {
        let body = "<meta charset=\"windows-1251\"><p>Шкода</p>".as_bytes();
        let page = resolver().decode(body, Some("text/html; charset=UTF-8"));
        assert_eq!(page.encoding, UTF_8);
        assert_eq!(page.source, CharsetSource::Header);
        assert!(page.text.contains("Шкода"));
    }

    #[test]
    fn test_header_charset_quoted_with_trailing_params() {
        assert_eq!(
            charset_from_content_type("text/html; Charset=\"Windows-1251\"; foo=bar"),
            Some("windows-1251".to_string())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_meta_charset_attribute() {
        let mut body = b"<html><head><meta charset=\"windows-1251\"></head><body>".to_vec();
        body.extend_from_slice(SKODA_CP1251);

        let page = resolver().decode(&body, Some("text/html"));
        assert_eq!(page.encoding, WINDOWS_1251);
        assert_eq!(page.source, CharsetSource::Meta);
        assert!(page.text.ends_with("Шкода"));
    }

    #[test]
    fn test_meta_http_equiv_content() {
        let head = r#"<meta http-equiv="Content-Type" content="text/html; charset=utf-8">"#;
        assert_eq!(charset_from_meta(head), Some("utf-8".to_string()));
    }

    #[test]
    fn test_meta_beyond_sniff_window_is_ignored() {
        let mut body = vec![b' '; META_SNIFF_BYTES];
        body.extend_from_slice(b"<meta charset=\"utf-8\">");

        let page = EncodingResolver::new("iso-8859-5").decode(&body, None);
        assert_eq!(page.source, CharsetSource::Default);
        assert_eq!(page.encoding.name(), "ISO-8859-5");
    }

    #[test]
    fn test_default_encoding_used_without_signals() {
        let page = resolver().decode(SKODA_CP1251, None);
        assert_eq!(page.source, CharsetSource::Default);
        assert_eq!(page.text, "Шкода");
    }

    #[test]
    fn test_aliases_are_canonicalized() {
        assert_eq!(canonical_label(" UTF8 "), "utf-8");
        assert_eq!(canonical_label("Win-1251"), "windows-1251");
        assert_eq!(lookup("win-1251"), Some(WINDOWS_1251));
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        let page = resolver().decode("Шкода".as_bytes(), Some("text/html; charset=bogus-42"));
        assert_eq!(page.source, CharsetSource::Fallback);
        assert_eq!(page.encoding, UTF_8);
        assert_eq!(page.text, "Шкода");
    }

    #[test]
    fn test_replacement_encoding_is_unsupported() {
        assert!(lookup("iso-2022-kr").is_none());
    }

    #[test]
    fn test_invalid_bytes_never_fail() {
        let bytes = [0xFF, 0xFE, 0xFD, 0x00, 0xC3];
        let text = resolver().resolve(&bytes, Some("text/html; charset=utf-8"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(resolver().resolve(&[], None), "");
    }
}
