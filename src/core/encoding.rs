//! Encoding detection and decoding for file input.
//!
//! Resolution order: caller override, then BOM, then UTF-16 byte
//! pattern, then the `encoding=` pseudo-attribute of the XML
//! declaration, then UTF-8.
//!
//! Decoding never fails: undecodable sequences become U+FFFD. A
//! declaration that lies about the byte encoding therefore yields
//! reproducible mojibake rather than an error; callers repair that by
//! passing an explicit override.

use crate::error::ParseError;

/// Character encodings the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

impl Encoding {
    /// Look up an encoding by its label, case-insensitively.
    ///
    /// Accepts the common aliases seen in XML declarations.
    pub fn for_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "utf-16le" | "utf16le" => Some(Encoding::Utf16Le),
            "utf-16be" | "utf16be" => Some(Encoding::Utf16Be),
            // Bare UTF-16 means "look at the BOM"; little-endian is the
            // fallback when there is none.
            "utf-16" | "utf16" => Some(Encoding::Utf16Le),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(Encoding::Latin1),
            "us-ascii" | "ascii" => Some(Encoding::Ascii),
            _ => None,
        }
    }

    /// Detect an encoding from a byte order mark or UTF-16 byte pattern
    fn detect(input: &[u8]) -> Option<Self> {
        if input.len() < 2 {
            return None;
        }
        match (input[0], input[1]) {
            (0xFF, 0xFE) => Some(Encoding::Utf16Le),
            (0xFE, 0xFF) => Some(Encoding::Utf16Be),
            (0xEF, 0xBB) if input.get(2) == Some(&0xBF) => Some(Encoding::Utf8),
            // No BOM: '<' interleaved with nulls betrays UTF-16
            (0x00, b'<') => Some(Encoding::Utf16Be),
            (b'<', 0x00) => Some(Encoding::Utf16Le),
            _ => None,
        }
    }
}

/// Resolved source encoding plus the label the document declared
pub struct SourceEncoding {
    pub encoding: Encoding,
    /// The `encoding=` label from the XML declaration, as written
    pub declared: Option<String>,
}

/// Decide how to decode `input`.
///
/// `override_label` is the caller-supplied encoding; it wins over both
/// the BOM and the declaration. An unrecognized label (supplied or
/// declared) is a [`ParseError`].
pub fn resolve(input: &[u8], override_label: Option<&str>) -> Result<SourceEncoding, ParseError> {
    let declared = sniff_declared_label(input);

    let encoding = if let Some(label) = override_label {
        Encoding::for_label(label)
            .ok_or_else(|| ParseError::new(format!("unknown encoding {:?}", label), 0))?
    } else if let Some(detected) = Encoding::detect(input) {
        detected
    } else if let Some(ref label) = declared {
        Encoding::for_label(label)
            .ok_or_else(|| ParseError::new(format!("unknown encoding {:?}", label), 0))?
    } else {
        Encoding::Utf8
    };

    Ok(SourceEncoding { encoding, declared })
}

/// Decode `input` with `encoding`, stripping any BOM.
///
/// Replacement-based: never fails.
pub fn decode(input: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => {
            let body = input.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(input);
            String::from_utf8_lossy(body).into_owned()
        }
        Encoding::Utf16Le => decode_utf16(input, &[0xFF, 0xFE], u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16(input, &[0xFE, 0xFF], u16::from_be_bytes),
        Encoding::Latin1 => input.iter().map(|&b| b as char).collect(),
        Encoding::Ascii => input
            .iter()
            .map(|&b| if b < 0x80 { b as char } else { char::REPLACEMENT_CHARACTER })
            .collect(),
    }
}

fn decode_utf16(input: &[u8], bom: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let body = input.strip_prefix(bom).unwrap_or(input);
    let units = body
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => combine([*a, *b]),
            // Odd trailing byte
            _ => 0xFFFD,
        })
        .collect::<Vec<u16>>();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Extract the `encoding=` label from an XML declaration, if the input
/// starts with one.
///
/// Works on the raw byte prefix: the declaration is ASCII in every
/// ASCII-compatible encoding, which is exactly the case where the
/// label matters (UTF-16 inputs are caught by BOM/pattern first).
fn sniff_declared_label(input: &[u8]) -> Option<String> {
    let body = input.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(input);
    let rest = body.strip_prefix(b"<?xml")?;
    let end = rest.windows(2).position(|w| w == b"?>")?;
    let decl = &rest[..end];

    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let mut tail = decl[at + 8..].iter().copied().skip_while(|b| b.is_ascii_whitespace());
    if tail.next() != Some(b'=') {
        return None;
    }
    let mut tail = tail.skip_while(|b| b.is_ascii_whitespace());
    let quote = match tail.next() {
        Some(q @ (b'"' | b'\'')) => q,
        _ => return None,
    };
    let label: Vec<u8> = tail.take_while(|&b| b != quote).collect();
    Some(String::from_utf8_lossy(&label).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_lookup() {
        assert_eq!(Encoding::for_label("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::for_label("latin1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::for_label("ISO-8859-1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::for_label("ebcdic"), None);
    }

    #[test]
    fn test_detect_bom() {
        assert_eq!(Encoding::detect(&[0xFF, 0xFE, b'<', 0x00]), Some(Encoding::Utf16Le));
        assert_eq!(Encoding::detect(&[0xFE, 0xFF, 0x00, b'<']), Some(Encoding::Utf16Be));
        assert_eq!(Encoding::detect(b"<root/>"), None);
    }

    #[test]
    fn test_sniff_declaration() {
        let doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a/>";
        assert_eq!(sniff_declared_label(doc), Some("ISO-8859-1".to_string()));
        assert_eq!(sniff_declared_label(b"<a/>"), None);
    }

    #[test]
    fn test_resolve_override_wins() {
        let doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a/>";
        let resolved = resolve(doc, Some("utf-8")).unwrap();
        assert_eq!(resolved.encoding, Encoding::Utf8);
        assert_eq!(resolved.declared.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_resolve_unknown_label_fails() {
        assert!(resolve(b"<a/>", Some("klingon")).is_err());
        let doc = b"<?xml version=\"1.0\" encoding=\"klingon\"?><a/>";
        assert!(resolve(doc, None).is_err());
    }

    #[test]
    fn test_decode_utf16_le() {
        let bytes = [0xFF, 0xFE, b'<', 0x00, b'r', 0x00, b'/', 0x00, b'>', 0x00];
        assert_eq!(decode(&bytes, Encoding::Utf16Le), "<r/>");
    }

    #[test]
    fn test_wrong_label_produces_mojibake_not_error() {
        // UTF-8 bytes for "é" decoded as Latin-1: two garbage chars,
        // deterministically.
        let utf8 = "é".as_bytes();
        let text = decode(utf8, Encoding::Latin1);
        assert_eq!(text, "\u{c3}\u{a9}");
    }

    #[test]
    fn test_decode_utf8_replacement() {
        let bad = [b'a', 0xE9, b'b'];
        assert_eq!(decode(&bad, Encoding::Utf8), "a\u{FFFD}b");
    }
}
