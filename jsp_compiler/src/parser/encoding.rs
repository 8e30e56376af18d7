//! Source encoding detection and decoding
//!
//! A source's encoding comes from, in order: a byte-order mark, the
//! configured default, a `pageEncoding` (or `contentType` charset) found by
//! sniffing the leading directives, the including file, and finally
//! ISO-8859-1.

use crate::config::compile_time::page::ENCODING_SNIFF_LIMIT;

/// Encoding named by a byte-order mark, with the mark's length
pub fn detect_bom(bytes: &[u8]) -> Option<(&'static str, usize)> {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => Some(("UTF-8", 3)),
        [0xFE, 0xFF, ..] => Some(("UTF-16BE", 2)),
        [0xFF, 0xFE, ..] => Some(("UTF-16LE", 2)),
        _ => None,
    }
}

/// Canonical name of a supported encoding
pub fn canonical(encoding: &str) -> Option<&'static str> {
    let name = encoding.trim().to_ascii_uppercase().replace('_', "-");
    match name.as_str() {
        "UTF-8" | "UTF8" => Some("UTF-8"),
        "UTF-16" | "UTF16" => Some("UTF-16"),
        "UTF-16BE" => Some("UTF-16BE"),
        "UTF-16LE" => Some("UTF-16LE"),
        "ISO-8859-1" | "ISO8859-1" | "ISO-LATIN-1" | "LATIN1" | "8859-1" => Some("ISO-8859-1"),
        "US-ASCII" | "ASCII" => Some("US-ASCII"),
        _ => None,
    }
}

/// Decode `bytes`; `None` for unknown encodings and malformed input
pub fn decode(bytes: &[u8], encoding: &str) -> Option<String> {
    match canonical(encoding)? {
        "UTF-8" => String::from_utf8(bytes.to_vec()).ok(),
        "UTF-16" | "UTF-16BE" => decode_utf16(bytes, true),
        "UTF-16LE" => decode_utf16(bytes, false),
        "US-ASCII" => bytes
            .is_ascii()
            .then(|| bytes.iter().map(|b| *b as char).collect()),
        _ => Some(bytes.iter().map(|b| *b as char).collect()),
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Whether two encoding names agree. `UTF-16` matches either byte order,
/// since a byte-order mark picks one of them for a `UTF-16` declaration.
pub fn same_encoding(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let utf16 = |e: &str| e.to_ascii_uppercase().starts_with("UTF-16");
    utf16(a) && utf16(b)
}

/// Charset parameter of a content type such as `text/html; charset=UTF-8`
pub fn charset_of(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let value = content_type[idx + "charset=".len()..]
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches('"');
    (!value.is_empty()).then(|| value.to_string())
}

/// Encoding declared by the leading page or tag directives, found without
/// a full parse. A `pageEncoding` wins over a `contentType` charset.
pub fn sniff_declared_encoding(bytes: &[u8]) -> Option<String> {
    let limit = bytes.len().min(ENCODING_SNIFF_LIMIT);
    let head: String = bytes[..limit].iter().map(|b| *b as char).collect();
    let mut charset = None;
    let mut rest = head.as_str();
    while let Some(idx) = rest.find("<%") {
        rest = &rest[idx + 2..];
        if let Some(comment) = rest.strip_prefix("--") {
            match comment.find("--%>") {
                Some(end) => {
                    rest = &comment[end + 4..];
                    continue;
                }
                None => break,
            }
        }
        let Some(body) = rest.strip_prefix('@') else {
            continue;
        };
        let end = body.find("%>").unwrap_or(body.len());
        let directive = body[..end].trim_start();
        let is_page = directive.starts_with("page");
        let is_tag = directive.starts_with("tag") && !directive.starts_with("taglib");
        if is_page || is_tag {
            if let Some(encoding) = attribute_value(directive, "pageEncoding") {
                return Some(encoding);
            }
            if charset.is_none() {
                charset = attribute_value(directive, "contentType").and_then(|ct| charset_of(&ct));
            }
        }
        rest = &body[end..];
    }
    charset
}

/// Value of `name="..."` inside a directive body
fn attribute_value(directive: &str, name: &str) -> Option<String> {
    let mut search = directive;
    while let Some(idx) = search.find(name) {
        let before = search[..idx].chars().next_back();
        let after = search[idx + name.len()..].trim_start();
        search = &search[idx + name.len()..];
        if !matches!(before, Some(ch) if ch.is_whitespace()) {
            continue;
        }
        let Some(value) = after.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let close = value[1..].find(quote)?;
        return Some(value[1..1 + close].to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom() {
        assert_eq!(detect_bom(&[0xEF, 0xBB, 0xBF, b'a']), Some(("UTF-8", 3)));
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'a', 0]), Some(("UTF-16LE", 2)));
        assert_eq!(detect_bom(b"<%@ page %>"), None);
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("h\u{e9}".as_bytes(), "utf-8").as_deref(), Some("h\u{e9}"));
        assert_eq!(decode(&[b'h', 0xE9], "ISO-8859-1").as_deref(), Some("h\u{e9}"));
        assert_eq!(decode(&[0, b'h', 0, b'i'], "UTF-16BE").as_deref(), Some("hi"));
        assert_eq!(decode(&[b'h', 0, b'i', 0], "UTF-16LE").as_deref(), Some("hi"));
        assert_eq!(decode(&[0xE9], "US-ASCII"), None);
        assert_eq!(decode(&[0xFF, 0xFF], "UTF-8"), None);
        assert_eq!(decode(b"x", "EBCDIC"), None);
    }

    #[test]
    fn test_same_encoding() {
        assert!(same_encoding("utf-8", "UTF-8"));
        assert!(same_encoding("UTF-16", "UTF-16LE"));
        assert!(!same_encoding("UTF-8", "ISO-8859-1"));
    }

    #[test]
    fn test_sniff_page_encoding() {
        let src = b"<%-- <%@ page pageEncoding=\"Bogus\" %> --%>\n<%@ page pageEncoding=\"UTF-8\" %>";
        assert_eq!(sniff_declared_encoding(src).as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_sniff_content_type_charset() {
        let src = b"<%@ taglib prefix=\"c\" uri=\"u\" %><%@ page contentType='text/html; charset=UTF-16' %>";
        assert_eq!(sniff_declared_encoding(src).as_deref(), Some("UTF-16"));
        assert_eq!(sniff_declared_encoding(b"plain text"), None);
    }

    #[test]
    fn test_tag_directive_is_sniffed() {
        let src = b"<%@ tag pageEncoding=\"UTF-8\" body-content=\"empty\" %>";
        assert_eq!(sniff_declared_encoding(src).as_deref(), Some("UTF-8"));
    }
}
