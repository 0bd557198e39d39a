//! Title and link extraction from response bodies.
//!
//! html5ever-based parsing never fails: bodies that are not HTML at all
//! simply yield no title and no anchors.
//!
//! Bodies are decoded before parsing. The encoding is taken from a byte order
//! mark, then the `Content-Type` charset, then a `<meta>` declaration near the
//! top of the document. Undeclared bodies are read as UTF-8 when valid and as
//! windows-1252 otherwise, which is what legacy device pages usually are.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use scraper::{Html, Selector};
use std::borrow::Cow;

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SCAN_BYTES: usize = 1024;

/// What gets kept from a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Text of the first `<title>`, `None` when absent or blank.
    pub title: Option<String>,
    /// `href` of every `<a>` in document order; `None` for anchors without one.
    pub links: Vec<Option<String>>,
}

impl PageSummary {
    /// Parse a body that came without a `Content-Type` header.
    pub fn parse(body: &[u8]) -> Self {
        Self::parse_with_content_type(body, None)
    }

    pub fn parse_with_content_type(body: &[u8], content_type: Option<&str>) -> Self {
        let text = decode(body, content_type);
        let document = Html::parse_document(&text);

        Self {
            title: extract_title(&document),
            links: extract_links(&document),
        }
    }
}

fn decode<'a>(body: &'a [u8], content_type: Option<&str>) -> Cow<'a, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        return encoding.decode_without_bom_handling(&body[bom_len..]).0;
    }

    let declared = content_type
        .and_then(header_charset)
        .or_else(|| meta_charset(body));

    match declared {
        Some(encoding) => encoding.decode_without_bom_handling(body).0,
        None => match std::str::from_utf8(body) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => WINDOWS_1252.decode_without_bom_handling(body).0,
        },
    }
}

/// `charset` parameter of a `Content-Type` value.
fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(|c| c == '"' || c == '\'').as_bytes())
    })
}

/// Charset from `<meta charset=..>` or `<meta http-equiv .. content="..; charset=..">`.
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    head.match_indices("<meta").find_map(|(start, _)| {
        let tag = &head[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        let value = &tag[tag.find("charset=")? + "charset=".len()..];
        let label: String = value
            .trim_start_matches(|c| c == '"' || c == '\'')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();
        let encoding = Encoding::for_label(label.as_bytes())?;
        // A document that could be read to find this declaration is not UTF-16.
        if encoding == UTF_16LE || encoding == UTF_16BE {
            Some(UTF_8)
        } else {
            Some(encoding)
        }
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn extract_links(document: &Html) -> Vec<Option<String>> {
    let selector = match Selector::parse("a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .map(|el| el.value().attr("href").map(str::to_string))
        .collect()
}
