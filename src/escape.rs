use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment.
///
/// `/` is included so that a bound value can never introduce a new segment,
/// and `%` so that binding is the exact inverse of unescaping.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'[')
    .add(b']');

pub(crate) fn escape_segment(s: &str) -> Cow<'_, str> {
    utf8_percent_encode(s, SEGMENT).into()
}

/// Escapes a multi-segment path, keeping the `/` separators.
pub(crate) fn escape_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, part) in s.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&escape_segment(part));
    }
    out
}

pub(crate) fn unescape(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

pub(crate) fn escape_query_part(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Unescapes a query key or value written in a template (`+` is a space).
pub(crate) fn unescape_query_part(s: &str) -> String {
    if s.contains('+') {
        unescape(&s.replace('+', " "))
    } else {
        unescape(s)
    }
}

/// Parses a raw query string into unescaped pairs, keeping the wire order.
pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
