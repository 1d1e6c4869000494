use crate::escape::{parse_query, unescape};
use crate::strmap::eq_folded;

use std::borrow::Cow;

use smallvec::SmallVec;
use url::Url;

const SLASH: char = '/';

/// One segment of a candidate path, unescaped, with its trailing slash split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireSegment {
    pub(crate) text: String,
    pub(crate) ends_with_slash: bool,
}

pub(crate) type WirePath = SmallVec<[WireSegment; 8]>;

impl WireSegment {
    pub(crate) fn parse(raw: &str) -> Self {
        match raw.strip_suffix(SLASH) {
            Some(body) => Self {
                text: unescape(body),
                ends_with_slash: true,
            },
            None => Self {
                text: unescape(raw),
                ends_with_slash: false,
            },
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The path of `base`, always ending in `/`.
pub(crate) fn base_path(base: &Url) -> Cow<'_, str> {
    let path = base.path();
    if path.ends_with(SLASH) {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("{}{}", path, SLASH))
    }
}

/// Returns the raw part of `candidate`'s path below `base_path`.
///
/// `base_path` must end with `/`, which puts the split on a segment boundary.
/// The comparison ignores ASCII case; a candidate equal to the base without
/// its trailing slash is the base itself.
pub(crate) fn relative_path<'a>(base_path: &str, candidate: &'a Url) -> Option<&'a str> {
    debug_assert!(base_path.ends_with(SLASH));
    let path = candidate.path();
    match path.get(..base_path.len()) {
        Some(head) if head.eq_ignore_ascii_case(base_path) => path.get(base_path.len()..),
        Some(_) => None,
        None => {
            let trimmed = &base_path[..base_path.len() - 1];
            if path.eq_ignore_ascii_case(trimmed) {
                Some("")
            } else {
                None
            }
        }
    }
}

pub(crate) fn split_segments(relative: &str) -> WirePath {
    relative.split_inclusive(SLASH).map(WireSegment::parse).collect()
}

/// Splits `candidate` into wire segments below `base`.
pub(crate) fn wire_path(base: &Url, candidate: &Url) -> Option<WirePath> {
    let base = base_path(base);
    relative_path(&base, candidate).map(split_segments)
}

/// The unescaped query of a candidate, looked up by case-insensitive key.
#[derive(Debug, Clone, Default)]
pub(crate) struct WireQuery {
    pairs: Vec<(String, String)>,
}

impl WireQuery {
    pub(crate) fn parse(uri: &Url) -> Self {
        Self {
            pairs: uri.query().map(parse_query).unwrap_or_default(),
        }
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| eq_folded(k, key))
    }

    /// Repeated keys are joined with `,`.
    pub(crate) fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        let mut values = self
            .pairs
            .iter()
            .filter(|(k, _)| eq_folded(k, key))
            .map(|(_, v)| v.as_str());
        let first = values.next()?;
        match values.next() {
            None => Some(Cow::Borrowed(first)),
            Some(second) => {
                let mut joined = format!("{},{}", first, second);
                for v in values {
                    joined.push(',');
                    joined.push_str(v);
                }
                Some(Cow::Owned(joined))
            }
        }
    }

    pub(crate) fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}
