use crate::strmap::{eq_folded, fold};

use std::ops::Deref;
use std::str::FromStr;

use smallvec::SmallVec;

/// Variable values produced by a match, keyed by upper-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundVariables {
    buf: SmallVec<[(String, String); 8]>,
}

impl BoundVariables {
    pub(crate) fn new() -> Self {
        Self {
            buf: SmallVec::new(),
        }
    }

    /// Looks a variable up, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.buf
            .iter()
            .find_map(|(k, v)| if eq_folded(k, name) { Some(v.as_str()) } else { None })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(T::from_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.buf.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.buf.push((fold(name), value.to_owned()));
    }
}

impl Deref for BoundVariables {
    type Target = [(String, String)];
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}
