mod compound;
mod equiv;
mod error;
mod imp;
mod trie;

pub use self::error::{MatchError, TableError};

use self::equiv::Candidates;
use self::trie::Trie;
use crate::template::UriTemplate;

use std::collections::HashMap;

use url::Url;

/// A set of templates with associated data, matched as a whole.
///
/// The table is filled while mutable, then frozen with
/// [`make_read_only`](UriTemplateTable::make_read_only), which proves that no
/// URI can match two templates ambiguously. Only a frozen table can match.
#[derive(Debug)]
pub struct UriTemplateTable<T> {
    base_address: Option<Url>,
    entries: Vec<Entry<T>>,
    frozen: Option<Frozen>,
}

#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) template: UriTemplate,
    pub(crate) data: T,
}

#[derive(Debug)]
struct Frozen {
    base_path: String,
    trie: Trie,
    fast_path: HashMap<String, Candidates>,
}
