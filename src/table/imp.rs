use super::equiv::{Candidates, Indices};
use super::error::{MatchError, TableError};
use super::trie::Trie;
use super::{Entry, Frozen, UriTemplateTable};
use crate::escape::escape_segment;
use crate::strmap::fold;
use crate::template::{PathSegment, UriTemplate, UriTemplateMatch};
use crate::wire::{base_path, relative_path, split_segments, WirePath, WireQuery, WireSegment};

use std::collections::HashMap;

use tracing::{debug, trace};
use url::Url;

impl<T> Default for UriTemplateTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UriTemplateTable<T> {
    pub fn new() -> Self {
        Self {
            base_address: None,
            entries: Vec::new(),
            frozen: None,
        }
    }

    pub fn with_base_address(base_address: Url) -> Self {
        Self {
            base_address: Some(base_address),
            ..Self::new()
        }
    }

    pub fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    pub fn set_base_address(&mut self, base_address: Url) -> Result<(), TableError> {
        self.check_mutable()?;
        self.base_address = Some(base_address);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UriTemplate, &T)> + '_ {
        self.entries.iter().map(|e| (&e.template, &e.data))
    }

    pub fn is_read_only(&self) -> bool {
        self.frozen.is_some()
    }

    /// Parses and adds a template.
    ///
    /// # Panics
    /// Panics if the template is invalid or the table is read-only.
    pub fn insert(&mut self, template: &str, data: T) -> &mut Self {
        if let Err(e) = self.try_insert(template, data) {
            panic!("{}: template = {:?}", e, template);
        }
        self
    }

    pub fn try_insert(&mut self, template: &str, data: T) -> Result<&mut Self, TableError> {
        self.check_mutable()?;
        let template = UriTemplate::new(template)?;
        self.insert_template(template, data)
    }

    pub fn insert_template(
        &mut self,
        template: UriTemplate,
        data: T,
    ) -> Result<&mut Self, TableError> {
        self.check_mutable()?;
        self.entries.push(Entry { template, data });
        Ok(self)
    }

    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Result<(UriTemplate, T), TableError> {
        self.check_mutable()?;
        let e = self.entries.remove(index);
        Ok((e.template, e.data))
    }

    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn replace(
        &mut self,
        index: usize,
        template: UriTemplate,
        data: T,
    ) -> Result<(UriTemplate, T), TableError> {
        self.check_mutable()?;
        let e = std::mem::replace(&mut self.entries[index], Entry { template, data });
        Ok((e.template, e.data))
    }

    pub fn retain(
        &mut self,
        mut f: impl FnMut(&UriTemplate, &T) -> bool,
    ) -> Result<(), TableError> {
        self.check_mutable()?;
        self.entries.retain(|e| f(&e.template, &e.data));
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), TableError> {
        self.check_mutable()?;
        self.entries.clear();
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), TableError> {
        match self.frozen {
            Some(_) => Err(TableError::ReadOnly),
            None => Ok(()),
        }
    }

    /// Freezes the table.
    ///
    /// Fails if the base address is missing, the table is empty, or two
    /// templates could match the same URI. With `allow_duplicates`, templates
    /// that are equivalent may coexist and all of them match. A failed call
    /// leaves the table mutable; calling it on a frozen table does nothing.
    pub fn make_read_only(&mut self, allow_duplicates: bool) -> Result<(), TableError> {
        if self.frozen.is_some() {
            return Ok(());
        }
        match self.freeze(allow_duplicates) {
            Ok(frozen) => {
                debug!(
                    templates = self.entries.len(),
                    nodes = frozen.trie.node_count(),
                    fast_path = frozen.fast_path.len(),
                    "uri template table frozen"
                );
                self.frozen = Some(frozen);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "uri template table rejected");
                Err(e)
            }
        }
    }

    fn freeze(&self, allow_duplicates: bool) -> Result<Frozen, TableError> {
        let base = self
            .base_address
            .as_ref()
            .ok_or(TableError::MissingBaseAddress)?;
        if base.cannot_be_a_base() {
            return Err(TableError::BadBaseAddress(base.to_string()));
        }
        if self.entries.is_empty() {
            return Err(TableError::Empty);
        }

        let trie = Trie::build(&self.entries);
        trie.validate(&self.entries, allow_duplicates)?;
        let fast_path = self.build_fast_path(&trie);

        Ok(Frozen {
            base_path: base_path(base).into_owned(),
            trie,
            fast_path,
        })
    }

    /// Resolves the exact wire path of every template without variables.
    fn build_fast_path(&self, trie: &Trie) -> HashMap<String, Candidates> {
        let mut fast_path = HashMap::new();
        for entry in &self.entries {
            let t = &entry.template;
            if t.has_variables() || t.has_wildcard() || t.ignore_trailing_slash() {
                continue;
            }
            let wire: Option<WirePath> = t
                .path_segments()
                .iter()
                .map(|s| match s {
                    PathSegment::Literal(lit) => Some(WireSegment {
                        text: lit.text().to_owned(),
                        ends_with_slash: s.ends_with_slash(),
                    }),
                    _ => None,
                })
                .collect();
            let wire = match wire {
                Some(wire) => wire,
                None => continue,
            };
            let key = fast_path_key(&wire);
            if fast_path.contains_key(&key) {
                continue;
            }
            if let Some(set) = trie.walk(&wire) {
                fast_path.insert(key, set.candidates(&self.entries, |_| true));
            }
        }
        fast_path
    }

    /// Matches `uri` against every template.
    ///
    /// Returns more than one match only when the table was frozen with
    /// duplicates allowed.
    pub fn match_uri<'a>(
        &'a self,
        uri: &Url,
    ) -> Result<Vec<(&'a T, UriTemplateMatch<'a>)>, MatchError> {
        let frozen = self.frozen.as_ref().ok_or(MatchError::NotReadOnly)?;
        let base = match self.base_address.as_ref() {
            Some(base) => base,
            None => return Err(MatchError::NotReadOnly),
        };
        let relative = match relative_path(&frozen.base_path, uri) {
            Some(relative) => relative,
            None => return Ok(Vec::new()),
        };
        let query = WireQuery::parse(uri);

        let wire = split_segments(relative);
        let first = match frozen.fast_path.get(&fast_path_key(&wire)) {
            Some(candidates) => {
                trace!(uri = %uri, "fast path hit");
                candidates.clone()
            }
            None => frozen
                .trie
                .walk(&wire)
                .map(|set| set.candidates(&self.entries, |_| true))
                .unwrap_or_default(),
        };
        let found = self.narrow(&first.items, &query);
        if !found.is_empty() {
            return Ok(self.create_matches(base, uri, &wire, first.segments, &found, query));
        }

        if relative.is_empty() {
            return Ok(Vec::new());
        }
        // the final slash toggled: dropping it reaches templates that ignore
        // it, adding it reaches omitted terminal defaults as well
        let stripped = relative.ends_with('/');
        let toggled = match relative.strip_suffix('/') {
            Some(trimmed) => split_segments(trimmed),
            None => split_segments(&format!("{}/", relative)),
        };
        let set = match frozen.trie.walk(&toggled) {
            Some(set) => set,
            None => return Ok(Vec::new()),
        };
        let retry = set.candidates(&self.entries, |t| {
            t.ignore_trailing_slash() || (!stripped && set.is_default_match(t))
        });
        trace!(uri = %uri, candidates = retry.items.len(), "retried with trailing slash toggled");
        let found = self.narrow(&retry.items, &query);
        Ok(self.create_matches(base, uri, &toggled, retry.segments, &found, query))
    }

    /// Like [`match_uri`](Self::match_uri), failing when more than one
    /// template matches.
    pub fn match_single<'a>(
        &'a self,
        uri: &Url,
    ) -> Result<Option<(&'a T, UriTemplateMatch<'a>)>, MatchError> {
        let mut matches = self.match_uri(uri)?;
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(MatchError::Ambiguous { count }),
        }
    }

    /// Drops candidates whose literal query requirements are not met.
    ///
    /// When no candidate has literal requirements and one has no query, the
    /// others must also have all their query variables present; if nothing
    /// remains, the candidates without a query match.
    fn narrow(&self, candidates: &[usize], query: &WireQuery) -> Indices {
        let template = |i: usize| &self.entries[i].template;
        let require_variables = candidates.iter().all(|&i| !template(i).has_query_literals())
            && candidates.iter().any(|&i| template(i).queries().is_empty());

        let mut found: Indices = candidates
            .iter()
            .copied()
            .filter(|&i| template(i).matches_query_interestingly(query, require_variables))
            .collect();
        if found.is_empty() {
            found = candidates
                .iter()
                .copied()
                .filter(|&i| template(i).queries().is_empty())
                .collect();
        }
        trace!(candidates = candidates.len(), found = found.len(), "narrowed by query");
        found
    }

    fn create_matches<'a>(
        &'a self,
        base: &Url,
        uri: &Url,
        wire: &[WireSegment],
        segments: usize,
        found: &[usize],
        query: WireQuery,
    ) -> Vec<(&'a T, UriTemplateMatch<'a>)> {
        found
            .iter()
            .map(|&i| {
                let e = &self.entries[i];
                let m = e
                    .template
                    .create_match(base, uri, wire, segments, query.clone());
                (&e.data, m)
            })
            .collect()
    }
}

fn fast_path_key(wire: &[WireSegment]) -> String {
    let mut key = String::new();
    for s in wire {
        key.push_str(&escape_segment(&fold(&s.text)));
        if s.ends_with_slash {
            key.push('/');
        }
    }
    key
}
