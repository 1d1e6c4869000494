use super::error::TableError;
use super::Entry;
use crate::strmap::eq_folded;
use crate::template::{QueryValue, UriTemplate};

use std::borrow::Cow;

use smallvec::SmallVec;

pub(crate) type Indices = SmallVec<[usize; 4]>;

/// Templates that are indistinguishable by path up to `segments` wire segments.
#[derive(Debug, Clone, Default)]
pub(crate) struct EquivSet {
    segments: usize,
    items: Vec<usize>,
}

/// The templates a wire path resolved to.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidates {
    /// Wire segments consumed by the path match.
    pub(crate) segments: usize,
    pub(crate) items: Indices,
}

impl EquivSet {
    pub(crate) fn new(segments: usize) -> Self {
        Self {
            segments,
            items: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.items.push(index);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a template reached this set only through terminal defaults.
    pub(crate) fn is_default_match(&self, template: &UriTemplate) -> bool {
        template.path_segments().len() > self.segments
    }

    /// The accepted members, keeping only full-length matches when there are
    /// any.
    pub(crate) fn candidates<T>(
        &self,
        entries: &[Entry<T>],
        accept: impl Fn(&UriTemplate) -> bool,
    ) -> Candidates {
        let accepted = self
            .items
            .iter()
            .copied()
            .filter(|&i| accept(&entries[i].template));
        let mut items: Indices = accepted.collect();
        if items.iter().any(|&i| !self.is_default_match(&entries[i].template)) {
            items.retain(|i| !self.is_default_match(&entries[*i].template));
        }
        Candidates {
            segments: self.segments,
            items,
        }
    }

    /// Proves that a wire path reaching this set selects a single template,
    /// or only duplicates when those are allowed.
    ///
    /// Full-length members and terminal-default members are checked apart,
    /// since filtered lookups may leave either group on its own.
    pub(crate) fn validate<T>(
        &self,
        entries: &[Entry<T>],
        allow_duplicates: bool,
    ) -> Result<(), TableError> {
        let members = self.items.iter().map(|&i| &entries[i].template);
        let (mut full, mut partial): (SmallVec<[_; 4]>, SmallVec<[_; 4]>) =
            members.partition(|t| !self.is_default_match(t));
        disambiguate_same_path(&mut full, allow_duplicates)?;
        disambiguate_same_path(&mut partial, allow_duplicates)
    }

    /// Joins sets reached at the same depth through parallel compound
    /// segments. Returns `None` when all of them are empty.
    pub(crate) fn merged<'s>(
        sets: impl IntoIterator<Item = &'s EquivSet>,
    ) -> Option<Cow<'s, EquivSet>> {
        let mut out: Option<Cow<'s, EquivSet>> = None;
        for set in sets.into_iter().filter(|s| !s.is_empty()) {
            match &mut out {
                Some(out) => out.to_mut().items.extend_from_slice(&set.items),
                None => out = Some(Cow::Borrowed(set)),
            }
        }
        out
    }

    pub(crate) fn names<T>(&self, entries: &[Entry<T>]) -> Vec<String> {
        self.items
            .iter()
            .map(|&i| entries[i].template.as_str().to_owned())
            .collect()
    }
}

fn names(templates: &[&UriTemplate]) -> Vec<String> {
    templates.iter().map(|t| t.as_str().to_owned()).collect()
}

fn all_equivalent(templates: &[&UriTemplate]) -> bool {
    match templates.split_first() {
        Some((first, rest)) => rest.iter().all(|t| first.is_equivalent_to(t)),
        None => true,
    }
}

/// Templates with the same path may coexist only when their queries tell
/// them apart. At most one of them may have no query at all.
fn disambiguate_same_path(
    templates: &mut [&UriTemplate],
    allow_duplicates: bool,
) -> Result<(), TableError> {
    if templates.len() < 2 {
        return Ok(());
    }
    templates.sort_by_key(|t| t.queries().len());

    let without_query = templates
        .iter()
        .take_while(|t| t.queries().is_empty())
        .count();
    let (plain, rest) = templates.split_at(without_query);
    if plain.len() > 1 && !(allow_duplicates && all_equivalent(plain)) {
        return Err(TableError::Duplicate(names(plain)));
    }
    if rest.len() < 2 {
        return Ok(());
    }
    ensure_queries_distinct(rest, allow_duplicates)
}

fn literal_value<'t>(template: &'t UriTemplate, key: &str) -> Option<Option<&'t str>> {
    template
        .queries()
        .iter()
        .find(|(k, _)| eq_folded(k, key))
        .and_then(|(_, v)| match v {
            QueryValue::Empty => Some(None),
            QueryValue::Literal(lit) => Some(Some(lit.as_str())),
            QueryValue::Variable(_) => None,
        })
}

fn ensure_queries_distinct(
    templates: &[&UriTemplate],
    allow_duplicates: bool,
) -> Result<(), TableError> {
    let first = templates[0];
    let keys: SmallVec<[&str; 4]> = first
        .queries()
        .iter()
        .filter(|(_, v)| v.is_literal())
        .map(|(k, _)| k.as_str())
        .filter(|k| templates[1..].iter().all(|t| literal_value(t, k).is_some()))
        .collect();

    if keys.is_empty() {
        if allow_duplicates && all_equivalent(templates) {
            return Ok(());
        }
        return Err(TableError::OtherAmbiguousQueries(names(templates)));
    }

    let tuples: Vec<SmallVec<[Option<&str>; 4]>> = templates
        .iter()
        .map(|t| keys.iter().filter_map(|k| literal_value(t, k)).collect())
        .collect();
    for i in 0..templates.len() {
        for j in i + 1..templates.len() {
            if tuples[i] == tuples[j]
                && !(allow_duplicates && templates[i].is_equivalent_to(templates[j]))
            {
                return Err(TableError::AmbiguousQueries(names(&[
                    templates[i],
                    templates[j],
                ])));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(texts: &[&str], allow_duplicates: bool) -> Result<(), TableError> {
        let templates: Vec<UriTemplate> = texts.iter().map(|t| t.parse().unwrap()).collect();
        let mut refs: Vec<&UriTemplate> = templates.iter().collect();
        disambiguate_same_path(&mut refs, allow_duplicates)
    }

    #[test]
    fn same_path_rules() {
        assert!(check(&["a/{x}"], false).is_ok());
        assert!(matches!(check(&["a/{x}", "a/{y}"], false), Err(TableError::Duplicate(_))));
        assert!(check(&["a/{x}", "a/{y}"], true).is_ok());
        assert!(check(&["a", "a?op=1", "a?op=2"], false).is_ok());
        assert!(matches!(
            check(&["a?op=1", "a?op=1&x={x}"], false),
            Err(TableError::AmbiguousQueries(_))
        ));
        assert!(matches!(
            check(&["a?op=1", "a?x={x}"], false),
            Err(TableError::OtherAmbiguousQueries(_))
        ));
        assert!(check(&["a?op=1&v=1", "a?op=1&v=2"], false).is_ok());
        assert!(check(&["a?op=1", "a?OP=1"], true).is_ok());
        assert!(check(&["a?flag", "a?flag=x"], false).is_ok());
    }

    #[test]
    fn default_members_checked_apart() {
        let entries: Vec<Entry<()>> = ["a/", "a/{x=1}", "a/{y=2}"]
            .iter()
            .map(|t| Entry {
                template: t.parse().unwrap(),
                data: (),
            })
            .collect();

        let mut first = EquivSet::new(1);
        first.push(0);
        first.push(1);
        assert!(first.validate(&entries, false).is_ok());

        let mut second = EquivSet::new(1);
        second.push(2);
        let empty = EquivSet::new(1);
        assert!(EquivSet::merged([&empty]).is_none());
        assert!(matches!(EquivSet::merged([&empty, &second]), Some(Cow::Borrowed(_))));

        let merged = EquivSet::merged([&first, &empty, &second]).unwrap();
        assert_eq!(merged.items, vec![0, 1, 2]);
        assert!(matches!(merged.validate(&entries, false), Err(TableError::Duplicate(_))));
        assert!(merged.validate(&entries, true).is_ok());
    }
}
