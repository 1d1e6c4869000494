use super::bound::BoundVariables;
use super::variables::{DefaultValue, VariableKind};
use super::UriTemplate;
use crate::wire::{wire_path, WireQuery, WireSegment};

use url::Url;

/// The result of matching a URI against a template.
#[derive(Debug, Clone)]
pub struct UriTemplateMatch<'a> {
    template: &'a UriTemplate,
    base_uri: Url,
    request_uri: Url,
    bound_variables: BoundVariables,
    relative_path_segments: Vec<String>,
    wildcard_start: Option<usize>,
    query_parameters: Vec<(String, String)>,
}

impl<'a> UriTemplateMatch<'a> {
    pub fn template(&self) -> &'a UriTemplate {
        self.template
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn request_uri(&self) -> &Url {
        &self.request_uri
    }

    pub fn bound_variables(&self) -> &BoundVariables {
        &self.bound_variables
    }

    /// Shorthand for `bound_variables().get(name)`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bound_variables.get(name)
    }

    /// Unescaped path segments below the base, without their slashes.
    pub fn relative_path_segments(&self) -> &[String] {
        &self.relative_path_segments
    }

    /// The segments captured by the wildcard, empty without one.
    pub fn wildcard_path_segments(&self) -> &[String] {
        match self.wildcard_start {
            Some(i) => self.relative_path_segments.get(i..).unwrap_or_default(),
            None => &[],
        }
    }

    /// The unescaped query of the request, in wire order.
    pub fn query_parameters(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.query_parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn join_segments(segments: &[WireSegment]) -> String {
    let mut out = String::new();
    for s in segments {
        out.push_str(&s.text);
        if s.ends_with_slash {
            out.push('/');
        }
    }
    out
}

impl UriTemplate {
    /// Matches `candidate` below `base`.
    ///
    /// Returns `None` when the candidate is not below the base or does not
    /// match. Literal query requirements must be met; query variables bind
    /// only when present.
    pub fn match_uri<'a>(&'a self, base: &Url, candidate: &Url) -> Option<UriTemplateMatch<'a>> {
        if base.cannot_be_a_base() {
            return None;
        }
        let wire = wire_path(base, candidate)?;
        let query = WireQuery::parse(candidate);
        if !self.matches_query(&query, false) {
            return None;
        }

        if let Some(count) = self.match_path(&wire) {
            return Some(self.create_match(base, candidate, &wire, count, query));
        }

        // `a` reaches the omitted defaults of `a/{x=1}` as if it were `a/`
        if self.first_optional_segment >= self.segments.len() {
            return None;
        }
        let mut toggled = wire.clone();
        match toggled.last_mut() {
            Some(last) if !last.ends_with_slash => last.ends_with_slash = true,
            _ => return None,
        }
        let count = self.match_path(&toggled)?;
        if count < self.segments.len() {
            Some(self.create_match(base, candidate, &toggled, count, query))
        } else {
            None
        }
    }

    /// Walks the declared segments against the wire in lock-step and returns
    /// how many declared segments were matched.
    pub(crate) fn match_path(&self, wire: &[WireSegment]) -> Option<usize> {
        for (i, segment) in self.segments.iter().enumerate() {
            let w = match wire.get(i) {
                Some(w) => w,
                None if i >= self.first_optional_segment => return Some(i),
                None => return None,
            };
            let ignore = self.ignore_trailing_slash && i + 1 == wire.len();
            if !segment.is_match(w, ignore) {
                return None;
            }
        }
        if wire.len() > self.segments.len() && self.wildcard.is_none() {
            return None;
        }
        Some(self.segments.len())
    }

    pub(crate) fn matches_query(&self, query: &WireQuery, require_variables: bool) -> bool {
        self.queries
            .iter()
            .all(|(key, value)| value.is_match(key, query, require_variables))
    }

    /// Whether the query matches because of something the template declares,
    /// as opposed to the template having no query at all.
    pub(crate) fn matches_query_interestingly(
        &self,
        query: &WireQuery,
        require_variables: bool,
    ) -> bool {
        !self.queries.is_empty() && self.matches_query(query, require_variables)
    }

    pub(crate) fn has_query_literals(&self) -> bool {
        self.queries.iter().any(|(_, value)| value.is_literal())
    }

    /// Binds the variables of a match whose first `count` segments passed
    /// `match_path` against `wire`.
    pub(crate) fn create_match<'a>(
        &'a self,
        base: &Url,
        candidate: &Url,
        wire: &[WireSegment],
        count: usize,
        query: WireQuery,
    ) -> UriTemplateMatch<'a> {
        let mut bound = BoundVariables::new();
        for (segment, w) in self.segments.iter().zip(wire).take(count) {
            segment.lookup(&w.text, &mut bound);
        }

        let wildcard_start = self.wildcard.as_ref().map(|_| count.min(wire.len()));
        if let Some(name) = self.wildcard.as_ref().and_then(|w| w.name.as_deref()) {
            let rest = wire.get(count..).unwrap_or_default();
            bound.push(name, &join_segments(rest));
        }

        for v in self.variables.path() {
            if let (VariableKind::Segment(i), Some(DefaultValue::Value(d))) = (v.kind, &v.default) {
                if i >= count {
                    bound.push(&v.name, d);
                }
            }
        }

        for (key, value) in &self.queries {
            value.lookup(key, &query, &mut bound);
        }

        for (name, value) in self.variables.extra_defaults() {
            if !bound.contains(name) {
                bound.push(name, value);
            }
        }

        UriTemplateMatch {
            template: self,
            base_uri: base.clone(),
            request_uri: candidate.clone(),
            bound_variables: bound,
            relative_path_segments: wire.iter().map(|s| s.text.clone()).collect(),
            wildcard_start,
            query_parameters: query.into_pairs(),
        }
    }
}
