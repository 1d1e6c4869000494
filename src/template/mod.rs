mod bind;
mod bound;
mod classify;
mod error;
mod matching;
mod query;
mod segment;
mod variables;

pub use self::bound::BoundVariables;
pub use self::error::{BindError, TemplateError};
pub use self::matching::UriTemplateMatch;
pub use self::query::QueryValue;
pub use self::segment::{CompoundSegment, LiteralSegment, PathSegment, VariableSegment};

use self::classify::{
    classify, parse_declaration, raw_segments, split_template, wildcard_form, Part, RawSegment,
    Token, Tokens, WILDCARD,
};
use self::variables::{DefaultValue, Variables, VariableKind};
use crate::escape::{unescape, unescape_query_part};
use crate::strmap::{eq_folded, fold};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use smallvec::SmallVec;

/// A parsed URI template.
///
/// Immutable once built. See [`UriTemplate::match_uri`] and
/// [`UriTemplate::bind_by_name`].
#[derive(Debug, Clone)]
pub struct UriTemplate {
    original: String,
    segments: Vec<PathSegment>,
    wildcard: Option<Wildcard>,
    queries: Vec<(String, QueryValue)>,
    fragment: Option<String>,
    variables: Variables,
    first_optional_segment: usize,
    ignore_trailing_slash: bool,
}

#[derive(Debug, Clone)]
struct Wildcard {
    name: Option<String>,
}

/// Options for building a [`UriTemplate`].
#[derive(Debug, Clone)]
pub struct UriTemplateBuilder {
    text: String,
    ignore_trailing_slash: bool,
    additional_defaults: Vec<(String, String)>,
}

impl UriTemplateBuilder {
    /// Lets a trailing slash on the wire differ from the template.
    pub fn ignore_trailing_slash(mut self, yes: bool) -> Self {
        self.ignore_trailing_slash = yes;
        self
    }

    /// Adds a default value.
    ///
    /// A path variable name sets that variable's default; any other name is
    /// bound on every match and appended to the query on bind.
    pub fn additional_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_defaults.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<UriTemplate, TemplateError> {
        let text = self.text;
        let parts = split_template(&text);

        let mut variables = Variables::default();
        let mut segments: Vec<PathSegment> = Vec::new();
        let mut wildcard = None;

        {
            let mut raws = raw_segments(parts.path).peekable();
            while let Some(raw) = raws.next() {
                let is_last = raws.peek().is_none();
                if is_last && !raw.ends_with_slash {
                    if let Some(form) = wildcard_form(raw.body) {
                        wildcard = Some(parse_wildcard(&text, form, &mut variables)?);
                        break;
                    }
                }
                if raw.body.contains(WILDCARD) {
                    return Err(TemplateError::InvalidWildcard {
                        template: text.clone(),
                    });
                }
                let segment = parse_segment(&text, raw, segments.len(), &mut variables)?;
                segments.push(segment);
            }
        }

        let queries = match parts.query {
            Some(query) => parse_query(&text, query, &mut variables)?,
            None => Vec::new(),
        };

        for (name, value) in &self.additional_defaults {
            variables.add_additional_default(&text, name, value)?;
        }
        let first_optional_segment =
            variables.validate_defaults(&text, &segments, wildcard.is_some())?;

        let fragment = parts.fragment.map(str::to_owned);
        Ok(UriTemplate {
            original: text,
            segments,
            wildcard,
            queries,
            fragment,
            variables,
            first_optional_segment,
            ignore_trailing_slash: self.ignore_trailing_slash,
        })
    }
}

fn invalid_format(template: &str, part: &str) -> TemplateError {
    TemplateError::InvalidFormat {
        template: template.to_owned(),
        part: part.to_owned(),
    }
}

fn invalid_variable(template: &str, declaration: &str) -> TemplateError {
    TemplateError::InvalidVariable {
        template: template.to_owned(),
        declaration: declaration.to_owned(),
    }
}

fn parse_wildcard(
    template: &str,
    form: Option<&str>,
    variables: &mut Variables,
) -> Result<Wildcard, TemplateError> {
    let decl = match form {
        None => return Ok(Wildcard { name: None }),
        Some(decl) => decl,
    };
    let d = parse_declaration(decl).ok_or_else(|| invalid_variable(template, decl))?;
    if d.name.contains(WILDCARD) {
        return Err(TemplateError::InvalidWildcard {
            template: template.to_owned(),
        });
    }
    variables.add_path(template, d.name, VariableKind::Wildcard, d.default)?;
    Ok(Wildcard {
        name: Some(d.name.to_owned()),
    })
}

fn parse_segment(
    template: &str,
    raw: RawSegment<'_>,
    index: usize,
    variables: &mut Variables,
) -> Result<PathSegment, TemplateError> {
    let slash = raw.ends_with_slash;
    match classify(raw.body).ok_or_else(|| invalid_format(template, raw.body))? {
        Part::Literal(text) => Ok(PathSegment::Literal(LiteralSegment::new(
            unescape(text),
            slash,
        ))),
        Part::Variable(decl) => {
            let d = parse_declaration(decl).ok_or_else(|| invalid_variable(template, decl))?;
            variables.add_path(template, d.name, VariableKind::Segment(index), d.default)?;
            Ok(PathSegment::Variable(VariableSegment::new(
                d.name.to_owned(),
                slash,
            )))
        }
        Part::Compound(tokens) => {
            parse_compound(template, raw.body, &tokens, index, slash, variables)
                .map(PathSegment::Compound)
        }
    }
}

fn parse_compound(
    template: &str,
    body: &str,
    tokens: &Tokens<'_>,
    index: usize,
    slash: bool,
    variables: &mut Variables,
) -> Result<CompoundSegment, TemplateError> {
    let mut prefix = String::new();
    let mut parts: SmallVec<[(String, String); 2]> = SmallVec::new();
    for token in tokens {
        match *token {
            Token::Literal(text) => match parts.last_mut() {
                Some((_, anchor)) => *anchor = unescape(text),
                None => prefix = unescape(text),
            },
            Token::Variable(decl) => {
                if parts.last().map_or(false, |(_, anchor)| anchor.is_empty()) {
                    return Err(TemplateError::AdjacentVariables {
                        template: template.to_owned(),
                        segment: body.to_owned(),
                    });
                }
                let d = parse_declaration(decl).ok_or_else(|| invalid_variable(template, decl))?;
                variables.add_path(template, d.name, VariableKind::Compound(index), d.default)?;
                parts.push((d.name.to_owned(), String::new()));
            }
        }
    }
    Ok(CompoundSegment::new(prefix, parts, slash))
}

fn parse_query(
    template: &str,
    query: &str,
    variables: &mut Variables,
) -> Result<Vec<(String, QueryValue)>, TemplateError> {
    let mut queries: Vec<(String, QueryValue)> = Vec::new();
    if query.is_empty() {
        return Ok(queries);
    }
    if query.ends_with('&') {
        return Err(TemplateError::QueryEndsWithAmpersand {
            template: template.to_owned(),
        });
    }
    for pair in query.split('&') {
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };
        if raw_key.is_empty() {
            return Err(TemplateError::EmptyQueryName {
                template: template.to_owned(),
            });
        }
        if pair.contains(WILDCARD) {
            return Err(TemplateError::InvalidWildcard {
                template: template.to_owned(),
            });
        }
        let key = match classify(raw_key).ok_or_else(|| invalid_format(template, raw_key))? {
            Part::Literal(k) => unescape_query_part(k),
            _ => {
                return Err(TemplateError::QueryNameNotLiteral {
                    template: template.to_owned(),
                })
            }
        };
        if queries.iter().any(|(k, _)| eq_folded(k, &key)) {
            return Err(TemplateError::DuplicateQueryName {
                template: template.to_owned(),
                name: key,
            });
        }
        let value = match raw_value {
            None => QueryValue::Empty,
            Some(raw) => match classify(raw).ok_or_else(|| invalid_format(template, raw))? {
                Part::Literal(v) => QueryValue::Literal(unescape_query_part(v)),
                Part::Variable(decl) => {
                    let d = parse_declaration(decl)
                        .ok_or_else(|| invalid_variable(template, decl))?;
                    variables.add_query(template, d.name, d.default)?;
                    QueryValue::Variable(d.name.to_owned())
                }
                Part::Compound(_) => {
                    return Err(TemplateError::CompoundQueryValue {
                        template: template.to_owned(),
                        value: raw.to_owned(),
                    })
                }
            },
        };
        queries.push((key, value));
    }
    Ok(queries)
}

impl UriTemplate {
    pub fn new(text: &str) -> Result<Self, TemplateError> {
        Self::builder(text).build()
    }

    pub fn builder(text: impl Into<String>) -> UriTemplateBuilder {
        UriTemplateBuilder {
            text: text.into(),
            ignore_trailing_slash: false,
            additional_defaults: Vec::new(),
        }
    }

    /// The template text as written.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn path_segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Query pairs in declaration order, keys unescaped.
    pub fn query_values(&self) -> impl Iterator<Item = (&str, &QueryValue)> + '_ {
        self.queries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Upper-cased path variable names, the wildcard variable last.
    pub fn path_segment_variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.path().iter().map(|v| v.name.as_str())
    }

    /// Upper-cased query variable names.
    pub fn query_value_variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.query().iter().map(String::as_str)
    }

    /// Default values; `None` marks a nullable default.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        let path = self.variables.path().iter().filter_map(|v| match &v.default {
            Some(DefaultValue::Value(d)) => Some((v.name.as_str(), Some(d.as_str()))),
            Some(DefaultValue::Nullable) => Some((v.name.as_str(), None)),
            None => None,
        });
        let extra = self
            .variables
            .extra_defaults()
            .iter()
            .map(|(k, v)| (k.as_str(), Some(v.as_str())));
        path.chain(extra)
    }

    pub fn ignore_trailing_slash(&self) -> bool {
        self.ignore_trailing_slash
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    pub(crate) fn first_optional_segment(&self) -> usize {
        self.first_optional_segment
    }

    pub(crate) fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }

    pub(crate) fn queries(&self) -> &[(String, QueryValue)] {
        &self.queries
    }

    /// Path equivalence: same shape, literal texts equal ignoring case,
    /// compound anchors equal, variable names and defaults irrelevant.
    pub fn is_equivalent_to(&self, other: &UriTemplate) -> bool {
        if self.has_wildcard() != other.has_wildcard()
            || self.segments.len() != other.segments.len()
            || self.queries.len() != other.queries.len()
        {
            return false;
        }
        let ignore = self.ignore_trailing_slash || other.ignore_trailing_slash;
        let last = self.segments.len().saturating_sub(1);
        let paths = self
            .segments
            .iter()
            .zip(&other.segments)
            .enumerate()
            .all(|(i, (a, b))| a.is_equivalent_to(b, ignore && i == last));
        paths
            && self.queries.iter().all(|(key, value)| {
                other
                    .queries
                    .iter()
                    .find(|(k, _)| eq_folded(k, key))
                    .map_or(false, |(_, v)| value.is_equivalent_to(v))
            })
    }
}

impl FromStr for UriTemplate {
    type Err = TemplateError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Compares and hashes a template by [`UriTemplate::is_equivalent_to`].
#[derive(Debug, Clone, Copy)]
pub struct Equivalent<'a>(pub &'a UriTemplate);

impl PartialEq for Equivalent<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.is_equivalent_to(other.0)
    }
}

impl Eq for Equivalent<'_> {}

impl Hash for Equivalent<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let t = self.0;
        t.has_wildcard().hash(state);
        t.segments.len().hash(state);
        let last = t.segments.len().saturating_sub(1);
        for (i, segment) in t.segments.iter().enumerate() {
            if i != last {
                segment.ends_with_slash().hash(state);
            }
            match segment {
                PathSegment::Literal(s) => {
                    0u8.hash(state);
                    fold(s.text()).hash(state);
                }
                PathSegment::Variable(_) => 1u8.hash(state),
                PathSegment::Compound(s) => {
                    2u8.hash(state);
                    s.prefix().hash(state);
                    for (_, anchor) in s.parts() {
                        anchor.hash(state);
                    }
                }
            }
        }
        let mut queries: SmallVec<[(String, Option<&str>, bool); 4]> = t
            .queries
            .iter()
            .map(|(k, v)| match v {
                QueryValue::Empty => (fold(k), None, false),
                QueryValue::Literal(lit) => (fold(k), Some(lit.as_str()), false),
                QueryValue::Variable(_) => (fold(k), None, true),
            })
            .collect();
        queries.sort_unstable();
        queries.hash(state);
    }
}
