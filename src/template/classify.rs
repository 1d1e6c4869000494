use smallvec::SmallVec;

pub(crate) const WILDCARD: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Literal(&'a str),
    /// The text between the braces, default included.
    Variable(&'a str),
}

pub(crate) type Tokens<'a> = SmallVec<[Token<'a>; 4]>;

/// A segment or query value classified by its syntactic nature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part<'a> {
    Literal(&'a str),
    Variable(&'a str),
    Compound(Tokens<'a>),
}

/// The raw pieces of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TemplateParts<'a> {
    pub(crate) path: &'a str,
    pub(crate) query: Option<&'a str>,
    pub(crate) fragment: Option<&'a str>,
}

pub(crate) fn split_template(text: &str) -> TemplateParts<'_> {
    let (rest, fragment) = match text.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (text, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    let path = path.strip_prefix('/').unwrap_or(path);
    TemplateParts {
        path,
        query,
        fragment,
    }
}

/// One path piece as written, split from its trailing slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawSegment<'a> {
    pub(crate) body: &'a str,
    pub(crate) ends_with_slash: bool,
}

pub(crate) fn raw_segments(path: &str) -> impl Iterator<Item = RawSegment<'_>> + '_ {
    path.split_inclusive('/').map(|raw| match raw.strip_suffix('/') {
        Some(body) => RawSegment {
            body,
            ends_with_slash: true,
        },
        None => RawSegment {
            body: raw,
            ends_with_slash: false,
        },
    })
}

/// Splits a segment or query value into literal runs and brace declarations.
///
/// Returns `None` on a stray `}`, an unclosed or nested `{`, or empty braces.
pub(crate) fn tokenize(part: &str) -> Option<Tokens<'_>> {
    let mut tokens = Tokens::new();
    let mut rest = part;
    while !rest.is_empty() {
        let open = match rest.find(['{', '}']) {
            None => {
                tokens.push(Token::Literal(rest));
                break;
            }
            Some(i) if rest.as_bytes()[i] == b'}' => return None,
            Some(i) => i,
        };
        if open > 0 {
            tokens.push(Token::Literal(&rest[..open]));
        }
        let body = &rest[open + 1..];
        let close = body.find(['{', '}'])?;
        if close == 0 || body.as_bytes()[close] == b'{' {
            return None;
        }
        tokens.push(Token::Variable(&body[..close]));
        rest = &body[close + 1..];
    }
    Some(tokens)
}

/// A single declaration spanning the whole text is a variable; a mix of
/// literals and declarations is a compound.
pub(crate) fn classify(part: &str) -> Option<Part<'_>> {
    let tokens = tokenize(part)?;
    if tokens.len() > 1 {
        return Some(Part::Compound(tokens));
    }
    Some(match tokens.first() {
        None => Part::Literal(""),
        Some(&Token::Literal(text)) => Part::Literal(text),
        Some(&Token::Variable(decl)) => Part::Variable(decl),
    })
}

/// Recognizes the two wildcard forms, `*` and `{*name}`.
///
/// `Some(None)` is the unnamed wildcard, `Some(Some(decl))` the named one with
/// the star stripped from its declaration.
pub(crate) fn wildcard_form(body: &str) -> Option<Option<&str>> {
    if body.len() == 1 && body.starts_with(WILDCARD) {
        return Some(None);
    }
    let decl = body.strip_prefix('{')?.strip_suffix('}')?;
    let name = decl.strip_prefix(WILDCARD)?;
    if name.contains(['{', '}']) {
        return None;
    }
    Some(Some(name))
}

/// A `name` or `name=default` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Declaration<'a> {
    pub(crate) name: &'a str,
    pub(crate) default: Option<&'a str>,
}

pub(crate) fn parse_declaration(decl: &str) -> Option<Declaration<'_>> {
    let (name, default) = match decl.split_once('=') {
        Some((name, default)) => (name, Some(default)),
        None => (decl, None),
    };
    if name.is_empty() || default.map_or(false, |d| d.contains('=')) {
        return None;
    }
    Some(Declaration { name, default })
}

/// The nullable default marker, compared ignoring ASCII case.
pub(crate) fn is_null_marker(value: &str) -> bool {
    value.eq_ignore_ascii_case("null")
}
