use super::bound::BoundVariables;
use crate::escape::escape_segment;
use crate::strmap::{cmp_folded, cmp_folded_rev, eq_folded};
use crate::wire::WireSegment;

use std::cmp::Ordering;

use smallvec::SmallVec;

/// One `/`-delimited piece of a template path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(LiteralSegment),
    Variable(VariableSegment),
    Compound(CompoundSegment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSegment {
    text: String,
    ends_with_slash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSegment {
    name: String,
    ends_with_slash: bool,
}

/// A segment mixing literal anchors and variables, such as `foo{x}bar`.
///
/// Each variable is followed by its anchor; only the last anchor may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSegment {
    prefix: String,
    parts: SmallVec<[(String, String); 2]>,
    ends_with_slash: bool,
}

impl LiteralSegment {
    pub(crate) fn new(text: String, ends_with_slash: bool) -> Self {
        Self {
            text,
            ends_with_slash,
        }
    }

    /// The unescaped text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn is_match(&self, wire: &str) -> bool {
        eq_folded(&self.text, wire)
    }
}

impl VariableSegment {
    pub(crate) fn new(name: String, ends_with_slash: bool) -> Self {
        Self {
            name,
            ends_with_slash,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CompoundSegment {
    pub(crate) fn new(
        prefix: String,
        parts: SmallVec<[(String, String); 2]>,
        ends_with_slash: bool,
    ) -> Self {
        debug_assert!(!parts.is_empty());
        Self {
            prefix,
            parts,
            ends_with_slash,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        self.parts.last().map_or("", |(_, lit)| lit.as_str())
    }

    /// `(variable name, following anchor)` pairs in order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.parts.iter().map(|(v, l)| (v.as_str(), l.as_str()))
    }

    pub fn variable_count(&self) -> usize {
        self.parts.len()
    }

    /// Runs the anchor search, returning one capture per variable.
    ///
    /// The prefix must start the text, each inner anchor is found leftmost with
    /// at least one character before it, and the suffix must end the text.
    pub(crate) fn captures<'w>(&self, wire: &'w str) -> Option<SmallVec<[&'w str; 2]>> {
        let mut rest = wire.strip_prefix(self.prefix.as_str())?;
        let mut out = SmallVec::new();
        let last = self.parts.len() - 1;
        for (i, (_, anchor)) in self.parts.iter().enumerate() {
            if i < last {
                let skip = rest.chars().next()?.len_utf8();
                let at = rest[skip..].find(anchor.as_str())? + skip;
                out.push(&rest[..at]);
                rest = &rest[at + anchor.len()..];
            } else {
                let value = rest.strip_suffix(anchor.as_str())?;
                if value.is_empty() {
                    return None;
                }
                out.push(value);
            }
        }
        Some(out)
    }

    pub(crate) fn is_match(&self, wire: &str) -> bool {
        self.captures(wire).is_some()
    }

    fn class(&self) -> u8 {
        match (self.prefix.is_empty(), self.suffix().is_empty()) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    /// Orders compound segments by the precedence they are tried in.
    ///
    /// `Less` is tried first. Segments with both a prefix and a suffix come
    /// first, then prefix only, then suffix only, then neither. Inside a class
    /// prefixes and then reversed suffixes compare descending, ignoring case,
    /// and more variables win the remaining ties.
    pub(crate) fn cmp_precedence(&self, other: &Self) -> Ordering {
        let class = self.class();
        class
            .cmp(&other.class())
            .then_with(|| match class {
                0 | 1 => cmp_folded(&other.prefix, &self.prefix),
                _ => Ordering::Equal,
            })
            .then_with(|| match class {
                0 | 2 => cmp_folded_rev(other.suffix(), self.suffix()),
                _ => Ordering::Equal,
            })
            .then_with(|| other.parts.len().cmp(&self.parts.len()))
    }

    pub(crate) fn is_equivalent_to(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(other.parts.iter())
                .all(|((_, a), (_, b))| a == b)
    }
}

impl PathSegment {
    pub fn ends_with_slash(&self) -> bool {
        match self {
            PathSegment::Literal(s) => s.ends_with_slash,
            PathSegment::Variable(s) => s.ends_with_slash,
            PathSegment::Compound(s) => s.ends_with_slash,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PathSegment::Literal(_))
    }

    /// Appends this segment, consuming one value per variable, and returns
    /// the number of values consumed.
    pub(crate) fn bind<'v>(
        &self,
        values: &mut impl Iterator<Item = &'v str>,
        out: &mut String,
    ) -> usize {
        let consumed = match self {
            PathSegment::Literal(s) => {
                out.push_str(&escape_segment(&s.text));
                0
            }
            PathSegment::Variable(_) => {
                out.push_str(&escape_segment(values.next().unwrap_or_default()));
                1
            }
            PathSegment::Compound(s) => {
                out.push_str(&escape_segment(&s.prefix));
                for (_, anchor) in &s.parts {
                    out.push_str(&escape_segment(values.next().unwrap_or_default()));
                    out.push_str(&escape_segment(anchor));
                }
                s.parts.len()
            }
        };
        if self.ends_with_slash() {
            out.push('/');
        }
        consumed
    }

    /// Tests one wire segment; the trailing slash is compared unless ignored.
    pub(crate) fn is_match(&self, wire: &WireSegment, ignore_trailing_slash: bool) -> bool {
        if !ignore_trailing_slash && self.ends_with_slash() != wire.ends_with_slash {
            return false;
        }
        match self {
            PathSegment::Literal(s) => s.is_match(&wire.text),
            PathSegment::Variable(_) => !wire.is_empty(),
            PathSegment::Compound(s) => s.is_match(&wire.text),
        }
    }

    /// Records the captures of a segment that already passed `is_match`.
    pub(crate) fn lookup(&self, wire: &str, bound: &mut BoundVariables) {
        match self {
            PathSegment::Literal(_) => {}
            PathSegment::Variable(s) => bound.push(&s.name, wire),
            PathSegment::Compound(s) => {
                if let Some(captures) = s.captures(wire) {
                    for ((name, _), value) in s.parts.iter().zip(captures) {
                        bound.push(name, value);
                    }
                }
            }
        }
    }

    pub(crate) fn is_equivalent_to(&self, other: &Self, ignore_trailing_slash: bool) -> bool {
        if !ignore_trailing_slash && self.ends_with_slash() != other.ends_with_slash() {
            return false;
        }
        match (self, other) {
            (PathSegment::Literal(a), PathSegment::Literal(b)) => eq_folded(&a.text, &b.text),
            (PathSegment::Variable(_), PathSegment::Variable(_)) => true,
            (PathSegment::Compound(a), PathSegment::Compound(b)) => a.is_equivalent_to(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound(prefix: &str, parts: &[(&str, &str)]) -> CompoundSegment {
        let parts = parts
            .iter()
            .map(|&(v, l)| (v.to_owned(), l.to_owned()))
            .collect();
        CompoundSegment::new(prefix.to_owned(), parts, false)
    }

    #[test]
    fn anchor_search() {
        let seg = compound("foo", &[("x", "bar")]);
        assert_eq!(seg.captures("fooZbar").unwrap().as_slice(), &["Z"]);
        assert!(seg.captures("foobar").is_none());
        assert!(seg.captures("FOOzbar").is_none());

        let seg = compound("", &[("name", "."), ("ext", "")]);
        assert_eq!(seg.captures("a.b.c").unwrap().as_slice(), &["a", "b.c"]);
        assert_eq!(seg.captures("..c").unwrap().as_slice(), &[".", "c"]);
        assert!(seg.captures("abc.").is_none());
        assert!(seg.captures(".abc").is_none());

        let seg = compound("v", &[("major", "-"), ("minor", "")]);
        assert_eq!(seg.captures("v1-2").unwrap().as_slice(), &["1", "2"]);
        assert!(seg.captures("v-2").is_none());
    }

    #[test]
    fn precedence_order() {
        let food = compound("food", &[("x", "ar")]);
        let foo = compound("foo", &[("x", "bar")]);
        let prefix_only = compound("foo", &[("x", "")]);
        let suffix_only = compound("", &[("x", "bar")]);
        let neither = compound("", &[("x", "."), ("y", "")]);

        assert_eq!(food.cmp_precedence(&foo), Ordering::Less);
        assert_eq!(foo.cmp_precedence(&prefix_only), Ordering::Less);
        assert_eq!(prefix_only.cmp_precedence(&suffix_only), Ordering::Less);
        assert_eq!(suffix_only.cmp_precedence(&neither), Ordering::Less);

        let zar = compound("", &[("x", "zar")]);
        let bar = compound("", &[("x", "BAR")]);
        assert_eq!(zar.cmp_precedence(&bar), Ordering::Less);

        let more = compound("a", &[("x", "-"), ("y", "b")]);
        let fewer = compound("a", &[("x", "b")]);
        assert_eq!(more.cmp_precedence(&fewer), Ordering::Less);
        assert_eq!(fewer.cmp_precedence(&fewer.clone()), Ordering::Equal);
    }

    #[test]
    fn equivalence_ignores_names() {
        let a = PathSegment::Compound(compound("a", &[("x", "b")]));
        let b = PathSegment::Compound(compound("a", &[("y", "b")]));
        let c = PathSegment::Compound(compound("a", &[("x", "c")]));
        assert!(a.is_equivalent_to(&b, false));
        assert!(!a.is_equivalent_to(&c, false));

        let lit = PathSegment::Literal(LiteralSegment::new("Orders".into(), true));
        let lit2 = PathSegment::Literal(LiteralSegment::new("ORDERS".into(), false));
        assert!(!lit.is_equivalent_to(&lit2, false));
        assert!(lit.is_equivalent_to(&lit2, true));
    }

    #[test]
    fn bind_escapes() {
        let seg = PathSegment::Compound(compound("a b", &[("x", "/")]));
        let mut out = String::new();
        let mut values = ["c d"].into_iter();
        assert_eq!(seg.bind(&mut values, &mut out), 1);
        assert_eq!(out, "a%20bc%20d%2F");
    }
}
