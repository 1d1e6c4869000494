use super::bound::BoundVariables;
use crate::escape::escape_query_part;
use crate::wire::WireQuery;

/// The value half of a template query pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// `?key`, present without a value.
    Empty,
    /// `?key=value`, stored unescaped.
    Literal(String),
    /// `?key={name}`.
    Variable(String),
}

impl QueryValue {
    /// Appends `&key`, `&key=value`, or nothing when a variable has no value.
    pub(crate) fn bind(&self, key: &str, value: Option<&str>, out: &mut String) {
        let value = match self {
            QueryValue::Empty => None,
            QueryValue::Literal(lit) => Some(lit.as_str()),
            QueryValue::Variable(_) => match value {
                Some(v) => Some(v),
                None => return,
            },
        };
        append_pair(out, key, value);
    }

    /// Tests the wire query against a literal requirement.
    ///
    /// A variable requires its key to be present only when `require_variables`
    /// is set.
    pub(crate) fn is_match(&self, key: &str, query: &WireQuery, require_variables: bool) -> bool {
        match self {
            QueryValue::Empty => query.get(key).map_or(false, |v| v.is_empty()),
            QueryValue::Literal(lit) => query.get(key).map_or(false, |v| *v == **lit),
            QueryValue::Variable(_) => !require_variables || query.contains_key(key),
        }
    }

    pub(crate) fn lookup(&self, key: &str, query: &WireQuery, bound: &mut BoundVariables) {
        if let QueryValue::Variable(name) = self {
            if let Some(value) = query.get(key) {
                bound.push(name, &value);
            }
        }
    }

    pub(crate) fn is_literal(&self) -> bool {
        !matches!(self, QueryValue::Variable(_))
    }

    pub(crate) fn is_equivalent_to(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryValue::Empty, QueryValue::Empty) => true,
            (QueryValue::Literal(a), QueryValue::Literal(b)) => a == b,
            (QueryValue::Variable(_), QueryValue::Variable(_)) => true,
            _ => false,
        }
    }
}

pub(crate) fn append_pair(out: &mut String, key: &str, value: Option<&str>) {
    if !out.is_empty() {
        out.push('&');
    }
    out.push_str(&escape_query_part(key));
    if let Some(value) = value {
        out.push('=');
        out.push_str(&escape_query_part(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use url::Url;

    fn query(s: &str) -> WireQuery {
        WireQuery::parse(&Url::parse(&format!("http://h/{}", s)).unwrap())
    }

    #[test]
    fn literal_requirements() {
        let q = query("?op=add&flag&v=");
        let cases: &[(&str, QueryValue, bool)] = &[
            ("op", QueryValue::Literal("add".into()), true),
            ("OP", QueryValue::Literal("add".into()), true),
            ("op", QueryValue::Literal("Add".into()), false),
            ("flag", QueryValue::Empty, true),
            ("v", QueryValue::Empty, true),
            ("op", QueryValue::Empty, false),
            ("missing", QueryValue::Empty, false),
            ("missing", QueryValue::Variable("x".into()), true),
        ];
        for (key, value, expected) in cases {
            assert_eq!(value.is_match(key, &q, false), *expected, "{} {:?}", key, value);
        }
        assert!(!QueryValue::Variable("x".into()).is_match("missing", &q, true));
        assert!(QueryValue::Variable("x".into()).is_match("flag", &q, true));
    }

    #[test]
    fn binding_pairs() {
        let mut out = String::new();
        QueryValue::Literal("a b".into()).bind("k", None, &mut out);
        QueryValue::Empty.bind("flag", None, &mut out);
        QueryValue::Variable("x".into()).bind("x", None, &mut out);
        QueryValue::Variable("y".into()).bind("y", Some("1&2"), &mut out);
        assert_eq!(out, "k=a+b&flag&y=1%262");
    }
}
