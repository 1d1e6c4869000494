use nuclear_uri_template::{
    BindError, Equivalent, TemplateError, UriTemplate, UriTemplateMatch, Url,
};

use std::collections::HashMap;

use pretty_assertions::assert_eq;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn bound<'a>(m: &'a UriTemplateMatch<'_>) -> Vec<(&'a str, &'a str)> {
    m.bound_variables().iter().collect()
}

#[test]
fn template_round_trip() {
    let base = url("http://example.com/svc/");
    let cases: &[(&str, &[(&str, &str)])] = &[
        ("users/{id}", &[("ID", "42")]),
        ("users/{id}/posts/{post}/", &[("ID", "a b"), ("POST", "x/y")]),
        ("files/{name}.{ext}", &[("NAME", "report"), ("EXT", "tar.gz")]),
        ("v{major}-{minor}/info", &[("MAJOR", "1"), ("MINOR", "2")]),
        ("search?q={q}&page={page}", &[("Q", "rust & go"), ("PAGE", "3")]),
        ("a/{x}?mode=full&verbose", &[("X", "ü")]),
        ("static/{*path}", &[("PATH", "css/site.css")]),
        ("{x}", &[("X", "50%")]),
    ];

    for &(text, values) in cases {
        let t = UriTemplate::new(text).unwrap();
        let uri = t.bind_by_name(&base, values.iter().copied(), false).unwrap();
        let m = t
            .match_uri(&base, &uri)
            .unwrap_or_else(|| panic!("{} did not match {}", text, uri));
        assert_eq!(bound(&m), values, "{}", uri);

        let positional: Vec<&str> = values.iter().map(|&(_, v)| v).collect();
        assert_eq!(t.bind_by_position(&base, &positional).unwrap(), uri);
    }
}

#[test]
fn template_terminal_defaults() {
    let base = url("http://example.com/");
    let t = UriTemplate::new("a/{x=1}").unwrap();

    let cases: &[(&str, Option<&str>)] = &[
        ("http://example.com/a/", Some("1")),
        ("http://example.com/a", Some("1")),
        ("http://example.com/a/5", Some("5")),
        ("http://example.com/a/5/", None),
        ("http://example.com/b", None),
    ];
    for &(candidate, expected) in cases {
        let got = t.match_uri(&base, &url(candidate));
        assert_eq!(got.as_ref().and_then(|m| m.get("x")), expected, "{}", candidate);
    }

    let omitted = t.bind_by_name(&base, [("x", "1")], true).unwrap();
    assert_eq!(omitted.as_str(), "http://example.com/a/");
    let kept = t.bind_by_name(&base, [("x", "1")], false).unwrap();
    assert_eq!(kept.as_str(), "http://example.com/a/1");
}

#[test]
fn template_wildcards() {
    let base = url("http://example.com/");
    let candidate = url("http://example.com/a/b/c");

    let unnamed = UriTemplate::new("a/*").unwrap();
    let m = unnamed.match_uri(&base, &candidate).unwrap();
    assert!(m.bound_variables().is_empty());
    assert_eq!(m.wildcard_path_segments(), &["b", "c"]);

    let named = UriTemplate::new("a/{*rest}").unwrap();
    let m = named.match_uri(&base, &candidate).unwrap();
    assert_eq!(bound(&m), vec![("REST", "b/c")]);

    let root = UriTemplate::new("*").unwrap();
    assert!(root.match_uri(&base, &url("http://example.com/")).is_some());
    assert!(root.match_uri(&base, &url("http://example.com/x/y/")).is_some());
}

#[test]
fn template_compound_captures() {
    let base = url("http://example.com/");
    let t = UriTemplate::new("food{x}ar").unwrap();
    let m = t.match_uri(&base, &url("http://example.com/foodzar")).unwrap();
    assert_eq!(m.get("x"), Some("z"));

    let t = UriTemplate::new("foo{x}bar").unwrap();
    assert!(t.match_uri(&base, &url("http://example.com/foodzar")).is_none());
    assert!(t.match_uri(&base, &url("http://example.com/foobar")).is_none());
}

#[test]
fn template_equivalence_ignores_defaults() {
    let plain = UriTemplate::new("{x}").unwrap();
    let defaulted = UriTemplate::new("{x=foo}").unwrap();
    assert!(plain.is_equivalent_to(&defaulted));
    assert!(defaulted.is_equivalent_to(&plain));
    assert!(plain.is_equivalent_to(&plain));

    let mut groups: HashMap<Equivalent<'_>, usize> = HashMap::new();
    let templates: Vec<UriTemplate> = ["a/{x}", "a/{y}", "A/{z=1}", "a/{x}/", "a/b"]
        .iter()
        .map(|t| t.parse().unwrap())
        .collect();
    for t in &templates {
        *groups.entry(Equivalent(t)).or_default() += 1;
    }
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[&Equivalent(&templates[0])], 3);
}

#[test]
fn template_construction_errors() {
    let cases: &[(&str, fn(&TemplateError) -> bool)] = &[
        ("a/{x", |e| matches!(e, TemplateError::InvalidFormat { .. })),
        ("a/*/b", |e| matches!(e, TemplateError::InvalidWildcard { .. })),
        ("a/{x}/{X}", |e| matches!(e, TemplateError::DuplicateVariable { .. })),
        ("a/{x}?x={X}", |e| matches!(e, TemplateError::DuplicateVariable { .. })),
        ("a/{x}{y}", |e| matches!(e, TemplateError::AdjacentVariables { .. })),
        ("a?x=1&", |e| matches!(e, TemplateError::QueryEndsWithAmpersand { .. })),
        ("a?x={y=1}", |e| matches!(e, TemplateError::QueryVariableDefault { .. })),
        ("a/b{x=1}", |e| matches!(e, TemplateError::CompoundVariableDefault { .. })),
        ("a/{x=1}/b", |e| matches!(e, TemplateError::DefaultNotTerminal { .. })),
        ("a/{x=1}/{*rest}", |e| matches!(e, TemplateError::DefaultWithWildcard { .. })),
    ];
    for (text, check) in cases {
        let err = UriTemplate::new(text).unwrap_err();
        assert!(check(&err), "{}: {}", text, err);
    }
}

#[test]
fn template_bind_errors() {
    let base = url("http://example.com/");
    let t = UriTemplate::new("a/{x}/{y}").unwrap();

    let err = t.bind_by_name(&base, [("y", "2")], false).unwrap_err();
    assert_eq!(err, BindError::EmptyPathValue { name: "X".into() });

    let err = t.bind_by_position(&base, &["1"]).unwrap_err();
    assert!(matches!(err, BindError::WrongPositionalCount { path: 2, query: 0, given: 1, .. }));
}

#[test]
fn template_extra_parameters() {
    let base = url("http://example.com/");
    let t = UriTemplate::new("a/{x}?op=get").unwrap();
    let uri = t
        .bind_by_name(&base, [("x", "1"), ("trace", "on")], false)
        .unwrap();
    assert_eq!(uri.as_str(), "http://example.com/a/1?op=get&trace=on");

    let m = t.match_uri(&base, &uri).unwrap();
    assert_eq!(
        m.query_parameters().collect::<Vec<_>>(),
        vec![("op", "get"), ("trace", "on")]
    );
}
