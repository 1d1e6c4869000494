use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nuclear_uri_template::{UriTemplate, UriTemplateTable, Url};

const TEMPLATES: &[&str] = &[
    "",
    "users",
    "users/{id}",
    "users/{id}/posts/{post}",
    "users/me",
    "files/{name}.{ext}",
    "files/{*path}",
    "search?q={q}",
    "orders/{id}?op=cancel",
    "orders/{id}",
];

fn frozen_table() -> UriTemplateTable<usize> {
    let mut table = open_table();
    table.make_read_only(false).unwrap();
    table
}

fn open_table() -> UriTemplateTable<usize> {
    let base = Url::parse("http://localhost/api/").unwrap();
    let mut table = UriTemplateTable::with_base_address(base);
    for (i, t) in TEMPLATES.iter().enumerate() {
        table.insert(t, i);
    }
    table
}

fn template_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("template-parse");

    group.bench_function("compound", |b| {
        b.iter(|| UriTemplate::new("files/{name}.{ext}/v{major}-{minor}?q={q}"))
    });
}

fn template_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("template-match");

    group.bench_function("single-template", |b| {
        let base = Url::parse("http://localhost/api/").unwrap();
        let uri = Url::parse("http://localhost/api/users/42/posts/7").unwrap();
        let template = UriTemplate::new("users/{id}/posts/{post}").unwrap();
        b.iter_with_large_drop(|| template.match_uri(&base, &uri))
    });
}

fn table_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("table-match");

    let table = frozen_table();
    let cases = [
        ("fast-path", "http://localhost/api/users/me"),
        ("trie", "http://localhost/api/users/42/posts/7"),
        ("query", "http://localhost/api/orders/9?op=cancel"),
        ("retry", "http://localhost/api/users/42/"),
    ];
    for (name, uri) in cases {
        let uri = Url::parse(uri).unwrap();
        group.bench_function(name, |b| b.iter_with_large_drop(|| table.match_uri(&uri)));
    }
}

fn table_freeze(c: &mut Criterion) {
    let mut group = c.benchmark_group("table-freeze");

    group.bench_function("ten-templates", |b| {
        b.iter_batched_ref(
            open_table,
            |table: &mut UriTemplateTable<usize>| {
                table.make_read_only(false).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, template_parse, template_match, table_match, table_freeze);
criterion_main!(benches);
