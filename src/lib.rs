//! URI templates: matching and binding single templates, and matching many
//! of them at once through a table that is proven unambiguous when frozen.
//!
//! ```
//! use nuclear_uri_template::{UriTemplate, UriTemplateTable, Url};
//!
//! let base = Url::parse("http://localhost/api").unwrap();
//!
//! let t = UriTemplate::new("orders/{id}?expand={expand}").unwrap();
//! let m = t.match_uri(&base, &Url::parse("http://localhost/api/orders/7").unwrap()).unwrap();
//! assert_eq!(m.get("id"), Some("7"));
//!
//! let uri = t.bind_by_name(&base, [("id", "8"), ("expand", "lines")], false).unwrap();
//! assert_eq!(uri.as_str(), "http://localhost/api/orders/8?expand=lines");
//!
//! let mut table = UriTemplateTable::with_base_address(base);
//! table.insert("orders/{id}", 1).insert("orders/new", 2);
//! table.make_read_only(false).unwrap();
//!
//! let uri = Url::parse("http://localhost/api/orders/new").unwrap();
//! let (data, _) = table.match_single(&uri).unwrap().unwrap();
//! assert_eq!(*data, 2);
//! ```

#![deny(unsafe_code)]

mod escape;
mod strmap;
mod wire;

mod table;
mod template;

#[cfg(feature = "http-uri")]
mod http_uri;

pub use self::table::{MatchError, TableError, UriTemplateTable};
pub use self::template::{
    BindError, BoundVariables, CompoundSegment, Equivalent, LiteralSegment, PathSegment,
    QueryValue, TemplateError, UriTemplate, UriTemplateBuilder, UriTemplateMatch,
    VariableSegment,
};

#[cfg(feature = "http-uri")]
pub use self::http_uri::HttpUriError;

pub use url::Url;
