use crate::template::TemplateError;

/// A table that can not be configured or frozen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("the table is read-only")]
    ReadOnly,

    #[error("the table has no base address")]
    MissingBaseAddress,

    #[error("base address {0:?} can not be used as a base")]
    BadBaseAddress(String),

    #[error("the table has no templates")]
    Empty,

    #[error("templates {0:?} are equivalent and have no query to tell them apart")]
    Duplicate(Vec<String>),

    #[error("templates {0:?} have the same literal query values")]
    AmbiguousQueries(Vec<String>),

    #[error("templates {0:?} share a path but no query key has a literal value in all of them")]
    OtherAmbiguousQueries(Vec<String>),

    #[error("compound segments of templates {0:?} have the same precedence")]
    AmbiguousCompound(Vec<String>),
}

/// A failure while matching against a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("the table must be made read-only before matching")]
    NotReadOnly,

    #[error("{count} templates matched the uri")]
    Ambiguous { count: usize },
}
