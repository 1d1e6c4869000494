/// A template that can not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template {template:?}: malformed segment or query part {part:?}")]
    InvalidFormat { template: String, part: String },

    #[error("template {template:?}: '*' may only appear as the final path segment, as \"*\" or \"{{*name}}\"")]
    InvalidWildcard { template: String },

    #[error("template {template:?}: invalid variable declaration {declaration:?}")]
    InvalidVariable {
        template: String,
        declaration: String,
    },

    #[error("template {template:?}: variable {name:?} is declared more than once")]
    DuplicateVariable { template: String, name: String },

    #[error("template {template:?}: compound segment {segment:?} has adjacent variables")]
    AdjacentVariables { template: String, segment: String },

    #[error("template {template:?}: query can not end with '&'")]
    QueryEndsWithAmpersand { template: String },

    #[error("template {template:?}: query part has an empty name")]
    EmptyQueryName { template: String },

    #[error("template {template:?}: query names must be literals")]
    QueryNameNotLiteral { template: String },

    #[error("template {template:?}: query name {name:?} appears more than once")]
    DuplicateQueryName { template: String, name: String },

    #[error("template {template:?}: query value {value:?} can not be compound")]
    CompoundQueryValue { template: String, value: String },

    #[error("template {template:?}: query variable {name:?} can not have a default value")]
    QueryVariableDefault { template: String, name: String },

    #[error("template {template:?}: variable {name:?} in a compound segment can not have a default value")]
    CompoundVariableDefault { template: String, name: String },

    #[error("template {template:?}: wildcard variable {name:?} can not have a default value")]
    WildcardVariableDefault { template: String, name: String },

    #[error("template {template:?}: default value of variable {name:?} is empty")]
    EmptyDefault { template: String, name: String },

    #[error("template {template:?}: nullable default of {name:?} must be followed only by nullable defaults, but {next:?} is not")]
    NullableDefaultNotTerminal {
        template: String,
        name: String,
        next: String,
    },

    #[error("template {template:?}: default value of {name:?} is only allowed on the trailing run of variable segments")]
    DefaultNotTerminal { template: String, name: String },

    #[error("template {template:?}: variable {name:?} has a default value but the template ends with a wildcard")]
    DefaultWithWildcard { template: String, name: String },

    #[error("template {template:?}: invalid additional default {name:?}")]
    InvalidAdditionalDefault { template: String, name: String },
}

/// A failure to bind values into a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("base address {0:?} can not be used as a base")]
    BadBaseAddress(String),

    #[error("template {template:?} has {path} path and {query} query variables, but {given} values were supplied")]
    WrongPositionalCount {
        template: String,
        path: usize,
        query: usize,
        given: usize,
    },

    #[error("template {template:?} has no variables, but {given} values were supplied")]
    NoVariables { template: String, given: usize },

    #[error("bind parameter names can not be empty")]
    EmptyName,

    #[error("path variable {name:?} can not be bound to an empty value")]
    EmptyPathValue { name: String },

    #[error("parameter {key:?} collides with a literal query key of the template")]
    LiteralQueryKey { key: String },

    #[error("template {template:?} would bind the dot segment {segment:?}")]
    DotSegment { template: String, segment: String },
}
