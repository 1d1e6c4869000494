use super::classify::is_null_marker;
use super::error::{BindError, TemplateError};
use super::segment::PathSegment;
use crate::escape::unescape;
use crate::strmap::{eq_folded, fold};

use std::cmp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VariableKind {
    /// A whole path segment, by segment index.
    Segment(usize),
    /// Part of a compound segment, by segment index.
    Compound(usize),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DefaultValue {
    Value(String),
    /// `null`: the variable may be left out entirely.
    Nullable,
}

#[derive(Debug, Clone)]
pub(crate) struct PathVariable {
    pub(crate) name: String,
    pub(crate) kind: VariableKind,
    pub(crate) default: Option<DefaultValue>,
}

/// The variable registry of one template.
///
/// Names are stored upper-cased and must be unique across the path and the
/// query.
#[derive(Debug, Clone, Default)]
pub(crate) struct Variables {
    path: Vec<PathVariable>,
    query: Vec<String>,
    extra_defaults: Vec<(String, String)>,
    first_nullable: usize,
}

/// Path values ready for binding, in declaration order.
#[derive(Debug)]
pub(crate) struct PreparedPath {
    pub(crate) values: Vec<String>,
    /// How many leading variables must appear in the bound path.
    pub(crate) to_bind: usize,
}

fn parse_default(template: &str, name: &str, raw: &str) -> Result<DefaultValue, TemplateError> {
    if raw.is_empty() {
        return Err(TemplateError::EmptyDefault {
            template: template.to_owned(),
            name: name.to_owned(),
        });
    }
    if is_null_marker(raw) {
        Ok(DefaultValue::Nullable)
    } else {
        Ok(DefaultValue::Value(unescape(raw)))
    }
}

impl Variables {
    pub(crate) fn path(&self) -> &[PathVariable] {
        &self.path
    }

    pub(crate) fn query(&self) -> &[String] {
        &self.query
    }

    pub(crate) fn extra_defaults(&self) -> &[(String, String)] {
        &self.extra_defaults
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty()
    }

    pub(crate) fn path_index(&self, name: &str) -> Option<usize> {
        self.path.iter().position(|v| eq_folded(&v.name, name))
    }

    pub(crate) fn query_index(&self, name: &str) -> Option<usize> {
        self.query.iter().position(|v| eq_folded(v, name))
    }

    fn check_unique(&self, template: &str, name: &str) -> Result<(), TemplateError> {
        if self.path_index(name).is_some() || self.query_index(name).is_some() {
            return Err(TemplateError::DuplicateVariable {
                template: template.to_owned(),
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    pub(crate) fn add_path(
        &mut self,
        template: &str,
        name: &str,
        kind: VariableKind,
        default: Option<&str>,
    ) -> Result<(), TemplateError> {
        self.check_unique(template, name)?;
        let default = match (default, kind) {
            (None, _) => None,
            (Some(_), VariableKind::Compound(_)) => {
                return Err(TemplateError::CompoundVariableDefault {
                    template: template.to_owned(),
                    name: name.to_owned(),
                })
            }
            (Some(_), VariableKind::Wildcard) => {
                return Err(TemplateError::WildcardVariableDefault {
                    template: template.to_owned(),
                    name: name.to_owned(),
                })
            }
            (Some(raw), VariableKind::Segment(_)) => Some(parse_default(template, name, raw)?),
        };
        self.path.push(PathVariable {
            name: fold(name),
            kind,
            default,
        });
        Ok(())
    }

    pub(crate) fn add_query(
        &mut self,
        template: &str,
        name: &str,
        default: Option<&str>,
    ) -> Result<(), TemplateError> {
        self.check_unique(template, name)?;
        if default.is_some() {
            return Err(TemplateError::QueryVariableDefault {
                template: template.to_owned(),
                name: name.to_owned(),
            });
        }
        self.query.push(fold(name));
        Ok(())
    }

    /// Applies a caller-supplied default.
    ///
    /// A path variable gets it as its default (empty or `null` is nullable);
    /// any other name becomes an extra default.
    pub(crate) fn add_additional_default(
        &mut self,
        template: &str,
        name: &str,
        value: &str,
    ) -> Result<(), TemplateError> {
        let invalid = || TemplateError::InvalidAdditionalDefault {
            template: template.to_owned(),
            name: name.to_owned(),
        };
        if name.is_empty() {
            return Err(invalid());
        }
        if self.query_index(name).is_some() {
            return Err(TemplateError::QueryVariableDefault {
                template: template.to_owned(),
                name: name.to_owned(),
            });
        }
        if let Some(i) = self.path_index(name) {
            let var = &mut self.path[i];
            match var.kind {
                VariableKind::Compound(_) => {
                    return Err(TemplateError::CompoundVariableDefault {
                        template: template.to_owned(),
                        name: name.to_owned(),
                    })
                }
                VariableKind::Wildcard => {
                    return Err(TemplateError::WildcardVariableDefault {
                        template: template.to_owned(),
                        name: name.to_owned(),
                    })
                }
                VariableKind::Segment(_) if var.default.is_some() => return Err(invalid()),
                VariableKind::Segment(_) => {}
            }
            var.default = Some(if value.is_empty() || is_null_marker(value) {
                DefaultValue::Nullable
            } else {
                DefaultValue::Value(unescape(value))
            });
            return Ok(());
        }
        if is_null_marker(value) || self.extra_defaults.iter().any(|(k, _)| eq_folded(k, name)) {
            return Err(invalid());
        }
        self.extra_defaults.push((name.to_owned(), value.to_owned()));
        Ok(())
    }

    /// Checks that defaults sit only on the trailing run of variable segments
    /// and returns the first segment that may be omitted.
    pub(crate) fn validate_defaults(
        &mut self,
        template: &str,
        segments: &[PathSegment],
        has_wildcard: bool,
    ) -> Result<usize, TemplateError> {
        let is_nullable = |v: &PathVariable| v.default == Some(DefaultValue::Nullable);

        if has_wildcard {
            if let Some(v) = self.path.iter().find(|v| v.default.is_some()) {
                return Err(TemplateError::DefaultWithWildcard {
                    template: template.to_owned(),
                    name: v.name.clone(),
                });
            }
            self.first_nullable = self.path.len();
            return Ok(segments.len());
        }

        let trailing = self.path.iter().rev().take_while(|v| is_nullable(v)).count();
        let first_nullable = self.path.len() - trailing;
        for (i, v) in self.path[..first_nullable].iter().enumerate() {
            if is_nullable(v) {
                let next = self.path[i + 1..]
                    .iter()
                    .find(|v| !is_nullable(v))
                    .map(|v| v.name.clone())
                    .unwrap_or_default();
                return Err(TemplateError::NullableDefaultNotTerminal {
                    template: template.to_owned(),
                    name: v.name.clone(),
                    next,
                });
            }
        }

        let mut first_optional = segments.len();
        while let Some(PathSegment::Variable(seg)) = first_optional
            .checked_sub(1)
            .and_then(|i| segments.get(i))
        {
            match self.path_index(seg.name()) {
                Some(i) if self.path[i].default.is_some() => first_optional -= 1,
                _ => break,
            }
        }

        for v in &self.path {
            if v.default.is_none() {
                continue;
            }
            match v.kind {
                VariableKind::Segment(i) if i >= first_optional => {}
                _ => {
                    return Err(TemplateError::DefaultNotTerminal {
                        template: template.to_owned(),
                        name: v.name.clone(),
                    })
                }
            }
        }

        self.first_nullable = first_nullable;
        Ok(first_optional)
    }

    /// Fills defaults into `values` and decides how much of the path to bind.
    ///
    /// With `omit_defaults`, trailing values equal to their defaults are left
    /// out. Required variables must be non-empty, except the wildcard.
    pub(crate) fn prepare_path(
        &self,
        mut values: Vec<Option<String>>,
        omit_defaults: bool,
    ) -> Result<PreparedPath, BindError> {
        debug_assert_eq!(values.len(), self.path.len());

        for (v, slot) in self.path.iter().zip(values.iter_mut()) {
            if slot.as_deref().map_or(true, str::is_empty) {
                match &v.default {
                    Some(DefaultValue::Value(d)) => *slot = Some(d.clone()),
                    Some(DefaultValue::Nullable) => *slot = None,
                    None => {}
                }
            }
        }

        let mut count_non_default = self.path.len();
        while count_non_default > 0 {
            let i = count_non_default - 1;
            let is_default = match (&self.path[i].default, &values[i]) {
                (Some(DefaultValue::Value(d)), Some(s)) => d == s,
                (Some(DefaultValue::Nullable), None) => true,
                _ => false,
            };
            if !is_default {
                break;
            }
            count_non_default -= 1;
        }

        let count_non_nullable = cmp::max(self.first_nullable, count_non_default);
        for (v, value) in self.path.iter().zip(&values).take(count_non_nullable) {
            if v.kind == VariableKind::Wildcard {
                continue;
            }
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(BindError::EmptyPathValue {
                    name: v.name.clone(),
                });
            }
        }

        let to_bind = if omit_defaults {
            count_non_default
        } else {
            count_non_nullable
        };
        Ok(PreparedPath {
            values: values.into_iter().map(Option::unwrap_or_default).collect(),
            to_bind,
        })
    }
}
