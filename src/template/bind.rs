use super::error::BindError;
use super::query::{append_pair, QueryValue};
use super::UriTemplate;
use crate::escape::escape_path;
use crate::strmap::eq_folded;
use crate::wire::base_path;

use url::Url;

impl UriTemplate {
    /// Builds a URI below `base` from named values.
    ///
    /// Names are matched ignoring case. Names that are not template variables
    /// are appended to the query. With `omit_defaults`, trailing path values
    /// equal to their defaults are left out. A value that would form a `.` or
    /// `..` path segment is rejected.
    pub fn bind_by_name<K, V>(
        &self,
        base: &Url,
        params: impl IntoIterator<Item = (K, V)>,
        omit_defaults: bool,
    ) -> Result<Url, BindError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut path_values = vec![None; self.variables.path().len()];
        let mut query_values = vec![None; self.variables.query().len()];
        let mut extras: Vec<(String, String)> = Vec::new();

        for (name, value) in params {
            let (name, value) = (name.as_ref(), value.as_ref());
            if name.is_empty() {
                return Err(BindError::EmptyName);
            }
            if let Some(i) = self.variables.path_index(name) {
                path_values[i] = Some(value.to_owned());
            } else if let Some(i) = self.variables.query_index(name) {
                query_values[i] = Some(value.to_owned());
            } else if self.queries.iter().any(|(key, _)| eq_folded(key, name)) {
                return Err(BindError::LiteralQueryKey {
                    key: name.to_owned(),
                });
            } else {
                extras.push((name.to_owned(), value.to_owned()));
            }
        }

        self.bind(base, path_values, query_values, extras, omit_defaults)
    }

    /// Builds a URI below `base` from values in declaration order.
    ///
    /// Every path variable needs a value; trailing query values may be left
    /// out, which omits their pairs.
    pub fn bind_by_position<S: AsRef<str>>(
        &self,
        base: &Url,
        values: &[S],
    ) -> Result<Url, BindError> {
        let path = self.variables.path().len();
        let query = self.variables.query().len();
        if self.variables.is_empty() && !values.is_empty() {
            return Err(BindError::NoVariables {
                template: self.original.clone(),
                given: values.len(),
            });
        }
        if values.len() < path || values.len() > path + query {
            return Err(BindError::WrongPositionalCount {
                template: self.original.clone(),
                path,
                query,
                given: values.len(),
            });
        }

        let owned = |v: &S| Some(v.as_ref().to_owned());
        let path_values = values[..path].iter().map(owned).collect();
        let mut query_values: Vec<Option<String>> = values[path..].iter().map(owned).collect();
        query_values.resize(query, None);

        self.bind(base, path_values, query_values, Vec::new(), false)
    }

    fn bind(
        &self,
        base: &Url,
        path_values: Vec<Option<String>>,
        query_values: Vec<Option<String>>,
        mut extras: Vec<(String, String)>,
        omit_defaults: bool,
    ) -> Result<Url, BindError> {
        if base.cannot_be_a_base() {
            return Err(BindError::BadBaseAddress(base.to_string()));
        }
        let prepared = self.variables.prepare_path(path_values, omit_defaults)?;

        let mut path = String::new();
        let mut values = prepared.values.iter().map(String::as_str);
        if prepared.to_bind < prepared.values.len() {
            let mut bound = 0;
            for segment in &self.segments {
                if bound >= prepared.to_bind && !segment.is_literal() {
                    break;
                }
                bound += segment.bind(&mut values, &mut path);
            }
        } else {
            for segment in &self.segments {
                segment.bind(&mut values, &mut path);
            }
            if self.wildcard.as_ref().map_or(false, |w| w.name.is_some()) {
                if let Some(rest) = values.next() {
                    path.push_str(&escape_path(rest));
                }
            }
        }
        if self.ignore_trailing_slash && path.ends_with('/') {
            path.pop();
        }
        // `Url` would resolve these away
        if let Some(dots) = path.split('/').find(|s| *s == "." || *s == "..") {
            return Err(BindError::DotSegment {
                template: self.original.clone(),
                segment: dots.to_owned(),
            });
        }

        let mut query = String::new();
        for (key, value) in &self.queries {
            let supplied = match value {
                QueryValue::Variable(name) => self
                    .variables
                    .query_index(name)
                    .and_then(|i| query_values.get(i))
                    .and_then(Option::as_deref),
                _ => None,
            };
            value.bind(key, supplied, &mut query);
        }

        for (name, default) in self.variables.extra_defaults() {
            match extras.iter().position(|(k, _)| eq_folded(k, name)) {
                Some(i) if omit_defaults && extras[i].1 == *default => {
                    extras.remove(i);
                }
                Some(_) => {}
                None if !omit_defaults => extras.push((name.clone(), default.clone())),
                None => {}
            }
        }
        for (key, value) in &extras {
            append_pair(&mut query, key, Some(value));
        }

        let mut uri = base.clone();
        uri.set_path(&format!("{}{}", base_path(base), path));
        uri.set_query(Some(query.as_str()).filter(|q| !q.is_empty()));
        uri.set_fragment(self.fragment.as_deref().filter(|f| !f.is_empty()));
        Ok(uri)
    }
}
