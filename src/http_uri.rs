use crate::table::{MatchError, UriTemplateTable};
use crate::template::UriTemplateMatch;

use http::Uri;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpUriError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("invalid uri {uri:?}")]
    Parse {
        uri: String,
        source: url::ParseError,
    },
}

impl<T> UriTemplateTable<T> {
    /// Matches an `http::Uri`.
    ///
    /// An origin-form uri such as `/orders/1?x=2`, as found in a request line,
    /// is resolved against the base address first.
    pub fn match_http_uri<'a>(
        &'a self,
        uri: &Uri,
    ) -> Result<Vec<(&'a T, UriTemplateMatch<'a>)>, HttpUriError> {
        let url = self.resolve(uri)?;
        Ok(self.match_uri(&url)?)
    }

    pub fn match_single_http_uri<'a>(
        &'a self,
        uri: &Uri,
    ) -> Result<Option<(&'a T, UriTemplateMatch<'a>)>, HttpUriError> {
        let url = self.resolve(uri)?;
        Ok(self.match_single(&url)?)
    }

    fn resolve(&self, uri: &Uri) -> Result<Url, HttpUriError> {
        let parse_error = |source| HttpUriError::Parse {
            uri: uri.to_string(),
            source,
        };
        if uri.scheme().is_some() {
            return Url::parse(&uri.to_string()).map_err(parse_error);
        }
        if !self.is_read_only() {
            return Err(MatchError::NotReadOnly.into());
        }
        let base = self.base_address().ok_or(MatchError::NotReadOnly)?;
        let path_and_query = uri.path_and_query().map_or("/", |p| p.as_str());
        base.join(path_and_query).map_err(parse_error)
    }
}
