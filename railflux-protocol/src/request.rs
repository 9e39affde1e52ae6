use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A snapshot of the request that was being served when an exception occurred.
///
/// Only some of the fields are ever used as dimensions of a reported exception. Parameters,
/// session data and user information are kept for the host's own use and never leave the
/// process through railflux.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestEnv {
    /// The HTTP method, e.g. `GET`.
    pub method: Option<String>,
    /// The full request URL or path, including the query string.
    pub url: Option<String>,
    /// The `User-Agent` header.
    pub user_agent: Option<String>,
    /// The `Referer` header.
    pub referer: Option<String>,
    /// The client IP address.
    pub remote_ip: Option<String>,
    /// The controller handling the request.
    pub controller: Option<String>,
    /// The action handling the request.
    pub action: Option<String>,
    /// Request parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Session data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Value>,
    /// The authenticated user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<Value>,
    /// Further host-specific request metadata.
    ///
    /// Only keys declared in the configured dimension allow-list are reported.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl RequestEnv {
    /// Returns `true` if no request data is present at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the path of the request URL, without scheme, host, query string and fragment.
    ///
    /// # Example
    ///
    /// ```
    /// use railflux_protocol::RequestEnv;
    ///
    /// let env = RequestEnv {
    ///     url: Some("https://example.org/posts/1?page=2#top".to_owned()),
    ///     ..RequestEnv::default()
    /// };
    ///
    /// assert_eq!(env.path(), Some("/posts/1"));
    /// ```
    pub fn path(&self) -> Option<&str> {
        let url = self.url.as_deref()?;

        let path = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map_or("/", |index| &rest[index..])
            }
            None => url,
        };

        let end = path.find(['?', '#']).unwrap_or(path.len());
        Some(&path[..end]).filter(|path| !path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_url(url: &str) -> RequestEnv {
        RequestEnv {
            url: Some(url.to_owned()),
            ..RequestEnv::default()
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(RequestEnv::default().is_empty());
        assert!(!env_with_url("/").is_empty());
    }

    #[test]
    fn test_path_variants() {
        assert_eq!(env_with_url("/posts?page=1").path(), Some("/posts"));
        assert_eq!(env_with_url("http://localhost:3000").path(), Some("/"));
        assert_eq!(env_with_url("?query").path(), None);
        assert_eq!(RequestEnv::default().path(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let env: RequestEnv = serde_json::from_str(
            r#"{"method":"POST","user_agent":"Mozilla/5.0","params":{"password":"secret"}}"#,
        )
        .unwrap();

        assert_eq!(env.method.as_deref(), Some("POST"));
        assert!(env.params.is_some());
        assert!(env.extra.is_empty());
    }
}
