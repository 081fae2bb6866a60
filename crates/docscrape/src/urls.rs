//! URL normalization and allow-list scoping

use crate::error::ConfigError;
use url::Url;

/// Parse a URL and strip its fragment
///
/// Returns `None` for unparseable URLs and for schemes other than
/// http/https. Two URLs are the same crawl target iff their normalized
/// strings are equal.
pub fn normalize_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// One `host[:port][/path-prefix]` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowRule {
    host: String,
    port: Option<u16>,
    path_prefix: Option<String>,
}

impl AllowRule {
    /// Parse a rule such as `docs.example.com/guide`
    ///
    /// A leading `http://` or `https://` is tolerated and ignored.
    pub fn parse(rule: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidAllowRule(rule.to_string());

        let trimmed = rule.trim();
        let trimmed = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);

        let (authority, path) = match trimmed.split_once('/') {
            Some((authority, path)) => (authority, Some(path.trim_end_matches('/'))),
            None => (trimmed, None),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port.parse::<u16>().map_err(|_| invalid())?)),
            None => (authority, None),
        };

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let path_prefix = path.filter(|p| !p.is_empty()).map(|p| format!("/{}", p));

        Ok(Self {
            host: host.to_lowercase(),
            port,
            path_prefix,
        })
    }

    /// Check whether the URL falls under this rule
    ///
    /// A rule without a port matches the host on any port; a rule with a
    /// port matches only that port.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !host.eq_ignore_ascii_case(&self.host) {
            return false;
        }
        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }
        match &self.path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

/// Immutable set of allow rules for one crawl run
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    rules: Vec<AllowRule>,
}

impl AllowList {
    /// Build from `host[/path-prefix]` strings
    pub fn parse<I, S>(rules: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|r| AllowRule::parse(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        Ok(Self { rules })
    }

    /// A URL is admissible iff some rule matches it
    pub fn allows(&self, url: &Url) -> bool {
        self.rules.iter().any(|rule| rule.matches(url))
    }

    pub fn rules(&self) -> &[AllowRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_strips_fragment() {
        let u = normalize_url("https://example.com/a#section").unwrap();
        assert_eq!(u.as_str(), "https://example.com/a");
        assert!(u.fragment().is_none());
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(normalize_url("mailto:someone@example.com").is_none());
        assert!(normalize_url("ftp://example.com/file").is_none());
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn test_normalized_equality() {
        let a = normalize_url("https://example.com/a#one").unwrap();
        let b = normalize_url("https://example.com/a#two").unwrap();
        assert_eq!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_host_rule() {
        let list = AllowList::parse(["example.com"]).unwrap();
        assert!(list.allows(&url("https://example.com/a")));
        assert!(list.allows(&url("http://EXAMPLE.com/deep/path")));
        assert!(!list.allows(&url("https://other.com/c")));
        assert!(!list.allows(&url("https://sub.example.com/")));
    }

    #[test]
    fn test_path_prefix_rule() {
        let list = AllowList::parse(["example.com/docs"]).unwrap();
        assert!(list.allows(&url("https://example.com/docs")));
        assert!(list.allows(&url("https://example.com/docs/intro")));
        assert!(!list.allows(&url("https://example.com/blog")));
    }

    #[test]
    fn test_port_rule() {
        let list = AllowList::parse(["127.0.0.1:8080"]).unwrap();
        assert!(list.allows(&url("http://127.0.0.1:8080/")));
        assert!(!list.allows(&url("http://127.0.0.1:9090/")));

        let any_port = AllowList::parse(["localhost"]).unwrap();
        assert!(any_port.allows(&url("http://localhost:9090/x")));
    }

    #[test]
    fn test_rule_tolerates_scheme() {
        let rule = AllowRule::parse("https://example.com/guide/").unwrap();
        assert!(rule.matches(&url("https://example.com/guide/start")));
    }

    #[test]
    fn test_empty_and_invalid_rules() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            AllowList::parse(empty),
            Err(ConfigError::EmptyAllowList)
        ));
        assert!(matches!(
            AllowList::parse([""]),
            Err(ConfigError::InvalidAllowRule(_))
        ));
        assert!(matches!(
            AllowList::parse(["example.com:notaport"]),
            Err(ConfigError::InvalidAllowRule(_))
        ));
    }
}
