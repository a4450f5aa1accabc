use crate::error::GatewayError;

/// Trim the path separators a prefix may be written with.
pub(crate) fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

/// The `(service, method)` pair addressed by a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPath<'a> {
    pub service: &'a str,
    pub method: &'a str,
}

impl<'a> RequestPath<'a> {
    /// Parse `path` after stripping the first of `prefixes` that matches its
    /// leading segments.
    ///
    /// Prefixes must already be normalized; callers pass them longest first.
    ///
    /// # Example
    /// ```
    /// use lambda_grpc::RequestPath;
    ///
    /// let prefixes = vec!["api".to_string()];
    /// let path = RequestPath::parse("/api/pkg.Greeter/SayHello", &prefixes).unwrap();
    /// assert_eq!(path.service, "pkg.Greeter");
    /// assert_eq!(path.method, "SayHello");
    /// ```
    pub fn parse(path: &'a str, prefixes: &[String]) -> Result<Self, GatewayError> {
        let trimmed = path.trim_matches('/');
        let rest = prefixes
            .iter()
            .find_map(|prefix| strip_segments(trimmed, prefix))
            .unwrap_or(trimmed);

        let mut segments = rest.split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(service), Some(method), None) if !service.is_empty() && !method.is_empty() => {
                Ok(Self { service, method })
            }
            _ => Err(GatewayError::MalformedPath(path.to_string())),
        }
    }

    /// `package.Service/Method`.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.service, self.method)
    }
}

/// Strip `prefix` from `path` only when it covers whole segments.
fn strip_segments<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(rest);
    }

    rest.strip_prefix('/').map(|rest| rest.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(values: &[&str]) -> Vec<String> {
        values.iter().map(|p| normalize_prefix(p).to_string()).collect()
    }

    #[test]
    fn test_parse_without_prefix() {
        let path = RequestPath::parse("/pkg.Greeter/SayHello", &[]).unwrap();
        assert_eq!(path.service, "pkg.Greeter");
        assert_eq!(path.method, "SayHello");
        assert_eq!(path.full_path(), "pkg.Greeter/SayHello");
    }

    #[test]
    fn test_parse_trims_separators() {
        let path = RequestPath::parse("pkg.Greeter/SayHello/", &[]).unwrap();
        assert_eq!(path.full_path(), "pkg.Greeter/SayHello");
    }

    #[test]
    fn test_parse_strips_multi_segment_prefix() {
        let path = RequestPath::parse("/v1/grpc/pkg.Greeter/SayHello", &prefixes(&["/v1/grpc/"]))
            .unwrap();
        assert_eq!(path.full_path(), "pkg.Greeter/SayHello");
    }

    #[test]
    fn test_prefix_must_match_whole_segment() {
        let result = RequestPath::parse("/apiv2/pkg.Greeter/SayHello", &prefixes(&["api"]));
        assert!(matches!(result, Err(GatewayError::MalformedPath(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        for path in ["/", "/pkg.Greeter", "/a/b/c", "/pkg.Greeter//SayHello", "/api"] {
            let result = RequestPath::parse(path, &prefixes(&["api"]));
            assert!(
                matches!(result, Err(GatewayError::MalformedPath(_))),
                "expected malformed path for {path}"
            );
        }
    }
}
