#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    /// Matches the rest of the path, slashes included.
    Splat,
}

/// Route pattern in hash-route syntax: `sprint/:id`, `files/*path`, or ``
/// for the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_matches('/')
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim_start_matches('#').trim_matches('/');
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with(':') {
                    Segment::Param
                } else if s.starts_with('*') {
                    Segment::Splat
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Returns the decoded parameter values when `path` matches.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let path = normalize(path.trim_start_matches('#'));
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut args = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Splat => {
                    args.push(decode(&parts.get(i..)?.join("/")));
                    return Some(args);
                }
                Segment::Param => args.push(decode(parts.get(i)?)),
                Segment::Literal(lit) => {
                    if parts.get(i) != Some(&lit.as_str()) {
                        return None;
                    }
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(args)
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_pattern_matches_empty_hash_only() {
        let root = RoutePattern::parse("");
        assert_eq!(root.matches(""), Some(vec![]));
        assert_eq!(root.matches("#"), Some(vec![]));
        assert_eq!(root.matches("/"), Some(vec![]));
        assert!(root.matches("sprint/1").is_none());
    }

    #[test]
    fn test_param_pattern_extracts_and_decodes() {
        let p = RoutePattern::parse("sprint/:id");
        assert_eq!(p.matches("sprint/12"), Some(vec!["12".to_string()]));
        assert_eq!(p.matches("#sprint/12/"), Some(vec!["12".to_string()]));
        assert_eq!(p.matches("sprint/a%20b"), Some(vec!["a b".to_string()]));
        assert!(p.matches("sprint").is_none());
        assert!(p.matches("sprint/1/tasks").is_none());
        assert!(p.matches("task/1").is_none());
    }

    #[test]
    fn test_query_string_is_ignored() {
        let p = RoutePattern::parse("sprint/:id");
        assert_eq!(p.matches("sprint/3?tab=tasks"), Some(vec!["3".to_string()]));
    }

    #[test]
    fn test_splat_takes_remaining_path() {
        let p = RoutePattern::parse("docs/*path");
        assert_eq!(p.matches("docs/a/b/c"), Some(vec!["a/b/c".to_string()]));
        assert_eq!(p.matches("docs"), Some(vec!["".to_string()]));
    }
}
