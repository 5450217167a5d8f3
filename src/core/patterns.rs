//! Glob-like match and replace for rewriting package names to remote
//! repository locations.
//!
//! Patterns split on `/` and `:` and recognize `*` for a single component
//! and `...` for any remaining suffix. The first matching rule wins.

/// An ordered list of pattern replacements.
#[derive(Debug, Clone, Default)]
pub struct Patterns(Vec<Pattern>);

/// A directive to replace matched components, carrying wildcard components
/// over into the replacement in order.
#[derive(Debug, Clone)]
pub struct Pattern {
    match_parts: Vec<String>,
    replace_parts: Vec<String>,
}

impl Pattern {
    pub fn new(matcher: &str, replacement: &str) -> Self {
        Pattern {
            match_parts: pattern_split(matcher),
            replace_parts: pattern_split(replacement),
        }
    }

    fn replace(&self, parts: &[String]) -> Option<(String, String)> {
        if parts.len() < self.match_parts.len() {
            return None;
        }
        let mut matched = Vec::new();
        let mut wild = Vec::new();
        for (i, part) in self.match_parts.iter().enumerate() {
            match part.as_str() {
                "*" => {
                    matched.push(parts[i].clone());
                    wild.push(parts[i].clone());
                }
                "..." => {
                    matched.extend(parts[i..].iter().cloned());
                    wild.extend(parts[i..].iter().cloned());
                    break;
                }
                _ if *part != parts[i] => return None,
                _ => matched.push(part.clone()),
            }
        }
        let mut replaced = Vec::new();
        let mut wild = wild.into_iter();
        for part in &self.replace_parts {
            match part.as_str() {
                "*" => replaced.push(wild.next()?),
                "..." => replaced.extend(&mut wild),
                _ => replaced.push(part.clone()),
            }
        }
        Some((matched.concat(), replaced.concat()))
    }
}

impl Patterns {
    pub fn new(rules: Vec<Pattern>) -> Self {
        Patterns(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply the first matching rule to the string, returning the matched
    /// prefix, its replacement, and the index of the applied rule.
    /// Everything after the matched prefix is preserved by the caller.
    pub fn replace(&self, s: &str) -> Option<(String, String, usize)> {
        let parts = pattern_split(s);
        self.0.iter().enumerate().find_map(|(index, pattern)| {
            pattern
                .replace(&parts)
                .map(|(matched, replaced)| (matched, replaced, index))
        })
    }
}

/// Divide a string into `/`, `:`, `*`, and `...` delimited components,
/// keeping a component for each delimiter.
pub fn pattern_split(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut part = String::new();
    let flush = |part: &mut String, parts: &mut Vec<String>| {
        if !part.is_empty() {
            parts.push(std::mem::take(part));
        }
    };
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        if c == '*' {
            flush(&mut part, &mut parts);
            parts.push("*".to_string());
            rest = &rest[1..];
        } else if let Some(tail) = rest.strip_prefix("...") {
            flush(&mut part, &mut parts);
            parts.push("...".to_string());
            rest = tail;
        } else if c == '/' || c == ':' {
            flush(&mut part, &mut parts);
            parts.push(c.to_string());
            rest = &rest[c.len_utf8()..];
        } else {
            part.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    flush(&mut part, &mut parts);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(
            pattern_split("example.com/x/y"),
            ["example.com", "/", "x", "/", "y"]
        );
        assert_eq!(
            pattern_split("git@host:path/*"),
            ["git@host", ":", "path", "/", "*"]
        );
        assert_eq!(pattern_split("a/..."), ["a", "/", "..."]);
        assert_eq!(pattern_split(""), [""; 0]);
    }

    #[test]
    fn test_literal_match() {
        let patterns = Patterns::new(vec![Pattern::new("a/b", "c/d")]);
        let (matched, replaced, rule) = patterns.replace("a/b").unwrap();
        assert_eq!(matched, "a/b");
        assert_eq!(replaced, "c/d");
        assert_eq!(rule, 0);
        assert!(patterns.replace("a/c").is_none());
    }

    #[test]
    fn test_star_carries_component() {
        let patterns = Patterns::new(vec![Pattern::new(
            "example.com/*",
            "git@mirror.example.com:*",
        )]);
        let (matched, replaced, _) = patterns.replace("example.com/avery").unwrap();
        assert_eq!(matched, "example.com/avery");
        assert_eq!(replaced, "git@mirror.example.com:avery");
    }

    #[test]
    fn test_ellipsis_carries_suffix() {
        let patterns = Patterns::new(vec![Pattern::new("example.com/...", "git@host:...")]);
        let (matched, replaced, _) = patterns.replace("example.com/a/b/c").unwrap();
        assert_eq!(matched, "example.com/a/b/c");
        assert_eq!(replaced, "git@host:a/b/c");
    }

    #[test]
    fn test_prefix_match_preserves_tail() {
        // The matcher consumes only its own components; the caller keeps
        // the unmatched tail.
        let patterns = Patterns::new(vec![Pattern::new("example.com/*", "git@host:*")]);
        let (matched, replaced, _) = patterns.replace("example.com/avery/sub").unwrap();
        assert_eq!(matched, "example.com/avery");
        assert_eq!(replaced, "git@host:avery");
    }

    #[test]
    fn test_first_rule_wins() {
        let patterns = Patterns::new(vec![
            Pattern::new("example.com/...", "first:..."),
            Pattern::new("example.com/*", "second:*"),
        ]);
        let (_, replaced, rule) = patterns.replace("example.com/x").unwrap();
        assert_eq!(replaced, "first:x");
        assert_eq!(rule, 0);
    }

    #[test]
    fn test_round_trip() {
        let forward = Patterns::new(vec![Pattern::new("example.com/...", "git@host:...")]);
        let backward = Patterns::new(vec![Pattern::new("git@host:...", "example.com/...")]);
        let original = "example.com/a/b";
        let (_, replaced, _) = forward.replace(original).unwrap();
        let (_, restored, _) = backward.replace(&replaced).unwrap();
        assert_eq!(restored, original);
    }
}
