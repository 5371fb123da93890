//! URI templates
//!
//! RFC 6570 template expansion and matching for the string-valued subset the
//! request pipeline needs: simple (`{var}`), reserved (`{+var}`), fragment
//! (`{#var}`), label (`{.var}`), path (`{/var}`), query (`{?var}`) and query
//! continuation (`{&var}`) expressions, with prefix (`:n`) modifiers.
//!
//! Matching converts the template into an anchored regex whose variable
//! slots absorb any expansion, so a URL produced by `expand` always matches
//! the template it came from.

use crate::error::Error;
use regex::Regex;
use std::collections::HashMap;

const UNRESERVED: &str = "-._~";
const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_prefix(c: Option<char>) -> (Self, bool) {
        match c {
            Some('+') => (Self::Reserved, true),
            Some('#') => (Self::Fragment, true),
            Some('.') => (Self::Label, true),
            Some('/') => (Self::Path, true),
            Some('?') => (Self::Query, true),
            Some('&') => (Self::QueryContinuation, true),
            _ => (Self::Simple, false),
        }
    }

    fn first(&self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    fn named(&self) -> bool {
        matches!(self, Self::Query | Self::QueryContinuation)
    }

    fn allows_reserved(&self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }

    fn value_pattern(&self) -> &'static str {
        match self {
            Self::Simple => "[^/?#,]*",
            Self::Reserved => "[^?#]*",
            Self::Fragment => "[^,]*",
            Self::Label => "[^/?#.]*",
            Self::Path => "[^/?#]*",
            Self::Query | Self::QueryContinuation => "[^&#]*",
        }
    }
}

#[derive(Debug, Clone)]
struct VarSpec {
    name: String,
    prefix: Option<usize>,
}

#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Expression { operator: Operator, vars: Vec<VarSpec> },
}

/// A parsed RFC 6570 URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parse a template string.
    pub fn parse(template: &str) -> Result<Self, Error> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            let mut expr = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                expr.push(c);
            }
            if !closed || expr.is_empty() {
                return Err(Error::InvalidUrl(format!(
                    "malformed URI template expression in '{template}'"
                )));
            }
            let (operator, consumed) = Operator::from_prefix(expr.chars().next());
            let body = if consumed { &expr[1..] } else { expr.as_str() };
            let vars = body
                .split(',')
                .map(|spec| {
                    let spec = spec.trim_end_matches('*');
                    match spec.split_once(':') {
                        Some((name, len)) => {
                            let prefix = len.parse::<usize>().map_err(|_| {
                                Error::InvalidUrl(format!(
                                    "invalid prefix modifier in URI template '{template}'"
                                ))
                            })?;
                            Ok(VarSpec {
                                name: name.to_string(),
                                prefix: Some(prefix),
                            })
                        }
                        None => Ok(VarSpec {
                            name: spec.to_string(),
                            prefix: None,
                        }),
                    }
                })
                .collect::<Result<Vec<_>, Error>>()?;
            parts.push(Part::Expression { operator, vars });
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self {
            raw: template.to_string(),
            parts,
        })
    }

    /// The template source string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of all variables in the template, in order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Expression { vars, .. } => Some(vars.iter().map(|v| v.name.as_str())),
                Part::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Expand the template with string variables. Missing variables expand
    /// to nothing; for named (query) expressions the pair is omitted.
    pub fn expand(&self, vars: &HashMap<String, String>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Expression { operator, vars: specs } => {
                    let mut rendered = Vec::new();
                    for spec in specs {
                        let Some(value) = vars.get(&spec.name) else {
                            continue;
                        };
                        let value = match spec.prefix {
                            Some(n) => value.chars().take(n).collect::<String>(),
                            None => value.clone(),
                        };
                        let encoded = encode(&value, operator.allows_reserved());
                        if operator.named() {
                            rendered.push(format!("{}={encoded}", spec.name));
                        } else {
                            rendered.push(encoded);
                        }
                    }
                    if !rendered.is_empty() {
                        out.push_str(operator.first());
                        out.push_str(&rendered.join(operator.separator()));
                    }
                }
            }
        }
        out
    }

    /// Compile the template into an anchored regex with one named capture
    /// per variable.
    pub fn to_regex(&self) -> Result<Regex, Error> {
        let mut pattern = String::from("^");
        for part in &self.parts {
            match part {
                Part::Literal(lit) => pattern.push_str(&regex::escape(lit)),
                Part::Expression { operator, vars } => {
                    let mut alternatives = String::new();
                    for (i, spec) in vars.iter().enumerate() {
                        if i > 0 {
                            alternatives
                                .push_str(&format!("(?:{})?", regex::escape(operator.separator())));
                        }
                        let group = format!(
                            "(?P<{}>{})",
                            sanitize_group_name(&spec.name),
                            operator.value_pattern()
                        );
                        if operator.named() {
                            // Named pairs may be omitted wholesale when the
                            // variable was undefined at expansion time.
                            alternatives.push_str(&format!(
                                "(?:{}={group})?",
                                regex::escape(&spec.name)
                            ));
                        } else {
                            alternatives.push_str(&group);
                        }
                    }
                    let first = regex::escape(operator.first());
                    pattern.push_str(&format!("(?:{first}{alternatives})?"));
                }
            }
        }
        pattern.push('$');
        Regex::new(&pattern)
            .map_err(|e| Error::Internal(format!("URI template regex failed to compile: {e}")))
    }

    /// Whether `url` matches this template. Templates without a scheme are
    /// matched against the path (and query/fragment) portion of the URL.
    pub fn matches(&self, url: &str) -> bool {
        self.extract(url).is_some()
    }

    /// Match `url` and extract the (percent-decoded) variable values.
    pub fn extract(&self, url: &str) -> Option<HashMap<String, String>> {
        let regex = self.to_regex().ok()?;
        let target = self.match_target(url);
        let captures = regex.captures(target)?;
        let mut values = HashMap::new();
        for spec in self.variable_names() {
            if let Some(m) = captures.name(&sanitize_group_name(spec)) {
                if !m.as_str().is_empty() {
                    let decoded = urlencoding::decode(m.as_str())
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| m.as_str().to_string());
                    values.insert(spec.to_string(), decoded);
                }
            }
        }
        Some(values)
    }

    fn match_target<'a>(&self, url: &'a str) -> &'a str {
        if self.raw.contains("://") {
            return url;
        }
        // Strip scheme and authority so path-only templates line up.
        match url.find("://") {
            Some(idx) => {
                let after = &url[idx + 3..];
                match after.find('/') {
                    Some(slash) => &after[slash..],
                    None => "",
                }
            }
            None => url,
        }
    }
}

fn sanitize_group_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'v');
    }
    out
}

fn encode(value: &str, allow_reserved: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let keep = c.is_ascii_alphanumeric()
            || UNRESERVED.contains(c)
            || (allow_reserved && RESERVED.contains(c));
        if keep {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_expansion() {
        let t = UriTemplate::parse("/users/{id}/posts").unwrap();
        assert_eq!(t.expand(&vars(&[("id", "42")])), "/users/42/posts");
    }

    #[test]
    fn expansion_percent_encodes() {
        let t = UriTemplate::parse("/search/{q}").unwrap();
        assert_eq!(t.expand(&vars(&[("q", "hello world")])), "/search/hello%20world");
    }

    #[test]
    fn reserved_expansion_keeps_slashes() {
        let t = UriTemplate::parse("{+path}/here").unwrap();
        assert_eq!(t.expand(&vars(&[("path", "/a/b")])), "/a/b/here");
    }

    #[test]
    fn query_expansion_and_omission() {
        let t = UriTemplate::parse("/list{?page,size}").unwrap();
        assert_eq!(
            t.expand(&vars(&[("page", "2"), ("size", "10")])),
            "/list?page=2&size=10"
        );
        assert_eq!(t.expand(&vars(&[("page", "2")])), "/list?page=2");
        assert_eq!(t.expand(&vars(&[])), "/list");
    }

    #[test]
    fn prefix_modifier_truncates() {
        let t = UriTemplate::parse("/{code:3}").unwrap();
        assert_eq!(t.expand(&vars(&[("code", "abcdef")])), "/abc");
    }

    #[test]
    fn expand_then_extract_recovers_variables() {
        let t = UriTemplate::parse("/users/{id}/files{?kind}").unwrap();
        let input = vars(&[("id", "7"), ("kind", "archive")]);
        let expanded = t.expand(&input);
        let recovered = t.extract(&expanded).expect("expansion should match");
        assert_eq!(recovered, input);
    }

    #[test]
    fn path_only_template_matches_full_url() {
        let t = UriTemplate::parse("/users/{id}").unwrap();
        assert!(t.matches("https://example.com/users/9"));
        assert!(!t.matches("https://example.com/groups/9"));
        assert_eq!(
            t.extract("https://example.com/users/9").unwrap().get("id").map(String::as_str),
            Some("9")
        );
    }

    #[test]
    fn absolute_template_matches_absolute_url() {
        let t = UriTemplate::parse("https://api.example.com/v1/{resource}").unwrap();
        assert!(t.matches("https://api.example.com/v1/items"));
        assert!(!t.matches("https://api.example.com/v2/items"));
    }

    #[test]
    fn malformed_template_is_rejected() {
        assert!(UriTemplate::parse("/open{brace").is_err());
        assert!(UriTemplate::parse("/empty{}").is_err());
    }
}
