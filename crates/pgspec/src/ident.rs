//! Identifier validation and rendering.
//!
//! Identifiers cannot be bound as parameters, so every table, alias and column name that
//! reaches the SQL text goes through [`write_segment`]:
//!
//! - Unquoted segments must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted segments (`"CamelCase"`) allow anything except NUL; inner `"` is doubled on output

use crate::error::{SpecError, SpecResult};

/// A single validated identifier segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Unquoted(String),
    /// Quoted identifier: allows any characters except NUL.
    Quoted(String),
}

impl IdentPart {
    /// Parse one segment. A segment wrapped in double quotes is taken as quoted,
    /// with `""` standing for a literal quote.
    pub fn parse(s: &str) -> SpecResult<Self> {
        if s.is_empty() {
            return Err(SpecError::compile("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(SpecError::compile(
                "identifier cannot contain NUL character",
            ));
        }

        if let Some(inner) = s.strip_prefix('"') {
            let Some(inner) = inner.strip_suffix('"') else {
                return Err(SpecError::compile(format!(
                    "unclosed quoted identifier: {s}"
                )));
            };
            if inner.is_empty() {
                return Err(SpecError::compile("empty quoted identifier"));
            }
            let mut name = String::with_capacity(inner.len());
            let mut chars = inner.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '"' {
                    // Only `""` is allowed inside a quoted segment.
                    if chars.next_if_eq(&'"').is_none() {
                        return Err(SpecError::compile(format!(
                            "unescaped quote in identifier: {s}"
                        )));
                    }
                }
                name.push(c);
            }
            return Ok(IdentPart::Quoted(name));
        }

        let mut chars = s.chars();
        if let Some(first) = chars.next() {
            if !(first == '_' || first.is_ascii_alphabetic()) {
                return Err(SpecError::compile(format!(
                    "invalid identifier start character '{first}' in '{s}'"
                )));
            }
        }
        if let Some(bad) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric())) {
            return Err(SpecError::compile(format!(
                "invalid character '{bad}' in identifier '{s}'"
            )));
        }
        Ok(IdentPart::Unquoted(s.to_string()))
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        match self {
            IdentPart::Unquoted(s) => out.push_str(s),
            IdentPart::Quoted(s) => {
                out.push('"');
                for ch in s.chars() {
                    if ch == '"' {
                        out.push_str("\"\"");
                    } else {
                        out.push(ch);
                    }
                }
                out.push('"');
            }
        }
    }
}

/// Validate `segment` and append it to `out`.
pub(crate) fn write_segment(segment: &str, out: &mut String) -> SpecResult<()> {
    IdentPart::parse(segment)?.write_sql(out);
    Ok(())
}

/// Split a dotted name on the dots that sit outside of quotes.
pub(crate) fn split_dotted(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(s: &str) -> SpecResult<String> {
        let mut out = String::new();
        write_segment(s, &mut out)?;
        Ok(out)
    }

    #[test]
    fn ident_simple() {
        assert_eq!(render("users").unwrap(), "users");
    }

    #[test]
    fn ident_with_dollar() {
        assert_eq!(render("my_var$1").unwrap(), "my_var$1");
    }

    #[test]
    fn ident_quoted() {
        assert_eq!(render(r#""CamelCase""#).unwrap(), r#""CamelCase""#);
    }

    #[test]
    fn ident_quoted_with_escape() {
        assert_eq!(render(r#""has""quote""#).unwrap(), r#""has""quote""#);
    }

    #[test]
    fn ident_rejects_bad_input() {
        assert!(render("").is_err());
        assert!(render("1table").is_err());
        assert!(render("my table").is_err());
        assert!(render("id; DROP TABLE users").is_err());
        assert!(render(r#""unclosed"#).is_err());
        assert!(render(r#""a"b""#).is_err());
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(split_dotted("u.id"), vec!["u", "id"]);
        assert_eq!(split_dotted(r#""a.b".c"#), vec![r#""a.b""#, "c"]);
        assert_eq!(split_dotted("name"), vec!["name"]);
    }
}
