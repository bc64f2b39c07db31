//! Column references.

use crate::error::{SpecError, SpecResult};
use crate::ident::{split_dotted, write_segment};
use std::fmt;

/// A column, optionally qualified by a table alias.
///
/// Equality is by `(table, name)`. Names are validated when the statement is compiled,
/// not when the field is created, so building a field never fails.
///
/// ```ignore
/// let f = Field::from("u.email");
/// assert_eq!(f.table(), Some("u"));
/// assert_eq!(f.name(), "email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    table: Option<String>,
    name: String,
}

impl Field {
    /// An unqualified column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// A column qualified by a table or alias.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Parse `name` or `table.name`. Anything after the first unquoted dot belongs to the
    /// column name, which then fails validation at compile time.
    pub fn parse(s: &str) -> Self {
        let parts = split_dotted(s);
        match parts.as_slice() {
            [name] => Self::new(*name),
            [table, rest @ ..] => Self::qualified(*table, rest.join(".")),
            [] => Self::new(s),
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the field, validating every segment. `*` is accepted as a column name.
    pub(crate) fn write_sql(&self, out: &mut String) -> SpecResult<()> {
        if let Some(table) = &self.table {
            write_segment(table, out)?;
            out.push('.');
        }
        if self.name == "*" {
            out.push('*');
            return Ok(());
        }
        write_segment(&self.name, out).map_err(|e| match e {
            SpecError::Compile(msg) => SpecError::compile(format!("field '{self}': {msg}")),
            other => other,
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::parse(s)
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::parse(&s)
    }
}

impl From<&Field> for Field {
    fn from(f: &Field) -> Self {
        f.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: &Field) -> SpecResult<String> {
        let mut out = String::new();
        f.write_sql(&mut out)?;
        Ok(out)
    }

    #[test]
    fn parse_qualified() {
        let f = Field::from("u.email");
        assert_eq!(f, Field::qualified("u", "email"));
        assert_eq!(render(&f).unwrap(), "u.email");
    }

    #[test]
    fn parse_plain() {
        let f = Field::from("email");
        assert_eq!(f.table(), None);
        assert_eq!(render(&f).unwrap(), "email");
    }

    #[test]
    fn wildcard_column() {
        assert_eq!(render(&Field::from("u.*")).unwrap(), "u.*");
    }

    #[test]
    fn three_parts_fail_on_compile() {
        let f = Field::from("a.b.c");
        assert_eq!(f.name(), "b.c");
        assert!(render(&f).unwrap_err().is_compile());
    }

    #[test]
    fn equality_is_by_table_and_name() {
        assert_ne!(Field::from("u.id"), Field::from("p.id"));
        assert_ne!(Field::from("id"), Field::from("u.id"));
    }
}
