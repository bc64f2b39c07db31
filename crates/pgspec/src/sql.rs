//! Single-pass SQL text and parameter accumulator.
//!
//! Every placeholder is written at the same moment its value is pushed, so the `$n`
//! numbering in the text always matches the position in the parameter list. Nested
//! subqueries write into the same [`SqlWriter`] and keep numbering continuously.

use crate::error::SpecResult;
use crate::field::Field;
use crate::ident::write_segment;
use crate::param::{Param, ParamList};
use std::fmt::Write;

#[derive(Debug, Default)]
pub struct SqlWriter {
    text: String,
    params: ParamList,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.text.push_str(sql);
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, param: Param) -> &mut Self {
        let idx = self.params.push_param(param);
        let _ = write!(&mut self.text, "${idx}");
        self
    }

    /// Append a validated table, alias or column segment.
    pub fn push_ident(&mut self, ident: &str) -> SpecResult<&mut Self> {
        write_segment(ident, &mut self.text)?;
        Ok(self)
    }

    /// Append a validated field reference.
    pub fn push_field(&mut self, field: &Field) -> SpecResult<&mut Self> {
        field.write_sql(&mut self.text)?;
        Ok(self)
    }

    /// Append an integer literal. Used for LIMIT/OFFSET, which are never user text.
    pub fn push_int(&mut self, n: i64) -> &mut Self {
        let _ = write!(&mut self.text, "{n}");
        self
    }

    /// Number of parameters bound so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> (String, ParamList) {
        (self.text, self.params)
    }
}
