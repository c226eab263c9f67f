//! Record: one delimiter-split line of a table file.

use crate::error::{SqlmrError, SqlmrResult};
use smallvec::SmallVec;
use std::fmt;

/// Default column separator for table files.
pub const DEFAULT_SEPARATOR: &str = ",";

/// 한 줄(row)의 필드 목록, 생성 후 불변
///
/// Fields are trimmed of surrounding whitespace. Addressing is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    fields: SmallVec<[String; 8]>,
}

impl Record {
    /// Split `line` on `separator` and trim every field.
    ///
    /// Trailing empty fields are dropped, so `"a,b,"` has two fields. An empty
    /// line is a single empty field.
    pub fn parse(line: &str, separator: &str) -> Self {
        let mut fields: SmallVec<[String; 8]> = if separator.is_empty() {
            SmallVec::from_elem(line.to_string(), 1)
        } else {
            line.split(separator).map(str::to_string).collect()
        };
        while fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        for field in fields.iter_mut() {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        Self { fields }
    }

    /// Split `line` on `separator` keeping every field, trailing empty ones
    /// included. For rows the engine wrote itself, where a field may be an
    /// empty column value.
    pub fn parse_exact(line: &str, separator: &str) -> Self {
        if separator.is_empty() {
            return Self {
                fields: SmallVec::from_elem(line.trim().to_string(), 1),
            };
        }
        Self {
            fields: line.split(separator).map(|f| f.trim().to_string()).collect(),
        }
    }

    /// Build a record from already separated fields (kept verbatim).
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field at a 0-based position.
    pub fn get(&self, index: usize) -> SqlmrResult<&str> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| SqlmrError::ColumnIndexOutOfRange {
                index,
                len: self.fields.len(),
                record: self.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Render the record as a line using `separator`.
    pub fn to_line(&self, separator: &str) -> String {
        join_fields(self.fields.iter().map(String::as_str), separator)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line(DEFAULT_SEPARATOR))
    }
}

/// Concatenate fields with `separator` (no trailing separator).
pub fn join_fields<'a, I>(fields: I, separator: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(field);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_fields() {
        let r = Record::parse(" 0 , Matt Damon ,US", ",");
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(0).unwrap(), "0");
        assert_eq!(r.get(1).unwrap(), "Matt Damon");
        assert_eq!(r.get(2).unwrap(), "US");
    }

    #[test]
    fn parse_multi_char_separator() {
        let r = Record::parse("a||b||c", "||");
        assert_eq!(r.fields(), &["a", "b", "c"]);
        assert_eq!(r.to_line("||"), "a||b||c");
    }

    #[test]
    fn trailing_empty_fields_dropped() {
        let r = Record::parse("a,b,,", ",");
        assert_eq!(r.len(), 2);
        // inner empty fields survive
        let r = Record::parse("a,,b", ",");
        assert_eq!(r.fields(), &["a", "", "b"]);
    }

    #[test]
    fn parse_exact_keeps_trailing_empty_fields() {
        let r = Record::parse_exact("a, b ,", ",");
        assert_eq!(r.fields(), &["a", "b", ""]);
        assert_eq!(r.to_line(","), "a,b,");
        assert_eq!(Record::parse_exact("", ",").len(), 1);
    }

    #[test]
    fn empty_line_is_single_empty_field() {
        let r = Record::parse("", ",");
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(0).unwrap(), "");
    }

    #[test]
    fn out_of_range_is_an_error() {
        let r = Record::parse("0,Matt,US", ",");
        match r.get(3) {
            Err(SqlmrError::ColumnIndexOutOfRange { index, len, record }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 3);
                assert_eq!(record, "0,Matt,US");
            }
            other => panic!("expected ColumnIndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn join_fields_has_no_trailing_separator() {
        assert_eq!(join_fields(["a", "b"], ";"), "a;b");
        assert_eq!(join_fields(Vec::<&str>::new(), ";"), "");
    }
}
