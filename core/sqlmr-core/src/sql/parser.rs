use crate::error::{SqlmrError, SqlmrResult};
use crate::sql::ast::{
    AggregateFunction, Column, CompareOp, Join, JoinClause, LogicalOp, Query, SelectItem,
    SortClause, SortOrder, WhereClause,
};
use crate::sql::validator;

/// Clause markers in the order they must appear.
const FROM: &str = " from";
const WHERE: &str = " where";
const GROUP_BY: &str = " group by";
const HAVING: &str = " having";
const ORDER_BY: &str = " order by";

/// SQL 컴파일러: 텍스트 → Query AST (+ 선택적 검증)
///
/// Parsing is a pure function of the text, so every task can recompile the
/// same SQL independently and obtain an identical `Query`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCompiler;

impl SqlCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `sql` into a [`Query`].
    ///
    /// With `validate` the query is also checked against the tables it names,
    /// the GROUP BY list and the SELECT list length.
    pub fn compile(&self, sql: &str, validate: bool) -> SqlmrResult<Query> {
        let normalized = normalize(sql);
        let query = QueryParser { sql: &normalized }.parse()?;
        if validate {
            validator::validate(&query, &normalized)?;
        }
        Ok(query)
    }
}

impl Query {
    /// Shorthand for `SqlCompiler::new().compile(sql, validate)`.
    pub fn compile(sql: &str, validate: bool) -> SqlmrResult<Query> {
        SqlCompiler::new().compile(sql, validate)
    }
}

/// Case-fold and turn line breaks and tabs into spaces.
fn normalize(sql: &str) -> String {
    sql.to_lowercase()
        .replace(['\n', '\r', '\t'], " ")
        .trim()
        .to_string()
}

struct QueryParser<'a> {
    sql: &'a str,
}

/// Raw text of each clause, between its keyword and the next present keyword.
#[derive(Default)]
struct ClauseText<'a> {
    select: &'a str,
    from: &'a str,
    where_: Option<&'a str>,
    group_by: Option<&'a str>,
    having: Option<&'a str>,
    order_by: Option<&'a str>,
}

impl<'a> QueryParser<'a> {
    fn err(&self, message: impl Into<String>) -> SqlmrError {
        SqlmrError::parse(message, self.sql)
    }

    fn parse(&self) -> SqlmrResult<Query> {
        let clauses = self.split_clauses()?;

        if clauses.having.is_some() {
            return Err(SqlmrError::SqlNotSupported {
                feature: "HAVING".to_string(),
                hint: "filter the query output instead".to_string(),
            });
        }

        let (select_items, distinct) = self.parse_select(clauses.select)?;
        let requires_grouping = select_items.iter().any(SelectItem::is_aggregate);
        let (main_table, joins) = self.parse_from(clauses.from)?;

        let where_clause = match clauses.where_ {
            Some(text) => {
                self.check_balanced(text)?;
                Some(self.parse_where(text)?)
            }
            None => None,
        };

        let group_by = match clauses.group_by {
            Some(text) => text
                .split(',')
                .map(|c| self.parse_column(c))
                .collect::<SqlmrResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let sort_clauses = match clauses.order_by {
            Some(text) => text
                .split(',')
                .map(|s| self.parse_sort_clause(s))
                .collect::<SqlmrResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Query {
            select_items,
            distinct,
            main_table,
            joins,
            where_clause,
            group_by,
            sort_clauses,
            requires_grouping,
        })
    }

    // ===== Clause boundaries =====

    fn split_clauses(&self) -> SqlmrResult<ClauseText<'a>> {
        let sql = self.sql;
        if !sql.starts_with("select ") {
            return Err(self.err("query must start with SELECT"));
        }

        // (marker, position) for every present keyword
        let mut found: Vec<(&str, usize)> = Vec::with_capacity(5);
        for marker in [FROM, WHERE, GROUP_BY, HAVING, ORDER_BY] {
            if let Some(pos) = sql.find(marker) {
                found.push((marker, pos));
            }
        }
        if found.first().map(|(m, _)| *m) != Some(FROM) {
            return Err(self.err("missing FROM clause"));
        }
        if found.windows(2).any(|w| w[0].1 >= w[1].1) {
            return Err(self.err(
                "clauses must appear in order SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY",
            ));
        }

        let mut clauses = ClauseText {
            select: sql.get("select ".len()..found[0].1).unwrap_or("").trim(),
            ..ClauseText::default()
        };
        for (i, (marker, pos)) in found.iter().enumerate() {
            let end = found.get(i + 1).map_or(sql.len(), |(_, next)| *next);
            let text = sql[pos + marker.len()..end].trim();
            if text.is_empty() {
                return Err(self.err(format!("empty{} clause", marker.to_uppercase())));
            }
            match *marker {
                FROM => clauses.from = text,
                WHERE => clauses.where_ = Some(text),
                GROUP_BY => clauses.group_by = Some(text),
                HAVING => clauses.having = Some(text),
                _ => clauses.order_by = Some(text),
            }
        }
        Ok(clauses)
    }

    // ===== SELECT =====

    fn parse_select(&self, text: &str) -> SqlmrResult<(Vec<SelectItem>, bool)> {
        let (distinct, text) = match text.strip_prefix("distinct ") {
            Some(rest) => (true, rest.trim()),
            None => (false, text),
        };
        if text.is_empty() {
            return Err(self.err("empty SELECT list"));
        }
        let items = split_top_level(text, ',')
            .into_iter()
            .map(|item| self.parse_select_item(item.trim()))
            .collect::<SqlmrResult<Vec<_>>>()?;
        Ok((items, distinct))
    }

    fn parse_select_item(&self, item: &str) -> SqlmrResult<SelectItem> {
        // Constant
        if item.starts_with('\'') {
            let close = item.rfind('\'').filter(|&i| i > 0);
            return match close {
                Some(close) => Ok(SelectItem::Constant(item[1..close].to_string())),
                None => Err(self.err(format!("unterminated literal in SELECT: {item}"))),
            };
        }

        // Aggregate
        for function in AggregateFunction::ALL {
            let Some(rest) = item
                .strip_prefix(function.sql_name())
                .and_then(|r| r.strip_prefix('('))
            else {
                continue;
            };
            let Some(close) = rest.find(')') else {
                return Err(self.err(format!("missing ')' in aggregate: {item}")));
            };
            if !rest[close + 1..].trim().is_empty() {
                return Err(self.err(format!("unexpected text after aggregate: {item}")));
            }
            return Ok(SelectItem::Aggregate {
                function,
                column: self.parse_column(&rest[..close])?,
            });
        }

        // Plain column
        Ok(SelectItem::Column(self.parse_column(item)?))
    }

    /// `table.n` with a 1-based `n`, stored 0-based.
    fn parse_column(&self, text: &str) -> SqlmrResult<Column> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 2 {
            return Err(self.err(format!("invalid table column: '{text}'")));
        }
        let table = parts[0].trim();
        self.check_table_name(table)?;
        let position: usize = parts[1]
            .trim()
            .parse()
            .map_err(|_| self.err(format!("invalid column number in '{text}'")))?;
        if position == 0 {
            return Err(self.err(format!("column numbers start at 1: '{text}'")));
        }
        Ok(Column::new(table, position - 1))
    }

    fn check_table_name(&self, table: &str) -> SqlmrResult<()> {
        if table.is_empty() || table.contains(char::is_whitespace) {
            return Err(self.err(format!("invalid table name: '{table}'")));
        }
        Ok(())
    }

    // ===== FROM / JOIN =====

    fn parse_from(&self, text: &str) -> SqlmrResult<(String, Vec<Join>)> {
        let mut segments = text.split(" join ");
        let main_table = segments.next().unwrap_or_default().trim();
        self.check_table_name(main_table)?;

        let mut joins = Vec::new();
        for segment in segments {
            let Some((table, on)) = segment.split_once(" on ") else {
                return Err(self.err(format!("JOIN without ON: '{}'", segment.trim())));
            };
            let table = table.trim();
            self.check_table_name(table)?;
            if table == main_table {
                return Err(self.err(format!("ambiguous join: '{table}' is the main table")));
            }

            let clauses = on
                .split(" and ")
                .map(|clause| self.parse_join_clause(clause, main_table, table))
                .collect::<SqlmrResult<Vec<_>>>()?;
            joins.push(Join {
                table: table.to_string(),
                clauses,
            });
        }
        Ok((main_table.to_string(), joins))
    }

    fn parse_join_clause(
        &self,
        clause: &str,
        main_table: &str,
        join_table: &str,
    ) -> SqlmrResult<JoinClause> {
        let Some((left, right)) = clause.split_once('=') else {
            return Err(self.err(format!("join clause is not an equality: '{}'", clause.trim())));
        };
        let c1 = self.parse_column(left)?;
        let c2 = self.parse_column(right)?;

        // One side must be the main table and the other the joined table
        if c1.table == main_table && c2.table == join_table {
            Ok(JoinClause {
                local_index: c1.index,
                foreign: c2,
            })
        } else if c2.table == main_table && c1.table == join_table {
            Ok(JoinClause {
                local_index: c2.index,
                foreign: c1,
            })
        } else {
            Err(self.err(format!("invalid join: '{}'", clause.trim())))
        }
    }

    // ===== WHERE =====

    fn check_balanced(&self, text: &str) -> SqlmrResult<()> {
        let mut depth: i32 = 0;
        for (_, c) in unquoted_chars(text) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(self.err(format!(
                "parentheses are not well formed in where expression: {text}"
            )));
        }
        Ok(())
    }

    /// Recursive WHERE parser.
    ///
    /// A leading parenthesised group becomes the left operand. Otherwise the
    /// text is split at the first top-level AND/OR, whichever comes first, and
    /// the right side is parsed recursively: `a and b or c` is `a and (b or c)`.
    fn parse_where(&self, text: &str) -> SqlmrResult<WhereClause> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.err("empty condition in WHERE"));
        }

        if text.starts_with('(') {
            let close = matching_paren(text).ok_or_else(|| {
                self.err(format!(
                    "parentheses are not well formed in where expression: {text}"
                ))
            })?;
            let left = self.parse_where(&text[1..close])?;

            let rest = &text[close + 1..];
            return match next_logical_op(rest) {
                None if rest.trim().is_empty() => Ok(left),
                Some((pos, op)) if rest[..pos].trim().is_empty() => {
                    let right = self.parse_where(&rest[pos + op.pattern().len()..])?;
                    Ok(WhereClause::compound(left, op, right))
                }
                _ => Err(self.err(format!("unexpected text after ')': '{}'", rest.trim()))),
            };
        }

        match next_logical_op(text) {
            None => self.parse_simple(text),
            Some((pos, op)) => {
                let left = self.parse_simple(&text[..pos])?;
                let right = self.parse_where(&text[pos + op.pattern().len()..])?;
                Ok(WhereClause::compound(left, op, right))
            }
        }
    }

    fn parse_simple(&self, text: &str) -> SqlmrResult<WhereClause> {
        let text = text.trim();
        let found = CompareOp::DETECTION_ORDER
            .iter()
            .find_map(|op| find_unquoted(text, op.pattern()).map(|pos| (*op, pos)));
        let Some((op, pos)) = found else {
            return Err(self.err(format!("invalid operator in where clause: '{text}'")));
        };

        let lhs = text[..pos].trim();
        let rhs = text[pos + op.pattern().len()..].trim();

        // Detect which side is the quoted value
        if rhs.starts_with('\'') {
            Ok(WhereClause::simple(
                self.parse_column(lhs)?,
                op,
                rhs.replace('\'', ""),
            ))
        } else if lhs.starts_with('\'') {
            Ok(WhereClause::simple(
                self.parse_column(rhs)?,
                op,
                lhs.replace('\'', ""),
            ))
        } else {
            Err(self.err(format!("invalid raw value in where clause: '{text}'")))
        }
    }

    // ===== ORDER BY =====

    fn parse_sort_clause(&self, text: &str) -> SqlmrResult<SortClause> {
        let mut tokens = text.split_whitespace();
        let position = tokens
            .next()
            .ok_or_else(|| self.err("empty ORDER BY item"))?;
        let order = match tokens.next() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(self.err(format!("invalid sort order '{other}' in ORDER BY")));
            }
        };
        if tokens.next().is_some() {
            return Err(self.err(format!("unexpected text in ORDER BY item: '{}'", text.trim())));
        }

        let position: usize = position
            .parse()
            .map_err(|_| self.err(format!("invalid ORDER BY position: '{position}'")))?;
        if position == 0 {
            return Err(self.err("ORDER BY positions start at 1"));
        }
        Ok(SortClause {
            select_index: position - 1,
            order,
        })
    }
}

// ===== Scanning helpers =====

/// Characters outside single-quoted literals, with their byte offsets.
fn unquoted_chars(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_quote = false;
    text.char_indices().filter(move |&(_, c)| {
        if c == '\'' {
            in_quote = !in_quote;
            return false;
        }
        !in_quote
    })
}

/// Split on `sep` outside quotes and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in unquoted_chars(text) {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the `)` closing the `(` at the start of `text`.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in unquoted_chars(text) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// First occurrence of `pattern` that does not start inside a quoted literal.
fn find_unquoted(text: &str, pattern: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        if c == '\'' {
            in_quote = !in_quote;
            continue;
        }
        if !in_quote && text[i..].starts_with(pattern) {
            return Some(i);
        }
    }
    None
}

/// First AND/OR outside quotes and parentheses.
fn next_logical_op(text: &str) -> Option<(usize, LogicalOp)> {
    let mut in_quote = false;
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ if !in_quote && depth == 0 => {
                for op in [LogicalOp::And, LogicalOp::Or] {
                    if text[i..].starts_with(op.pattern()) {
                        return Some((i, op));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
