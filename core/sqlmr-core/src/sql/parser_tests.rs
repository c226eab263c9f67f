use super::*;
use crate::sql::ast::{CompareOp, LogicalOp, SortOrder};

fn compile(sql: &str) -> Query {
    SqlCompiler::new().compile(sql, true).unwrap()
}

fn compile_err(sql: &str) -> SqlmrError {
    SqlCompiler::new().compile(sql, true).unwrap_err()
}

fn simple(table: &str, position: usize, op: CompareOp, value: &str) -> WhereClause {
    WhereClause::simple(Column::new(table, position - 1), op, value)
}

#[test]
fn test_simple_select() {
    let q = compile("SELECT user.2 FROM user WHERE user.3 = 'US'");
    assert_eq!(q.main_table, "user");
    assert_eq!(q.select_items, vec![SelectItem::Column(Column::new("user", 1))]);
    assert_eq!(q.where_clause, Some(simple("user", 3, CompareOp::Eq, "us")));
    assert!(!q.requires_grouping);
    assert!(!q.requires_sort());
}

#[test]
fn test_select_item_kinds() {
    let q = compile("SELECT 'Total, all', user.1, SUM(user.3), avg(user.3) FROM user GROUP BY user.1");
    assert_eq!(q.select_items.len(), 4);
    // SQL text is case-folded, constants included
    assert_eq!(q.select_items[0], SelectItem::Constant("total, all".to_string()));
    assert_eq!(q.select_items[1], SelectItem::Column(Column::new("user", 0)));
    assert_eq!(
        q.select_items[2],
        SelectItem::Aggregate {
            function: AggregateFunction::Sum,
            column: Column::new("user", 2),
        }
    );
    assert!(matches!(
        q.select_items[3],
        SelectItem::Aggregate {
            function: AggregateFunction::Avg,
            ..
        }
    ));
    assert!(q.requires_grouping);
    assert_eq!(q.key_width(), 2);
}

#[test]
fn test_distinct_flag() {
    let q = compile("SELECT DISTINCT user.3 FROM user");
    assert!(q.distinct);
    assert_eq!(q.select_items.len(), 1);
}

#[test]
fn test_multiline_and_tabs() {
    let q = compile("SELECT user.1\n\tFROM user\nWHERE user.2 LIKE 'matt'");
    assert_eq!(q.where_clause, Some(simple("user", 2, CompareOp::Like, "matt")));
}

#[test]
fn test_join_sides_are_assigned_by_table() {
    let q = compile(
        "SELECT sale.1, user.2 FROM sale JOIN user ON user.1 = sale.1 \
         JOIN product ON sale.2 = product.1 AND sale.3 = product.4",
    );
    assert_eq!(q.joins.len(), 2);
    assert_eq!(q.joins[0].table, "user");
    assert_eq!(q.joins[0].clauses[0].local_index, 0);
    assert_eq!(q.joins[0].clauses[0].foreign, Column::new("user", 0));
    assert_eq!(q.joins[1].clauses.len(), 2);
    assert_eq!(q.joins[1].clauses[1].local_index, 2);
    assert_eq!(q.joins[1].clauses[1].foreign, Column::new("product", 3));
}

#[test]
fn test_join_between_two_foreign_tables_is_rejected() {
    let err = compile_err(
        "SELECT sale.1 FROM sale JOIN user ON sale.1 = user.1 JOIN store ON user.1 = store.1",
    );
    assert!(matches!(err, SqlmrError::SqlParse { .. }));
    assert!(err.to_string().contains("invalid join"));
}

#[test]
fn test_join_without_on() {
    let err = compile_err("SELECT sale.1 FROM sale JOIN user");
    assert!(err.to_string().contains("JOIN without ON"));
}

#[test]
fn test_where_first_operator_wins() {
    // a AND b OR c  =>  a AND (b OR c)
    let q = compile("SELECT t.1 FROM t WHERE t.1 = 'a' AND t.2 = 'b' OR t.3 = 'c'");
    let expected = WhereClause::compound(
        simple("t", 1, CompareOp::Eq, "a"),
        LogicalOp::And,
        WhereClause::compound(
            simple("t", 2, CompareOp::Eq, "b"),
            LogicalOp::Or,
            simple("t", 3, CompareOp::Eq, "c"),
        ),
    );
    assert_eq!(q.where_clause, Some(expected));
}

#[test]
fn test_where_leading_group_is_left_operand() {
    let q = compile("SELECT t.1 FROM t WHERE (t.1 = 'a' OR t.2 = 'b') AND t.3 != 'c'");
    let expected = WhereClause::compound(
        WhereClause::compound(
            simple("t", 1, CompareOp::Eq, "a"),
            LogicalOp::Or,
            simple("t", 2, CompareOp::Eq, "b"),
        ),
        LogicalOp::And,
        simple("t", 3, CompareOp::NotEq, "c"),
    );
    assert_eq!(q.where_clause, Some(expected));
}

#[test]
fn test_where_deep_nesting() {
    let sql = "SELECT t1.1 FROM t1 JOIN t2 ON t1.1 = t2.2 JOIN t3 ON t1.1 = t3.2 \
               WHERE t1.1 = '5' AND (t2.2 > '9' OR t3.1 LIKE 'test') \
               AND ((t1.2 = '7' OR (t1.2 <= '4' AND t1.3 != '20')) OR (t1.4 >= '20'))";
    let q = compile(sql);
    let WhereClause::Compound { left, op, right } = q.where_clause.unwrap() else {
        panic!("expected compound");
    };
    assert_eq!(*left, simple("t1", 1, CompareOp::Eq, "5"));
    assert_eq!(op, LogicalOp::And);

    let WhereClause::Compound { left, op, right } = *right else {
        panic!("expected compound");
    };
    assert_eq!(op, LogicalOp::And);
    assert_eq!(
        *left,
        WhereClause::compound(
            simple("t2", 2, CompareOp::Gt, "9"),
            LogicalOp::Or,
            simple("t3", 1, CompareOp::Like, "test"),
        )
    );
    assert_eq!(
        *right,
        WhereClause::compound(
            WhereClause::compound(
                simple("t1", 2, CompareOp::Eq, "7"),
                LogicalOp::Or,
                WhereClause::compound(
                    simple("t1", 2, CompareOp::LtEq, "4"),
                    LogicalOp::And,
                    simple("t1", 3, CompareOp::NotEq, "20"),
                ),
            ),
            LogicalOp::Or,
            simple("t1", 4, CompareOp::GtEq, "20"),
        )
    );
}

#[test]
fn test_where_operators() {
    let cases = [
        ("t.1 != 'x'", CompareOp::NotEq),
        ("t.1 >= 'x'", CompareOp::GtEq),
        ("t.1 <= 'x'", CompareOp::LtEq),
        ("t.1 = 'x'", CompareOp::Eq),
        ("t.1 like 'x'", CompareOp::Like),
        ("t.1 > 'x'", CompareOp::Gt),
        ("t.1 < 'x'", CompareOp::Lt),
    ];
    for (cond, op) in cases {
        let q = compile(&format!("SELECT t.1 FROM t WHERE {cond}"));
        assert_eq!(q.where_clause, Some(simple("t", 1, op, "x")), "{cond}");
    }
}

#[test]
fn test_literal_on_the_left_keeps_operator() {
    let q = compile("SELECT t.1 FROM t WHERE '10' < t.2");
    assert_eq!(q.where_clause, Some(simple("t", 2, CompareOp::Lt, "10")));

    let q = compile("SELECT t.1 FROM t WHERE 'b' >= t.1");
    assert_eq!(q.where_clause, Some(simple("t", 1, CompareOp::GtEq, "b")));
}

#[test]
fn test_keywords_inside_literals_are_ignored() {
    let q = compile("SELECT t.1 FROM t WHERE t.2 = 'rock and roll' OR t.3 = 'a=b'");
    let expected = WhereClause::compound(
        simple("t", 2, CompareOp::Eq, "rock and roll"),
        LogicalOp::Or,
        simple("t", 3, CompareOp::Eq, "a=b"),
    );
    assert_eq!(q.where_clause, Some(expected));
}

#[test]
fn test_unbalanced_parentheses() {
    for sql in [
        "SELECT t.1 FROM t WHERE (t.1 = 'a' AND t.2 = 'b'",
        "SELECT t.1 FROM t WHERE t.1 = 'a')",
    ] {
        let err = compile_err(sql);
        assert!(matches!(err, SqlmrError::SqlParse { .. }), "{sql}");
        assert!(err.to_string().contains("parentheses"), "{sql}");
    }
}

#[test]
fn test_where_without_literal() {
    let err = compile_err("SELECT t.1 FROM t WHERE t.1 = t.2");
    assert!(err.to_string().contains("invalid raw value"));
}

#[test]
fn test_where_without_operator() {
    let err = compile_err("SELECT t.1 FROM t WHERE t.1 'a'");
    assert!(err.to_string().contains("invalid operator"));
}

#[test]
fn test_order_by() {
    let q = compile("SELECT t.1, t.2 FROM t ORDER BY 2 DESC, 1");
    assert_eq!(
        q.sort_clauses,
        vec![
            SortClause {
                select_index: 1,
                order: SortOrder::Desc
            },
            SortClause {
                select_index: 0,
                order: SortOrder::Asc
            },
        ]
    );
    assert!(q.requires_sort());
}

#[test]
fn test_order_by_bad_position() {
    let err = compile_err("SELECT t.1 FROM t ORDER BY first");
    assert!(matches!(err, SqlmrError::SqlParse { .. }));
    let err = compile_err("SELECT t.1 FROM t ORDER BY 0");
    assert!(matches!(err, SqlmrError::SqlParse { .. }));
}

#[test]
fn test_group_by_and_order_by_boundaries() {
    let q = compile(
        "SELECT user.3, COUNT(user.1) FROM user WHERE user.1 > '0' GROUP BY user.3 ORDER BY 2 DESC",
    );
    assert_eq!(q.group_by, vec![Column::new("user", 2)]);
    assert_eq!(q.where_clause, Some(simple("user", 1, CompareOp::Gt, "0")));
    assert_eq!(q.sort_clauses.len(), 1);
}

#[test]
fn test_missing_from() {
    let err = compile_err("SELECT user.1");
    assert!(err.to_string().contains("missing FROM"));
    let err = compile_err("UPDATE user SET x = 1");
    assert!(err.to_string().contains("must start with SELECT"));
}

#[test]
fn test_empty_select_list() {
    let err = compile_err("SELECT FROM user");
    assert!(err.to_string().contains("empty SELECT"));
}

#[test]
fn test_clauses_out_of_order() {
    let err = compile_err("SELECT t.1 FROM t GROUP BY t.1 WHERE t.1 = 'a'");
    assert!(err.to_string().contains("order"));
}

#[test]
fn test_invalid_column() {
    for sql in [
        "SELECT user FROM user",
        "SELECT user.x FROM user",
        "SELECT user.0 FROM user",
        "SELECT user.1.2 FROM user",
    ] {
        assert!(matches!(compile_err(sql), SqlmrError::SqlParse { .. }), "{sql}");
    }
}

#[test]
fn test_having_is_not_supported() {
    let err = compile_err(
        "SELECT user.3, COUNT(user.1) FROM user GROUP BY user.3 HAVING COUNT(user.1) > 1",
    );
    assert!(matches!(err, SqlmrError::SqlNotSupported { .. }));
}

// ===== Validation =====

#[test]
fn test_validation_undefined_table() {
    for sql in [
        "SELECT orders.1 FROM user",
        "SELECT user.1 FROM user WHERE orders.2 = 'x'",
        "SELECT user.1, COUNT(user.2) FROM user GROUP BY orders.1, user.1",
    ] {
        let err = compile_err(sql);
        assert!(matches!(err, SqlmrError::SqlValidation { .. }), "{sql}");
        assert!(err.to_string().contains("undefined table"), "{sql}");
    }
}

#[test]
fn test_validation_group_by_completeness() {
    let err = compile_err("SELECT user.3, user.2, COUNT(user.1) FROM user GROUP BY user.3");
    assert!(matches!(err, SqlmrError::SqlValidation { .. }));
    assert!(err.to_string().contains("user.2"));

    // constants never need grouping
    compile("SELECT 'n', user.3, COUNT(user.1) FROM user GROUP BY user.3");
}

#[test]
fn test_validation_sort_position() {
    let err = compile_err("SELECT t.1, t.2 FROM t ORDER BY 3");
    assert!(matches!(err, SqlmrError::SqlValidation { .. }));
}

#[test]
fn test_validation_skipped_when_disabled() {
    let q = SqlCompiler::new()
        .compile("SELECT orders.1 FROM user ORDER BY 4", false)
        .unwrap();
    assert_eq!(q.main_table, "user");
}

// ===== Properties =====

#[test]
fn test_compile_is_deterministic() {
    let sql = "SELECT sale.1, user.2, SUM(sale.4) FROM sale JOIN user ON sale.1 = user.1 \
               WHERE (sale.5 > '10' OR sale.6 < '3') AND user.3 LIKE 'united' \
               GROUP BY sale.1, user.2 ORDER BY 3 DESC";
    assert_eq!(compile(sql), compile(sql));
}

#[test]
fn test_display_round_trips() {
    let sql = "SELECT DISTINCT 'x', sale.1, user.2, MAX(sale.4) FROM sale \
               JOIN user ON sale.1 = user.1 \
               WHERE (sale.5 > '10' OR sale.6 < '3') AND user.3 LIKE 'united' OR sale.2 != '4' \
               GROUP BY sale.1, user.2 ORDER BY 3 DESC, 2";
    let q = compile(sql);
    let rendered = q.to_string();
    assert_eq!(compile(&rendered), q, "{rendered}");
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn condition() -> impl Strategy<Value = String> {
        (1usize..6, prop::sample::select(vec!["=", "!=", ">", "<=", "like"]), "[a-z0-9]{1,6}")
            .prop_map(|(col, op, lit)| format!("t.{col} {op} '{lit}'"))
    }

    fn where_text() -> impl Strategy<Value = String> {
        condition().prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), prop::sample::select(vec!["and", "or"]), inner.clone())
                    .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
                inner.prop_map(|c| format!("({c})")),
            ]
        })
    }

    proptest! {
        #[test]
        fn compile_is_pure(cond in where_text()) {
            let sql = format!("SELECT t.1, COUNT(t.2) FROM t WHERE {cond} GROUP BY t.1 ORDER BY 2 DESC");
            let first = Query::compile(&sql, true);
            let second = Query::compile(&sql, true);
            prop_assert!(first.is_ok(), "{:?}", first);
            prop_assert_eq!(first.unwrap(), second.unwrap());
        }

        #[test]
        fn rendered_query_recompiles_to_same_ast(cond in where_text()) {
            let sql = format!("SELECT t.1 FROM t WHERE {cond}");
            let q = Query::compile(&sql, true).unwrap();
            let again = Query::compile(&q.to_string(), true).unwrap();
            prop_assert_eq!(q, again);
        }
    }
}
