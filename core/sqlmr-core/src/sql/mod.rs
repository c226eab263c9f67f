//! SQL front end: AST, compiler and validator, plus the per-record executor

pub mod ast;
pub mod executor;
pub mod parser;
pub mod validator;

pub use ast::{
    AggregateFunction, Column, CompareOp, Join, JoinClause, LogicalOp, Query, SelectItem,
    SortClause, SortOrder, WhereClause,
};
pub use parser::SqlCompiler;
