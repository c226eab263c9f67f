//! Query executor: the stage operators run inside map and reduce tasks

pub mod operators;

pub use operators::{
    Accumulator, Aggregator, JoinIndex, JoinTables, JoinedRow, RowProcessor, RowSource,
    SortStage, evaluate,
};
