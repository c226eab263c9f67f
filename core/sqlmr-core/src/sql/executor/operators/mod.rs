//! Per-record operators of the map, reduce and sort stages

mod aggregator;
mod join_index;
mod row_processor;
mod sort_stage;

pub use aggregator::{Accumulator, Aggregator, format_decimal};
pub use join_index::{JoinIndex, JoinTables};
pub use row_processor::{JoinedRow, RowProcessor, RowSource, evaluate};
pub use sort_stage::{SORT_KEY, SortStage, sort_key};
