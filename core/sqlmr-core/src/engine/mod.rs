//! Query driver: planning, job submission and result access

pub mod driver;
pub mod jobs;
pub mod plan;
pub mod results;

pub use driver::SqlEngine;
pub use jobs::{SortMapper, SortReducer, SqlMapper, SqlReducer};
pub use plan::Plan;
pub use results::{column_name, format_records, read_results, records_to_batch};
