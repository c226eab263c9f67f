//! Aggregator: reduce-stage COUNT/SUM/MAX/MIN/AVG per shuffle key

use crate::error::{SqlmrError, SqlmrResult};
use crate::record::{Record, join_fields};
use crate::sql::ast::{AggregateFunction, Query, SelectItem};
use smallvec::SmallVec;
use std::sync::Arc;

/// 집계 누산기: 모든 집계 항목이 하나의 count/sum/max/min을 공유
///
/// MAX and MIN items feed the same running extremes, so a query with two
/// different MAX targets reports the larger of both for each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
    pub min: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }
}

impl Accumulator {
    /// Fold one aggregate input into the accumulator.
    ///
    /// `record` is only used for error messages.
    pub fn update(
        &mut self,
        function: AggregateFunction,
        field: &str,
        record: &Record,
    ) -> SqlmrResult<()> {
        match function {
            AggregateFunction::Count => self.count += 1,
            AggregateFunction::Sum => self.sum += parse_number(field, function, record)?,
            AggregateFunction::Avg => {
                self.count += 1;
                self.sum += parse_number(field, function, record)?;
            }
            AggregateFunction::Max | AggregateFunction::Min => {
                let v = parse_number(field, function, record)?;
                if v > self.max {
                    self.max = v;
                }
                if v < self.min {
                    self.min = v;
                }
            }
        }
        Ok(())
    }

    /// Combine two partial accumulators.
    pub fn merge(&mut self, other: &Accumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.max = self.max.max(other.max);
        self.min = self.min.min(other.min);
    }

    /// Final output text for one aggregate item.
    pub fn render(&self, function: AggregateFunction) -> String {
        match function {
            AggregateFunction::Count => self.count.to_string(),
            AggregateFunction::Sum => format_decimal(self.sum),
            AggregateFunction::Max => format_decimal(self.max),
            AggregateFunction::Min => format_decimal(self.min),
            AggregateFunction::Avg => format_decimal(self.sum / self.count as f64),
        }
    }
}

fn parse_number(field: &str, function: AggregateFunction, record: &Record) -> SqlmrResult<f64> {
    field
        .parse::<f64>()
        .map_err(|_| SqlmrError::NumericParse {
            value: field.to_string(),
            function: function.sql_name().to_string(),
            record: record.to_string(),
        })
}

/// Two decimals, the output format of every non-COUNT aggregate.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.2}")
}

/// 리듀스 단계 집계기
#[derive(Debug, Clone)]
pub struct Aggregator {
    query: Arc<Query>,
    separator: String,
    functions: SmallVec<[AggregateFunction; 4]>,
}

impl Aggregator {
    pub fn new(query: Arc<Query>, separator: impl Into<String>) -> Self {
        let functions = query.aggregates().map(|(function, _)| function).collect();
        Self {
            query,
            separator: separator.into(),
            functions,
        }
    }

    pub fn is_grouping(&self) -> bool {
        self.query.requires_grouping
    }

    /// Fold every value of one key into an accumulator.
    ///
    /// The i-th field of each value belongs to the i-th aggregate item.
    pub fn accumulate<I, S>(&self, values: I) -> SqlmrResult<Accumulator>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut acc = Accumulator::default();
        for value in values {
            let record = Record::parse_exact(value.as_ref(), &self.separator);
            for (i, &function) in self.functions.iter().enumerate() {
                acc.update(function, record.get(i)?, &record)?;
            }
        }
        Ok(acc)
    }

    /// Reduce one shuffle key to its output line.
    ///
    /// Without aggregates the key already holds the whole row and the values
    /// are ignored.
    pub fn reduce<I, S>(&self, key: &str, values: I) -> SqlmrResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_grouping() {
            return Ok(key.to_string());
        }
        let acc = self.accumulate(values)?;
        self.render(key, &acc)
    }

    /// Rebuild the row in select order: plain items come back from the key.
    pub fn render(&self, key: &str, acc: &Accumulator) -> SqlmrResult<String> {
        let group = Record::parse_exact(key, &self.separator);
        let mut group_idx = 0;
        let mut out: SmallVec<[String; 8]> = SmallVec::with_capacity(self.query.select_items.len());
        for item in &self.query.select_items {
            match item {
                SelectItem::Constant(_) | SelectItem::Column(_) => {
                    out.push(group.get(group_idx)?.to_string());
                    group_idx += 1;
                }
                SelectItem::Aggregate { function, .. } => out.push(acc.render(*function)),
            }
        }
        Ok(join_fields(out.iter().map(String::as_str), &self.separator))
    }
}
