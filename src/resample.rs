use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;

use crate::error::DashError;
use crate::schema::sales;

/// Resampling granularity for a sales series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Quarterly,
        Period::Yearly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Daily => "Daily",
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
            Period::Quarterly => "Quarterly",
            Period::Yearly => "Yearly",
        }
    }

    /// Polars truncation interval. Weeks are ISO weeks (Monday start).
    fn every(&self) -> &'static str {
        match self {
            Period::Daily => "1d",
            Period::Weekly => "1w",
            Period::Monthly => "1mo",
            Period::Quarterly => "1q",
            Period::Yearly => "1y",
        }
    }

    /// Fine-grained periods are drawn as marker+line charts, coarse ones
    /// as bars.
    pub fn uses_line_chart(&self) -> bool {
        matches!(self, Period::Daily | Period::Weekly | Period::Monthly)
    }
}

impl std::str::FromStr for Period {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "quarterly" => Ok(Period::Quarterly),
            "yearly" => Ok(Period::Yearly),
            other => Err(DashError::InvalidData(format!(
                "Unknown period: '{other}'. Expected daily, weekly, monthly, quarterly or yearly"
            ))),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate a filtered single-dispensary series into calendar buckets by
/// summation. Buckets with no qualifying rows are absent, not zero.
pub fn resample(
    series: &DataFrame,
    global_id: &str,
    period: Period,
) -> Result<DataFrame, DashError> {
    let df = series
        .clone()
        .lazy()
        .with_columns([col(sales::SOLD_AT).dt().truncate(lit(period.every()))])
        .group_by([col(sales::SOLD_AT)])
        .agg([col(global_id).sum()])
        .sort([sales::SOLD_AT], SortMultipleOptions::default())
        .collect()?;
    Ok(df)
}

/// Summary statistics over one aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub total: f64,
    pub mean: f64,
    pub buckets: usize,
}

/// None when the aggregate has no buckets.
pub fn summarize(
    aggregate: &DataFrame,
    global_id: &str,
) -> Result<Option<AggregateSummary>, DashError> {
    let dates = bucket_dates(aggregate)?;
    let values = bucket_values(aggregate, global_id)?;
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Ok(None);
    };
    let total: f64 = values.iter().sum();
    Ok(Some(AggregateSummary {
        first: *first,
        last: *last,
        total,
        mean: total / values.len() as f64,
        buckets: values.len(),
    }))
}

/// Bucket start dates of an aggregate, as calendar dates.
pub fn bucket_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, DashError> {
    let dates = df.column(sales::SOLD_AT)?.datetime()?;
    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let us = dates
            .phys
            .get(i)
            .ok_or_else(|| DashError::General("Null bucket date".into()))?;
        let dt = DateTime::<Utc>::from_timestamp_micros(us)
            .ok_or_else(|| DashError::General(format!("Out-of-range timestamp: {us}")))?;
        out.push(dt.date_naive());
    }
    Ok(out)
}

/// Aggregate values, in bucket order.
pub fn bucket_values(df: &DataFrame, global_id: &str) -> Result<Vec<f64>, DashError> {
    let values = df.column(global_id)?.f64()?;
    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        out.push(values.get(i).unwrap_or(0.0));
    }
    Ok(out)
}
