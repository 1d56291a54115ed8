//! Single-dispensary statistics page: summary figures plus one chart per
//! sales category, resampled to the requested period.

use polars::prelude::DataFrame;

use crate::error::DashError;
use crate::model::{SalesCategory, SalesModel};
use crate::resample::{bucket_dates, bucket_values, resample, summarize, Period};
use crate::view::{
    format_usd, licensee_table, ChartKind, ChartSeries, ChartSpec, ViewModel,
};

#[derive(Debug, Clone)]
pub struct StatsRequest {
    pub dispensary_id: String,
    pub period: Period,
}

pub fn dispensary_stats(
    model: &SalesModel,
    request: &StatsRequest,
) -> Result<ViewModel, DashError> {
    let licensee = model.licensee(&request.dispensary_id)?;
    let id = &licensee.global_id;
    let period = request.period;

    let mut vm = ViewModel::new("Dispensary Statistics");
    vm.push_table(licensee_table(&licensee));
    vm.push_heading(format!("Sales Data Summary for {}", licensee.name));

    let mut aggregates: Vec<(SalesCategory, DataFrame)> = Vec::new();
    for category in SalesCategory::ALL {
        let series = model.series(category, id)?;
        aggregates.push((category, resample(&series, id, period)?));
    }

    let total_summary = summarize(&aggregates[0].1, id)?;
    let Some(total_summary) = total_summary else {
        vm.push_notice(format!("No recorded sales for {}.", licensee.name));
        return Ok(vm);
    };

    vm.push_text(format!(
        "Total Sales Between {} to {}: {}",
        total_summary.first,
        total_summary.last,
        format_usd(total_summary.total)
    ));
    for (category, aggregate) in &aggregates {
        let mean = summarize(aggregate, id)?
            .map(|s| format_usd(s.mean))
            .unwrap_or_else(|| "no data".to_string());
        vm.push_text(format!(
            "Average {} {}: {}",
            period.label(),
            mean_label(*category),
            mean
        ));
    }

    vm.push_heading("Sales Data Visualization");
    let kind = if period.uses_line_chart() {
        ChartKind::Line
    } else {
        ChartKind::Bar
    };
    for (category, aggregate) in &aggregates {
        if aggregate.height() == 0 {
            continue;
        }
        vm.push_chart(sales_chart(aggregate, id, kind, *category, period)?);
    }

    Ok(vm)
}

fn mean_label(category: SalesCategory) -> &'static str {
    match category {
        SalesCategory::Total => "Total Sales (Medical and Recreational)",
        SalesCategory::Medical => "Medical Sales",
        SalesCategory::Recreational => "Recreational Sales",
    }
}

fn chart_title(category: SalesCategory, period: Period) -> String {
    match category {
        SalesCategory::Total => format!("{} Sales (Medical and Recreational)", period.label()),
        SalesCategory::Medical => format!("{} Medical Retail Sales", period.label()),
        SalesCategory::Recreational => format!("{} Recreational Retail Sales", period.label()),
    }
}

fn sales_chart(
    aggregate: &DataFrame,
    global_id: &str,
    kind: ChartKind,
    category: SalesCategory,
    period: Period,
) -> Result<ChartSpec, DashError> {
    let x: Vec<String> = bucket_dates(aggregate)?
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let y = bucket_values(aggregate, global_id)?;

    Ok(ChartSpec {
        kind,
        title: chart_title(category, period),
        x_title: "Date".to_string(),
        y_title: "Total Sales, USD".to_string(),
        series: vec![ChartSeries {
            name: category.label().to_string(),
            x,
            y,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn request(id: &str, period: Period) -> StatsRequest {
        StatsRequest {
            dispensary_id: id.to_string(),
            period,
        }
    }

    #[test]
    fn monthly_report_uses_line_charts() {
        let (_dir, model) = fixtures::model();
        let vm = dispensary_stats(&model, &request("disp-001", Period::Monthly)).unwrap();
        let charts = vm.charts();
        assert_eq!(charts.len(), 3);
        assert!(charts.iter().all(|c| c.kind == ChartKind::Line));
        assert!(vm.contains_text("Total Sales Between 2020-01-01 to 2020-02-01: $350.00"));
        assert!(vm.contains_text(
            "Average Monthly Total Sales (Medical and Recreational): $175.00"
        ));
    }

    #[test]
    fn yearly_report_uses_bar_charts() {
        let (_dir, model) = fixtures::model();
        let vm = dispensary_stats(&model, &request("disp-001", Period::Yearly)).unwrap();
        let charts = vm.charts();
        assert_eq!(charts.len(), 3);
        assert!(charts.iter().all(|c| c.kind == ChartKind::Bar));
    }

    #[test]
    fn zero_sales_dispensary_degrades_to_notice() {
        let (_dir, model) = fixtures::model();
        let vm = dispensary_stats(&model, &request("disp-003", Period::Monthly)).unwrap();
        assert!(vm.charts().is_empty());
        assert!(vm.contains_text("No recorded sales"));
    }

    #[test]
    fn missing_dispensary_aborts_the_view() {
        let (_dir, model) = fixtures::model();
        let err = dispensary_stats(&model, &request("disp-404", Period::Monthly)).unwrap_err();
        assert!(matches!(err, DashError::MissingDispensary(_)));
    }

    #[test]
    fn category_with_no_qualifying_rows_reports_no_data() {
        let (_dir, model) = fixtures::model();
        // disp-005 has medical sales only.
        let vm = dispensary_stats(&model, &request("disp-005", Period::Monthly)).unwrap();
        assert!(vm.contains_text("Average Monthly Recreational Sales: no data"));
        assert_eq!(vm.charts().len(), 2);
    }
}
