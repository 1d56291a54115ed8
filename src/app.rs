//! The enumerable set of named views and their dispatcher. View failures
//! surface as an error page, never as a process failure.

use crate::compare::{self, ComparisonRequest};
use crate::error::DashError;
use crate::geocode::Geocoder;
use crate::model::SalesModel;
use crate::report::{self, StatsRequest};
use crate::view::{TableSpec, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Homepage,
    DispensaryStats,
    Comparison,
}

impl AppView {
    pub const ALL: [AppView; 3] = [
        AppView::Homepage,
        AppView::DispensaryStats,
        AppView::Comparison,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AppView::Homepage => "homepage",
            AppView::DispensaryStats => "dispensary-stats",
            AppView::Comparison => "comparison",
        }
    }

    pub fn from_name(name: &str) -> Option<AppView> {
        AppView::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// One fully-bound view invocation.
#[derive(Debug, Clone)]
pub enum ViewRequest {
    Homepage,
    DispensaryStats(StatsRequest),
    Comparison(ComparisonRequest),
}

impl ViewRequest {
    pub fn view(&self) -> AppView {
        match self {
            ViewRequest::Homepage => AppView::Homepage,
            ViewRequest::DispensaryStats(_) => AppView::DispensaryStats,
            ViewRequest::Comparison(_) => AppView::Comparison,
        }
    }
}

/// Run a view. Any crate error becomes an error page.
pub fn dispatch(
    model: &SalesModel,
    geocoder: &dyn Geocoder,
    request: &ViewRequest,
) -> ViewModel {
    let result = match request {
        ViewRequest::Homepage => homepage(model),
        ViewRequest::DispensaryStats(r) => report::dispensary_stats(model, r),
        ViewRequest::Comparison(r) => compare::comparison(model, geocoder, r),
    };

    result.unwrap_or_else(|err| {
        tracing::warn!(view = request.view().name(), error = %err, "view failed");
        let mut vm = ViewModel::new("Error");
        vm.push_notice(err.to_string());
        vm
    })
}

/// Landing page: working-set overview and the cities covered.
pub fn homepage(model: &SalesModel) -> Result<ViewModel, DashError> {
    let mut vm = ViewModel::new("Washington State Cannabis Analytics");
    vm.push_text(format!(
        "Analysis and Comparison of {} Dispensaries in the State of Washington.",
        model.licensee_count()
    ));
    vm.push_text(
        "This project provides insight into the performance of cannabis \
         dispensaries across the State of Washington. The dispensary-stats \
         page gives an in-depth look at the sales data of an individual \
         dispensary. The comparison page measures one dispensary against \
         others in the same city or against all dispensaries in the state.",
    );
    vm.push_heading("Locations of Dispensaries Across the State");
    let cities = model.cities()?;
    vm.push_table(TableSpec {
        columns: vec!["city".to_string()],
        rows: cities.into_iter().map(|c| vec![c]).collect(),
    });
    Ok(vm)
}
