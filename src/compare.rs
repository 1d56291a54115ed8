//! Peer comparison: selects a peer group (statewide or same-city), computes
//! the peer average over the full date range, and builds the comparison
//! page with per-period-average charts and an optional map of local peers.

use crate::error::DashError;
use crate::geocode::Geocoder;
use crate::model::{Licensee, SalesCategory, SalesModel};
use crate::resample::{resample, summarize, Period};
use crate::view::{
    licensee_table, ChartKind, ChartSeries, ChartSpec, MapMarker, MapSpec, ViewModel,
};

/// Which dispensaries the selected one is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Statewide,
    Local,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Statewide => "Statewide",
            Scope::Local => "Local (Same City)",
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "statewide" => Ok(Scope::Statewide),
            "local" => Ok(Scope::Local),
            other => Err(DashError::InvalidData(format!(
                "Unknown scope: '{other}'. Expected statewide or local"
            ))),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub dispensary_id: String,
    pub period: Period,
    pub scope: Scope,
}

/// Full-range totals feeding the percentage-difference statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub selected: f64,
    pub peer_average: f64,
}

impl ComparisonResult {
    pub fn percentage_difference(&self) -> f64 {
        (self.selected - self.peer_average) / self.peer_average * 100.0
    }

    /// Direction is carried by wording; the figure is always absolute.
    pub fn describe(&self, name: &str, peer_phrase: &str) -> String {
        let pct = self.percentage_difference();
        if pct >= 0.0 {
            format!("{name} performed {pct:.2}% better than the average {peer_phrase}.")
        } else {
            format!(
                "{name} performed {:.2}% worse than the average {peer_phrase}.",
                pct.abs()
            )
        }
    }
}

/// Every other dispensary in scope. Always excludes the selected one.
pub fn peer_group(
    model: &SalesModel,
    selected: &Licensee,
    scope: Scope,
) -> Result<Vec<Licensee>, DashError> {
    let candidates = match scope {
        Scope::Statewide => model.licensee_list()?,
        Scope::Local => model.licensees_in_city(&selected.city)?,
    };
    Ok(candidates
        .into_iter()
        .filter(|l| l.global_id != selected.global_id)
        .collect())
}

/// Sum of a dispensary's qualifying (> 0) total sales over the entire
/// available date range.
pub fn lifetime_total(model: &SalesModel, global_id: &str) -> Result<f64, DashError> {
    let series = model.series(SalesCategory::Total, global_id)?;
    let column = series.column(global_id)?.as_materialized_series();
    let val = column.sum_reduce()?;
    Ok(val.value().try_extract::<f64>().unwrap_or(0.0))
}

/// None when the peer group is empty or its average is zero; no division
/// takes place in either case.
pub fn compare_against_peers(
    model: &SalesModel,
    selected_id: &str,
    peers: &[Licensee],
) -> Result<Option<ComparisonResult>, DashError> {
    if peers.is_empty() {
        return Ok(None);
    }
    let mut sum = 0.0;
    for peer in peers {
        sum += lifetime_total(model, &peer.global_id)?;
    }
    let peer_average = sum / peers.len() as f64;
    if peer_average <= 0.0 {
        return Ok(None);
    }
    Ok(Some(ComparisonResult {
        selected: lifetime_total(model, selected_id)?,
        peer_average,
    }))
}

/// Mean per-bucket value of a dispensary's resampled series, or None when
/// it has no qualifying rows.
pub fn per_period_average(
    model: &SalesModel,
    category: SalesCategory,
    global_id: &str,
    period: Period,
) -> Result<Option<f64>, DashError> {
    let series = model.series(category, global_id)?;
    let aggregate = resample(&series, global_id, period)?;
    Ok(summarize(&aggregate, global_id)?.map(|s| s.mean))
}

pub fn comparison(
    model: &SalesModel,
    geocoder: &dyn Geocoder,
    request: &ComparisonRequest,
) -> Result<ViewModel, DashError> {
    let selected = model.licensee(&request.dispensary_id)?;
    let mut vm = ViewModel::new("Dispensary Comparison");
    vm.push_table(licensee_table(&selected));

    let (scope_sentence, peer_phrase) = match request.scope {
        Scope::Statewide => (
            format!(
                "Comparison of {} ({}) Performance Against All Dispensaries in the State",
                selected.name, selected.global_id
            ),
            "dispensary in the state".to_string(),
        ),
        Scope::Local => (
            format!(
                "Comparison of {} ({}) Performance Against All Dispensaries in {}",
                selected.name, selected.global_id, selected.city
            ),
            format!("dispensary in {}", selected.city),
        ),
    };
    vm.push_text(scope_sentence);

    // Guards run before any averaging or geocoding.
    let peers = peer_group(model, &selected, request.scope)?;
    if peers.is_empty() {
        match request.scope {
            Scope::Local => vm.push_notice(format!(
                "{} is the only dispensary in {}. Switch the comparison scope to \
                 Statewide to compare against other dispensaries.",
                selected.name, selected.city
            )),
            Scope::Statewide => {
                vm.push_notice("No other dispensaries available for comparison.")
            }
        }
        return Ok(vm);
    }

    match compare_against_peers(model, &selected.global_id, &peers)? {
        Some(result) => vm.push_text(result.describe(&selected.name, &peer_phrase)),
        None => vm.push_notice(
            "No comparison possible: the peer group has no recorded sales.",
        ),
    }

    vm.push_heading(format!("Average {} Sales Comparison", request.period.label()));
    for category in SalesCategory::ALL {
        if let Some(chart) =
            comparison_chart(model, &selected, &peers, category, request.period)?
        {
            vm.push_chart(chart);
        }
    }

    if request.scope == Scope::Local {
        vm.push_heading(format!("Dispensary Locations in {}", selected.city));
        let map = build_map(geocoder, &selected, &peers);
        if map.markers.is_empty() {
            vm.push_notice("No dispensary locations could be geocoded.");
        } else {
            vm.push_map(map);
        }
    }

    Ok(vm)
}

/// Bar chart of per-period averages: one bar for the selected dispensary,
/// one per peer with data. None when nobody has qualifying rows.
fn comparison_chart(
    model: &SalesModel,
    selected: &Licensee,
    peers: &[Licensee],
    category: SalesCategory,
    period: Period,
) -> Result<Option<ChartSpec>, DashError> {
    let selected_avg =
        per_period_average(model, category, &selected.global_id, period)?;

    let mut peer_x = Vec::new();
    let mut peer_y = Vec::new();
    for peer in peers {
        match per_period_average(model, category, &peer.global_id, period) {
            Ok(Some(avg)) => {
                peer_x.push(peer.name.clone());
                peer_y.push(avg);
            }
            Ok(None) => {}
            Err(DashError::MissingDispensary(id)) => {
                tracing::warn!(dispensary = %id, "peer absent from sales data, skipped");
            }
            Err(err) => return Err(err),
        }
    }

    if selected_avg.is_none() && peer_y.is_empty() {
        return Ok(None);
    }

    let mut series = Vec::new();
    if let Some(avg) = selected_avg {
        series.push(ChartSeries {
            name: selected.name.clone(),
            x: vec![selected.name.clone()],
            y: vec![avg],
        });
    }
    if !peer_y.is_empty() {
        series.push(ChartSeries {
            name: "Peers".to_string(),
            x: peer_x,
            y: peer_y,
        });
    }

    Ok(Some(ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Average {} {} Sales", period.label(), category.label()),
        x_title: "Dispensary".to_string(),
        y_title: "Total Sales, USD".to_string(),
        series,
    }))
}

fn build_map(geocoder: &dyn Geocoder, selected: &Licensee, peers: &[Licensee]) -> MapSpec {
    let mut markers = Vec::new();
    push_marker(&mut markers, geocoder, selected, true);
    for peer in peers {
        push_marker(&mut markers, geocoder, peer, false);
    }
    MapSpec { markers }
}

/// A failed or empty lookup drops the marker; it never fails the view.
fn push_marker(
    markers: &mut Vec<MapMarker>,
    geocoder: &dyn Geocoder,
    licensee: &Licensee,
    highlighted: bool,
) {
    let address = format!("{}, {}", licensee.address1, licensee.city);
    match geocoder.lookup(&address) {
        Ok(Some(coords)) => markers.push(MapMarker {
            label: licensee.name.clone(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            highlighted,
        }),
        Ok(None) => {
            tracing::warn!(dispensary = %licensee.global_id, %address, "address not found");
        }
        Err(err) => {
            tracing::warn!(
                dispensary = %licensee.global_id,
                %address,
                error = %err,
                "geocode lookup failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn percentage_sign_rule() {
        let better = ComparisonResult {
            selected: 120.0,
            peer_average: 100.0,
        };
        assert!((better.percentage_difference() - 20.0).abs() < 1e-9);
        assert_eq!(
            better.describe("Emerald Leaf", "dispensary in Seattle"),
            "Emerald Leaf performed 20.00% better than the average dispensary in Seattle."
        );

        let worse = ComparisonResult {
            selected: 80.0,
            peer_average: 100.0,
        };
        assert_eq!(
            worse.describe("Emerald Leaf", "dispensary in Seattle"),
            "Emerald Leaf performed 20.00% worse than the average dispensary in Seattle."
        );
    }

    #[test]
    fn local_peer_group_excludes_self() {
        let (_dir, model) = fixtures::model();
        let selected = model.licensee("disp-001").unwrap();
        let peers = peer_group(&model, &selected, Scope::Local).unwrap();
        let ids: Vec<&str> = peers.iter().map(|l| l.global_id.as_str()).collect();
        assert_eq!(ids, vec!["disp-002", "disp-003"]);
    }

    #[test]
    fn statewide_peer_group_is_everyone_else() {
        let (_dir, model) = fixtures::model();
        let selected = model.licensee("disp-001").unwrap();
        let peers = peer_group(&model, &selected, Scope::Statewide).unwrap();
        assert_eq!(peers.len(), 5);
        assert!(peers.iter().all(|l| l.global_id != "disp-001"));
    }

    #[test]
    fn zero_peer_average_is_not_comparable() {
        let (_dir, model) = fixtures::model();
        // disp-005's only Tacoma peer never sold anything.
        let selected = model.licensee("disp-005").unwrap();
        let peers = peer_group(&model, &selected, Scope::Local).unwrap();
        assert_eq!(peers.len(), 1);
        let result = compare_against_peers(&model, "disp-005", &peers).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn lifetime_total_sums_qualifying_rows() {
        let (_dir, model) = fixtures::model();
        assert!((lifetime_total(&model, "disp-001").unwrap() - 350.0).abs() < 1e-9);
        assert!((lifetime_total(&model, "disp-003").unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn local_comparison_arithmetic() {
        let (_dir, model) = fixtures::model();
        // Seattle peers of disp-001: disp-002 (100.0) and disp-003 (0.0).
        let selected = model.licensee("disp-001").unwrap();
        let peers = peer_group(&model, &selected, Scope::Local).unwrap();
        let result = compare_against_peers(&model, "disp-001", &peers)
            .unwrap()
            .unwrap();
        assert!((result.peer_average - 50.0).abs() < 1e-9);
        assert!((result.selected - 350.0).abs() < 1e-9);
        assert!((result.percentage_difference() - 600.0).abs() < 1e-9);
    }
}
