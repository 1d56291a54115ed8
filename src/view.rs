//! Plain-data view models. Each page is a `ViewModel` built by a pure
//! function; widget/chart/map rendering binds to these structures at the
//! boundary only.

use serde::Serialize;

use crate::model::Licensee;
use crate::schema::licensee;

#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Text { text: String },
    Notice { text: String },
    Table(TableSpec),
    Chart(ChartSpec),
    Map(MapSpec),
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSpec {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapSpec {
    pub markers: Vec<MapMarker>,
}

impl ViewModel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push_heading(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Heading { text: text.into() });
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Text { text: text.into() });
    }

    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Notice { text: text.into() });
    }

    pub fn push_table(&mut self, table: TableSpec) {
        self.blocks.push(Block::Table(table));
    }

    pub fn push_chart(&mut self, chart: ChartSpec) {
        self.blocks.push(Block::Chart(chart));
    }

    pub fn push_map(&mut self, map: MapSpec) {
        self.blocks.push(Block::Map(map));
    }

    pub fn charts(&self) -> Vec<&ChartSpec> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Chart(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn maps(&self) -> Vec<&MapSpec> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Map(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// True when any heading/text/notice block contains the needle.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.blocks.iter().any(|b| match b {
            Block::Heading { text } | Block::Text { text } | Block::Notice { text } => {
                text.contains(needle)
            }
            _ => false,
        })
    }
}

/// Directory row of a single licensee, as shown on the stats and
/// comparison pages.
pub fn licensee_table(l: &Licensee) -> TableSpec {
    TableSpec {
        columns: licensee::ALL.iter().map(|c| c.to_string()).collect(),
        rows: vec![vec![
            l.global_id.clone(),
            l.name.clone(),
            l.address1.clone(),
            l.address2.clone(),
            l.city.clone(),
        ]],
    }
}

/// Currency formatting with thousands separators, e.g. `$1,234,567.89`.
pub fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();
    let rem = cents % 100;

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let dollars: String = grouped.chars().rev().collect();

    format!("{}${dollars}.{rem:02}", if negative { "-" } else { "" })
}
