//! ViewModel → self-contained HTML page.
//!
//! Text, notices and tables are rendered server-side; chart and map specs
//! are serialized to JSON and handed to plotly.js / Leaflet (CDN) by the
//! embedded dash_page.js binder. Nothing else runs client-side.

use std::fmt::Write as FmtWrite;

use crate::error::DashError;
use crate::view::{Block, ViewModel};

const PAGE_JS: &str = include_str!("dash_page.js");

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const LEAFLET_JS_CDN: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_CSS_CDN: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";

/// Render a full HTML document for one view.
pub fn render_page(vm: &ViewModel) -> Result<String, DashError> {
    let mut body = String::new();
    let mut script = String::new();
    let mut chart_count = 0usize;
    let mut map_count = 0usize;

    writeln!(body, "<h1>{}</h1>", escape_html(&vm.title)).ok();

    for block in &vm.blocks {
        match block {
            Block::Heading { text } => {
                writeln!(body, "<h2>{}</h2>", escape_html(text)).ok();
            }
            Block::Text { text } => {
                writeln!(body, "<p>{}</p>", escape_html(text)).ok();
            }
            Block::Notice { text } => {
                writeln!(body, r#"<p class="notice">{}</p>"#, escape_html(text)).ok();
            }
            Block::Table(table) => {
                body.push_str("<table><thead><tr>");
                for column in &table.columns {
                    write!(body, "<th>{}</th>", escape_html(column)).ok();
                }
                body.push_str("</tr></thead><tbody>");
                for row in &table.rows {
                    body.push_str("<tr>");
                    for cell in row {
                        write!(body, "<td>{}</td>", escape_html(cell)).ok();
                    }
                    body.push_str("</tr>");
                }
                body.push_str("</tbody></table>\n");
            }
            Block::Chart(chart) => {
                let div_id = format!("chart-{chart_count}");
                chart_count += 1;
                writeln!(body, r#"<div id="{div_id}" class="chart"></div>"#).ok();
                writeln!(
                    script,
                    r#"DashPage.renderChart("{div_id}", {});"#,
                    json_payload(chart)?
                )
                .ok();
            }
            Block::Map(map) => {
                let div_id = format!("map-{map_count}");
                map_count += 1;
                writeln!(body, r#"<div id="{div_id}" class="map"></div>"#).ok();
                writeln!(
                    script,
                    r#"DashPage.renderMap("{div_id}", {});"#,
                    json_payload(map)?
                )
                .ok();
            }
        }
    }

    let mut head = String::new();
    if chart_count > 0 {
        writeln!(head, r#"<script src="{PLOTLY_CDN}"></script>"#).ok();
    }
    if map_count > 0 {
        writeln!(head, r#"<link rel="stylesheet" href="{LEAFLET_CSS_CDN}"/>"#).ok();
        writeln!(head, r#"<script src="{LEAFLET_JS_CDN}"></script>"#).ok();
    }

    Ok(format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<title>{title}</title>
{head}<style>
  body {{ font-family: sans-serif; margin: 24px auto; max-width: 960px; color: #212529; }}
  h1 {{ font-size: 24px; }}
  h2 {{ font-size: 18px; margin-top: 28px; }}
  p.notice {{ background: #fff3bf; border: 1px solid #ffd43b; border-radius: 4px; padding: 8px 12px; }}
  table {{ border-collapse: collapse; margin: 12px 0; }}
  th, td {{ border: 1px solid #dee2e6; padding: 4px 10px; font-size: 13px; text-align: left; }}
  th {{ background: #f1f3f5; }}
  .chart {{ width: 100%; height: 420px; margin: 12px 0; }}
  .map {{ width: 100%; height: 420px; margin: 12px 0; border: 1px solid #dee2e6; }}
</style>
</head>
<body>
{body}<script>
{page_js}
{script}</script>
</body>
</html>
"##,
        title = escape_html(&vm.title),
        head = head,
        body = body,
        page_js = PAGE_JS,
        script = script,
    ))
}

/// Serialize a spec for embedding inside a `<script>` element.
fn json_payload<T: serde::Serialize>(value: &T) -> Result<String, DashError> {
    let json = serde_json::to_string(value)
        .map_err(|e| DashError::General(format!("Serializing view payload: {e}")))?;
    // A literal "</script>" inside a string value would end the element early.
    Ok(json.replace("</", "<\\/"))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ChartKind, ChartSeries, ChartSpec, MapMarker, MapSpec};

    fn chart(title: &str) -> ChartSpec {
        ChartSpec {
            kind: ChartKind::Line,
            title: title.to_string(),
            x_title: "Date".to_string(),
            y_title: "Total Sales, USD".to_string(),
            series: vec![ChartSeries {
                name: "Total".to_string(),
                x: vec!["2020-01-01".to_string()],
                y: vec![100.0],
            }],
        }
    }

    #[test]
    fn one_payload_per_chart_block() {
        let mut vm = ViewModel::new("Stats");
        vm.push_chart(chart("a"));
        vm.push_chart(chart("b"));
        let html = render_page(&vm).unwrap();
        assert_eq!(html.matches("DashPage.renderChart(").count(), 2);
        assert!(html.contains(r#"id="chart-0""#));
        assert!(html.contains(r#"id="chart-1""#));
        assert!(html.contains(PLOTLY_CDN));
        // No map on the page, no Leaflet include.
        assert!(!html.contains(LEAFLET_JS_CDN));
    }

    #[test]
    fn map_block_pulls_in_leaflet() {
        let mut vm = ViewModel::new("Comparison");
        vm.push_map(MapSpec {
            markers: vec![MapMarker {
                label: "Emerald Leaf".to_string(),
                latitude: 47.6,
                longitude: -122.3,
                highlighted: true,
            }],
        });
        let html = render_page(&vm).unwrap();
        assert_eq!(html.matches("DashPage.renderMap(").count(), 1);
        assert!(html.contains(LEAFLET_JS_CDN));
        assert!(html.contains(r#""highlighted":true"#));
    }

    #[test]
    fn user_visible_strings_are_escaped() {
        let mut vm = ViewModel::new("<Dash> & Co");
        vm.push_text("a < b & \"c\"");
        let html = render_page(&vm).unwrap();
        assert!(html.contains("&lt;Dash&gt; &amp; Co"));
        assert!(html.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn script_close_sequences_are_defanged() {
        let mut vm = ViewModel::new("t");
        let mut c = chart("</script><script>alert(1)</script>");
        c.series[0].name = "</script>".to_string();
        vm.push_chart(c);
        let html = render_page(&vm).unwrap();
        assert!(!html.contains(r#""name":"</script>"#));
    }
}
