//! Turns a tool result into a provider-agnostic response for any front end.
//!
//! Only hints and shaped data are produced here; drawing the table, chart or
//! map is left to the presentation layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::RawResult;
use crate::verify::VerificationResult;

/// Widget families a front end may render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Table,
    Chart,
    Map,
}

/// Which widgets fit a tool's output. Empty means plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualHint {
    pub table: bool,
    pub chart: bool,
    pub map: bool,
}

impl VisualHint {
    pub const NONE: VisualHint = VisualHint {
        table: false,
        chart: false,
        map: false,
    };
    pub const CHART_MAP: VisualHint = VisualHint {
        table: false,
        chart: true,
        map: true,
    };
    pub const TABLE_CHART: VisualHint = VisualHint {
        table: true,
        chart: true,
        map: false,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn widgets(&self) -> Vec<Widget> {
        let mut out = Vec::new();
        if self.table {
            out.push(Widget::Table);
        }
        if self.chart {
            out.push(Widget::Chart);
        }
        if self.map {
            out.push(Widget::Map);
        }
        out
    }
}

impl fmt::Display for VisualHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widgets = self.widgets();
        if widgets.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = widgets
            .iter()
            .map(|w| match w {
                Widget::Table => "table",
                Widget::Chart => "chart",
                Widget::Map => "map",
            })
            .collect();
        f.write_str(&names.join("+"))
    }
}

/// Ordered, homogeneous records: every row has one cell per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericField {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Payload reshaped for the widgets named by the hint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayData {
    pub table: Option<Table>,
    pub series: Vec<NumericField>,
    pub location: Option<MapPoint>,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub text_answer: String,
    pub tool_name: Option<String>,
    pub raw_tool_payload: Option<Value>,
    pub visual_hint: VisualHint,
    pub display: DisplayData,
    pub verification: VerificationResult,
}

/// Chart fields for weather payloads, in display order
const WEATHER_SERIES: &[&str] = &["temp", "feels_like", "min", "max"];
const ITEM_KEYS: &[&str] = &["posts", "results", "items", "hits"];
const LABEL_KEYS: &[&str] = &["title", "name", "id"];
const VALUE_KEYS: &[&str] = &["score", "value", "count"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fixed, total mapping from tool name to hint. Unmapped names fall back to none.
    pub fn hint_for(&self, tool_name: Option<&str>) -> VisualHint {
        match tool_name {
            Some("weather") | Some("weather_forecaster") => VisualHint::CHART_MAP,
            Some("forum") | Some("reddit") | Some("reddit_scrapper") => VisualHint::TABLE_CHART,
            Some("search") | Some("search_tool") => VisualHint::NONE,
            Some("scrape") | Some("scrape_tool") => VisualHint::NONE,
            Some("calculator") | Some("basic_calculator") => VisualHint::NONE,
            _ => VisualHint::NONE,
        }
    }

    pub fn normalize(
        &self,
        tool_name: Option<&str>,
        raw_result: Option<&RawResult>,
        text_answer: String,
        verification: VerificationResult,
    ) -> StructuredResponse {
        let visual_hint = self.hint_for(tool_name);
        let payload = raw_result.and_then(RawResult::payload).cloned();
        let display = payload
            .as_ref()
            .map(|p| shape(visual_hint, p))
            .unwrap_or_default();

        StructuredResponse {
            text_answer,
            tool_name: tool_name.map(str::to_string),
            raw_tool_payload: payload,
            visual_hint,
            display,
            verification,
        }
    }
}

fn shape(hint: VisualHint, payload: &Value) -> DisplayData {
    let items = items_of(payload);
    let table = if hint.table { to_table(&items) } else { None };
    let series = if !hint.chart {
        Vec::new()
    } else if hint.table {
        record_series(&items)
    } else {
        field_series(payload)
    };
    let location = if hint.map { map_point(payload) } else { None };

    DisplayData {
        table,
        series,
        location,
        citations: citations(&items),
    }
}

fn items_of(payload: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let list = match payload {
        Value::Array(a) => Some(a),
        Value::Object(o) => ITEM_KEYS
            .iter()
            .find_map(|k| o.get(*k).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|a| a.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn to_table(items: &[&serde_json::Map<String, Value>]) -> Option<Table> {
    if items.is_empty() {
        return None;
    }
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        for k in item.keys() {
            if !columns.contains(k) {
                columns.push(k.clone());
            }
        }
    }
    let rows = items
        .iter()
        .map(|item| {
            columns
                .iter()
                .map(|c| item.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Some(Table { columns, rows })
}

/// One bar per record: label from title/name, value from score-like field
fn record_series(items: &[&serde_json::Map<String, Value>]) -> Vec<NumericField> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let value = VALUE_KEYS
                .iter()
                .find_map(|k| item.get(*k).and_then(Value::as_f64))?;
            let name = LABEL_KEYS
                .iter()
                .find_map(|k| item.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", i + 1));
            Some(NumericField { name, value })
        })
        .collect()
}

/// Named numeric fields of a flat payload
fn field_series(payload: &Value) -> Vec<NumericField> {
    let Some(obj) = payload.as_object() else {
        return Vec::new();
    };
    let preferred: Vec<NumericField> = WEATHER_SERIES
        .iter()
        .filter_map(|k| {
            obj.get(*k).and_then(Value::as_f64).map(|value| NumericField {
                name: k.to_string(),
                value,
            })
        })
        .collect();
    if !preferred.is_empty() {
        return preferred;
    }
    obj.iter()
        .filter(|(k, _)| k.as_str() != "latitude" && k.as_str() != "longitude")
        .filter_map(|(k, v)| {
            v.as_f64().map(|value| NumericField {
                name: k.clone(),
                value,
            })
        })
        .collect()
}

fn map_point(payload: &Value) -> Option<MapPoint> {
    let latitude = payload.get("latitude").and_then(Value::as_f64)?;
    let longitude = payload.get("longitude").and_then(Value::as_f64)?;
    let label = payload
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(MapPoint {
        label,
        latitude,
        longitude,
    })
}

fn citations(items: &[&serde_json::Map<String, Value>]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if let Some(url) = item.get("url").and_then(Value::as_str) {
            if !url.is_empty() && !out.iter().any(|u| u == url) {
                out.push(url.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hint_mapping_is_total() {
        let n = ResponseNormalizer::new();
        assert_eq!(n.hint_for(Some("weather")), VisualHint::CHART_MAP);
        assert_eq!(n.hint_for(Some("forum")), VisualHint::TABLE_CHART);
        assert_eq!(n.hint_for(Some("reddit")), VisualHint::TABLE_CHART);
        assert!(n.hint_for(Some("search")).is_none());
        assert!(n.hint_for(Some("scrape")).is_none());
        assert!(n.hint_for(Some("calculator")).is_none());
        assert!(n.hint_for(None).is_none());
        assert!(n.hint_for(Some("never-registered")).is_none());
    }

    #[test]
    fn hint_display_names_widgets() {
        assert_eq!(VisualHint::CHART_MAP.to_string(), "chart+map");
        assert_eq!(VisualHint::TABLE_CHART.to_string(), "table+chart");
        assert_eq!(VisualHint::NONE.to_string(), "none");
    }

    #[test]
    fn weather_payload_becomes_series_and_map() {
        let raw = RawResult::success(json!({
            "location": "Tokyo", "latitude": 35.68, "longitude": 139.69,
            "temp": 22.0, "feels_like": 21.0, "min": 18.0, "max": 25.0, "humidity": 60
        }));
        let r = ResponseNormalizer::new().normalize(
            Some("weather"),
            Some(&raw),
            "Mild".into(),
            VerificationResult::clean(),
        );
        let names: Vec<&str> = r.display.series.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["temp", "feels_like", "min", "max"]);
        assert_eq!(r.display.location.unwrap().label, "Tokyo");
        assert!(r.display.table.is_none());
    }

    #[test]
    fn forum_posts_become_homogeneous_rows() {
        let raw = RawResult::success(json!({"posts": [
            {"title": "A", "score": 10, "body": "x"},
            {"title": "B", "score": 3}
        ]}));
        let r = ResponseNormalizer::new().normalize(
            Some("forum"),
            Some(&raw),
            String::new(),
            VerificationResult::clean(),
        );
        let table = r.display.table.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|row| row.len() == table.columns.len()));
        let body_col = table.columns.iter().position(|c| c == "body").unwrap();
        assert_eq!(table.rows[1][body_col], Value::Null);
        assert_eq!(r.display.series[0].name, "A");
        assert_eq!(r.display.series[0].value, 10.0);
    }

    #[test]
    fn failed_result_keeps_hint_without_data() {
        let raw = RawResult::failure("timeout");
        let r = ResponseNormalizer::new().normalize(
            Some("forum"),
            Some(&raw),
            "failed".into(),
            VerificationResult::clean(),
        );
        assert_eq!(r.visual_hint, VisualHint::TABLE_CHART);
        assert!(r.raw_tool_payload.is_none());
        assert_eq!(r.display, DisplayData::default());
    }

    #[test]
    fn search_results_yield_citations() {
        let raw = RawResult::success(json!({"results": [
            {"title": "a", "url": "https://a.example"},
            {"title": "b", "url": "https://a.example"},
            {"title": "c", "url": "https://c.example"}
        ]}));
        let r = ResponseNormalizer::new().normalize(
            Some("search"),
            Some(&raw),
            String::new(),
            VerificationResult::clean(),
        );
        assert_eq!(r.display.citations, vec!["https://a.example", "https://c.example"]);
    }
}
