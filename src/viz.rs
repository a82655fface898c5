use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Marker a tool prints for each chart file it writes.
pub const IMAGE_MARKER: &str = "IMAGE_GENERATED:";

/// Opening token of an embedded chart-description JSON blob.
const CHART_JSON_TOKEN: &str = "{\"data\":";

static IMAGE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"IMAGE_GENERATED:\s*([^\s]+\.png)").expect("valid image marker regex")
});

/// A chart artifact attached to one turn's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visualization {
    /// Path to a generated chart image
    Image(String),
    /// Embedded chart-description JSON (legacy path)
    ChartJson(String),
}

impl Visualization {
    /// The string a frontend uses to locate or render the artifact.
    pub fn reference(&self) -> &str {
        match self {
            Self::Image(path) => path,
            Self::ChartJson(json) => json,
        }
    }
}

impl fmt::Display for Visualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference())
    }
}

/// Collect this turn's chart artifacts from a reasoning trace.
///
/// Priority order:
/// 1. image markers in tool results, in trace order (source of truth);
/// 2. image markers in the final answer, appended if not already collected;
/// 3. only when the marker appears nowhere, a legacy chart JSON embedded in
///    the final answer.
///
/// The returned list is freshly built per call, so artifacts can never leak
/// across turns.
pub fn extract_visualizations(trace: &[Message], final_answer: &str) -> Vec<Visualization> {
    let mut found: Vec<Visualization> = Vec::new();
    let mut marker_seen = false;

    for msg in trace {
        if let Some(result) = &msg.tool_result {
            if result.result.contains(IMAGE_MARKER) {
                marker_seen = true;
                for path in image_paths(&result.result) {
                    found.push(Visualization::Image(path));
                }
            }
        }
    }

    if final_answer.contains(IMAGE_MARKER) {
        marker_seen = true;
        for path in image_paths(final_answer) {
            let candidate = Visualization::Image(path);
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        }
    }

    if !marker_seen
        && (final_answer.to_lowercase().contains("plotly")
            || final_answer.contains(CHART_JSON_TOKEN))
    {
        if let Some(json) = extract_chart_json(final_answer) {
            found.push(Visualization::ChartJson(json));
        }
    }

    found
}

fn image_paths(text: &str) -> Vec<String> {
    IMAGE_PATH_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Pull the first embedded chart JSON object out of `text`.
///
/// Scans forward from the first `{"data":` token tracking brace depth to
/// find the matching close, then validates the substring parses as JSON.
pub fn extract_chart_json(text: &str) -> Option<String> {
    let start = text.find(CHART_JSON_TOKEN)?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut end = None;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = Some(start + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let candidate = &text[start..end?];
    serde_json::from_str::<serde_json::Value>(candidate).ok()?;
    Some(candidate.to_string())
}

/// Check a blob has the `{data: [...], layout: {...}}` chart shape.
pub fn is_chart_json(json_str: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(json_str)
        .map(|v| v.get("data").is_some() && v.get("layout").is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_marker_paths_from_tool_results_in_order() {
        let trace = vec![
            Message::user("plot something"),
            Message::tool_result("call_1", "IMAGE_GENERATED: plots/plot_1.png\ndone"),
            Message::tool_result(
                "call_2",
                "other output\nIMAGE_GENERATED: plots/plot_2.png",
            ),
            Message::assistant("Here are your charts."),
        ];
        let viz = extract_visualizations(&trace, "Here are your charts.");
        assert_eq!(
            viz,
            vec![
                Visualization::Image("plots/plot_1.png".to_string()),
                Visualization::Image("plots/plot_2.png".to_string()),
            ]
        );
    }

    #[test]
    fn answer_markers_append_without_duplicating() {
        let trace = vec![Message::tool_result(
            "call_1",
            "IMAGE_GENERATED: plots/plot_1.png",
        )];
        let answer =
            "Saved IMAGE_GENERATED: plots/plot_1.png and IMAGE_GENERATED: plots/plot_3.png";
        let viz = extract_visualizations(&trace, answer);
        assert_eq!(
            viz,
            vec![
                Visualization::Image("plots/plot_1.png".to_string()),
                Visualization::Image("plots/plot_3.png".to_string()),
            ]
        );
    }

    #[test]
    fn answer_marker_alone_is_collected() {
        let viz = extract_visualizations(&[], "IMAGE_GENERATED: plots/plot_123.png");
        assert_eq!(
            viz,
            vec![Visualization::Image("plots/plot_123.png".to_string())]
        );
    }

    #[test]
    fn legacy_json_used_only_when_marker_absent() {
        let answer = r#"Chart: {"data": [{"x": [1, 2]}], "layout": {"title": "t"}}"#;
        let viz = extract_visualizations(&[], answer);
        assert_eq!(viz.len(), 1);
        assert!(matches!(&viz[0], Visualization::ChartJson(json) if is_chart_json(json)));
    }

    #[test]
    fn marker_anywhere_suppresses_legacy_json() {
        let trace = vec![Message::tool_result(
            "call_1",
            "IMAGE_GENERATED: plots/plot_1.png",
        )];
        let answer = r#"{"data": [1], "layout": {}}"#;
        let viz = extract_visualizations(&trace, answer);
        assert_eq!(
            viz,
            vec![Visualization::Image("plots/plot_1.png".to_string())]
        );
    }

    #[test]
    fn brace_scan_handles_nested_objects() {
        let text = r#"prefix {"data": [{"y": {"z": 1}}], "layout": {"a": {"b": 2}}} suffix"#;
        let json = extract_chart_json(text).expect("extract");
        assert!(json.starts_with("{\"data\":"));
        assert!(json.ends_with('}'));
        assert!(is_chart_json(&json));
    }

    #[test]
    fn invalid_json_is_discarded() {
        let text = r#"{"data": [unquoted]}"#;
        assert!(extract_chart_json(text).is_none());
        assert!(extract_visualizations(&[], text).is_empty());
    }

    #[test]
    fn no_artifacts_yields_empty_list() {
        let trace = vec![
            Message::user("average order value"),
            Message::tool_result("call_1", "price_usd\n42.0"),
        ];
        assert!(extract_visualizations(&trace, "The average is 42.").is_empty());
    }

    #[test]
    fn marker_without_png_path_is_ignored_and_suppresses_legacy() {
        let answer = r#"IMAGE_GENERATED: pending {"data": [], "layout": {}}"#;
        assert!(extract_visualizations(&[], answer).is_empty());
    }
}
