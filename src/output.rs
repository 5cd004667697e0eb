use cluster_report_collector::{
    AggregateReport,
    CollectionResult,
    Metrics,
};
use cluster_report_config::{
    OutputFormat,
    OutputSettings,
};
use color_eyre::Result;
use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use eyre::Context as _;
use serde_json::Value;

const DETAIL_WIDTH: usize = 80;

/// Renders `report` in the configured format and writes it to the output file or stdout.
pub async fn emit(report: &AggregateReport, settings: &OutputSettings) -> Result<()> {
    let rendered = render(report, settings.format)?;
    match &settings.file {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .wrap_err_with(|| format!("Failed to write report to {:?}", path))?;
            info!(?path, "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

pub fn render(report: &AggregateReport, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Table => render_table(report),
        OutputFormat::Json => serde_json::to_string_pretty(report).wrap_err("Failed to serialize report as JSON")?,
        OutputFormat::Yaml => serde_yml::to_string(report).wrap_err("Failed to serialize report as YAML")?,
    };
    Ok(rendered)
}

fn render_table(report: &AggregateReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Node").add_attribute(Attribute::Bold),
            Cell::new("Collector").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Duration").add_attribute(Attribute::Bold),
            Cell::new("Detail").add_attribute(Attribute::Bold),
        ]);

    for node in &report.nodes {
        for (index, result) in node.results.iter().enumerate() {
            let node_cell = if index == 0 {
                Cell::new(format!("{}\n{}", node.node, node.host))
            } else {
                Cell::new("")
            };
            let (status, color) = status(result);
            table.add_row(vec![
                node_cell,
                Cell::new(&result.collector),
                Cell::new(status).fg(color),
                Cell::new(format_millis(result.duration().num_milliseconds())),
                Cell::new(detail(result)),
            ]);
        }
    }

    let summary = report.summary();
    format!(
        "{table}\nNodes: {} ok, {} failed │ Results: {} ok, {} failed ({} timed out, {} canceled) │ Took {}",
        summary.nodes_ok,
        summary.nodes_failed,
        summary.results_ok,
        summary.results_failed,
        summary.timed_out,
        summary.canceled,
        format_millis(report.duration().num_milliseconds()),
    )
}

fn status(result: &CollectionResult) -> (&'static str, Color) {
    if result.success {
        ("ok", Color::Green)
    } else if result.is_timeout() {
        ("timeout", Color::Yellow)
    } else if result.is_canceled() {
        ("canceled", Color::Magenta)
    } else {
        ("failed", Color::Red)
    }
}

fn detail(result: &CollectionResult) -> String {
    match (&result.metrics, &result.error) {
        (_, Some(err)) => err.to_string(),
        (Some(metrics), None) => truncate(scalars(metrics), DETAIL_WIDTH),
        (None, None) => String::new(),
    }
}

/// `key=value` pairs of the top level scalar metrics.
fn scalars(metrics: &Metrics) -> String {
    metrics
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some(format!("{key}={s}")),
            Value::Number(n) => Some(format!("{key}={n}")),
            Value::Bool(b) => Some(format!("{key}={b}")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: String, width: usize) -> String {
    if text.chars().count() <= width {
        return text;
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn format_millis(millis: i64) -> String {
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use cluster_report_collector::{
        CollectError,
        NodeReport,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn report() -> AggregateReport {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = at + chrono::Duration::milliseconds(1500);
        let metrics = Metrics::from_iter([
            ("hostname".to_string(), json!("web-1")),
            ("cpu_cores".to_string(), json!(8)),
            ("filesystems".to_string(), json!([])),
        ]);
        AggregateReport {
            started_at: at,
            finished_at: later,
            nodes: vec![
                NodeReport {
                    node: "web-1".to_string(),
                    host: "10.0.0.1".to_string(),
                    success: true,
                    results: vec![CollectionResult::new("web-1", "hardware", Ok(metrics), at, later)],
                },
                NodeReport {
                    node: "web-2".to_string(),
                    host: "10.0.0.2".to_string(),
                    success: false,
                    results: vec![CollectionResult::new(
                        "web-2",
                        "hardware",
                        Err(CollectError::timeout(Duration::from_secs(30))),
                        at,
                        later,
                    )],
                },
            ],
        }
    }

    #[test]
    fn table_lists_every_result() {
        let rendered = render(&report(), OutputFormat::Table).unwrap();
        assert!(rendered.contains("web-2"));
        assert!(rendered.contains("timeout"));
        assert!(rendered.contains("Nodes: 1 ok, 1 failed"));
        assert!(rendered.contains("Took 1.5s"));
    }

    #[test]
    fn details_show_scalars_or_error() {
        let report = report();
        let ok = &report.nodes[0].results[0];
        let timed_out = &report.nodes[1].results[0];
        assert_eq!(detail(ok), "cpu_cores=8, hostname=web-1");
        assert_eq!(detail(timed_out), "timed out after 30000ms");
        assert_eq!(status(ok).0, "ok");
        assert_eq!(status(timed_out).0, "timeout");
    }

    #[test]
    fn json_round_trips() {
        let rendered = render(&report(), OutputFormat::Json).unwrap();
        let parsed: AggregateReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn yaml_keeps_error_kind() {
        let rendered = render(&report(), OutputFormat::Yaml).unwrap();
        assert!(rendered.contains("kind: timeout"));
        assert!(rendered.contains("timeout_ms: 30000"));
    }

    #[test]
    fn truncates_long_details() {
        assert_eq!(truncate("abcdef".to_string(), 4), "abc…");
        assert_eq!(truncate("abc".to_string(), 4), "abc");
        assert_eq!(format_millis(250), "250ms");
    }

    #[tokio::test]
    async fn writes_to_file() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("report.json");
        let settings = OutputSettings {
            format: OutputFormat::Json,
            file: Some(path.clone()),
        };

        emit(&report(), &settings).await.unwrap();

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["nodes"][1]["results"][0]["error"]["kind"], json!("timeout"));
    }
}
