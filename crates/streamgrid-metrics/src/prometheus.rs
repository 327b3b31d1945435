//! Prometheus text exposition format.
//!
//! Renders every counter vector in a registry into the text exposition
//! format for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::counters::Registry;

/// Render all registered counter vectors into Prometheus text format.
pub fn render_prometheus(registry: &Registry) -> String {
    let mut out = String::new();

    for vec in registry.gather() {
        let _ = writeln!(out, "# HELP {} {}", vec.name, vec.help);
        let _ = writeln!(out, "# TYPE {} counter", vec.name);
        for (labels, value) in vec.samples() {
            let rendered: Vec<String> = vec
                .label_names
                .iter()
                .zip(labels.iter())
                .map(|(name, value)| format!("{name}=\"{}\"", escape_label(value)))
                .collect();
            let _ = writeln!(out, "{}{{{}}} {}", vec.name, rendered.join(","), value);
        }
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_registry() {
        let registry = Registry::new();
        assert_eq!(render_prometheus(&registry), "");
    }

    #[test]
    fn render_counter_vec() {
        let registry = Registry::new();
        let vec = registry.counter_vec(
            "sinks_total",
            "Total number of messages per sink.",
            &["sinkName", "replica"],
        );
        vec.with_label_values(&["out", "0"]).add(3);

        let output = render_prometheus(&registry);
        assert!(output.contains("# HELP sinks_total Total number of messages per sink."));
        assert!(output.contains("# TYPE sinks_total counter"));
        assert!(output.contains("sinks_total{sinkName=\"out\",replica=\"0\"} 3"));
    }

    #[test]
    fn render_format_has_labels_on_every_sample() {
        let registry = Registry::new();
        let vec = registry.counter_vec("log_messages_total", "Log records by level.", &["level"]);
        vec.with_label_values(&["info"]).inc();
        vec.with_label_values(&["error"]).inc();

        for line in render_prometheus(&registry).lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(
                line.contains('{') && line.contains('}'),
                "line should have labels: {line}"
            );
        }
    }

    #[test]
    fn label_values_are_escaped() {
        let registry = Registry::new();
        let vec = registry.counter_vec("z_total", "", &["l"]);
        vec.with_label_values(&["a\"b"]).inc();
        assert!(render_prometheus(&registry).contains("l=\"a\\\"b\""));
    }
}
