//! Probe result reporting and formatting.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

use wfs_common::{FeatureTypeDescriptor, ProtocolVersion};

/// What a probe learned about one service.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub version: ProtocolVersion,
    /// Capabilities requests issued to settle the version
    pub attempts: usize,
    pub feature_types: Vec<FeatureTypeDescriptor>,
}

impl ProbeReport {
    /// Format the report as a console table.
    pub fn format_table(&self) -> String {
        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("WFS Probe: {}", self.url)]);

        summary.add_row(vec!["Version:", &self.version.to_string()]);
        summary.add_row(vec!["Requests:", &self.attempts.to_string()]);
        summary.add_row(vec!["Feature Types:", &self.feature_types.len().to_string()]);

        if self.feature_types.is_empty() {
            return summary.to_string();
        }

        let mut catalog = Table::new();
        catalog
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Namespace", "Name", "Title", "Abstract"]);

        for ft in &self.feature_types {
            catalog.add_row(vec![
                ft.namespace.as_deref().unwrap_or("-"),
                ft.name.as_deref().unwrap_or("-"),
                ft.title.as_deref().unwrap_or(""),
                ft.abstract_text.as_deref().unwrap_or(""),
            ]);
        }

        format!("{}\n{}", summary, catalog)
    }

    /// Format the report as JSON.
    pub fn format_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
