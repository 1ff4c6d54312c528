//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::stack::ValidationReport;
use crate::infrastructure::assembly::Manifest;
use crate::infrastructure::cloudformation::SynthesizedStack;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Stack information for list display
#[derive(Debug, Clone)]
pub struct StackInfo {
    pub name: String,
    pub region: String,
    pub resources: usize,
    pub outputs: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    fn table(&self, header: Vec<Cell>) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        table
    }

    /// Render declared stacks as a formatted table
    pub fn render_stacks_list(&self, stacks: &[StackInfo]) -> String {
        if stacks.is_empty() {
            return "No stacks declared".to_string();
        }

        let mut table = self.table(vec![
            Cell::new("STACK").set_alignment(CellAlignment::Left),
            Cell::new("REGION").set_alignment(CellAlignment::Left),
            Cell::new("RESOURCES").set_alignment(CellAlignment::Right),
            Cell::new("OUTPUTS").set_alignment(CellAlignment::Right),
            Cell::new("STATUS").set_alignment(CellAlignment::Center),
        ]);

        for stack in stacks {
            let icon = StatusIcon::for_counts(stack.errors, stack.warnings);
            let status = StatusIcon::status_text(stack.errors, stack.warnings);
            table.add_row(vec![
                Cell::new(&stack.name),
                Cell::new(&stack.region).fg(self.theme.info),
                Cell::new(stack.resources).set_alignment(CellAlignment::Right),
                Cell::new(stack.outputs).set_alignment(CellAlignment::Right),
                Cell::new(format!("{} {}", icon, status))
                    .fg(self.theme.status_color(stack.errors, stack.warnings)),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Stacks {} ─╮\n",
            format!("[{} stacks]", stacks.len()).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Valid  {} Warnings  {} Invalid\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }

    /// Render the findings of one validation run
    pub fn render_findings(&self, report: &ValidationReport) -> String {
        let errors = report.errors().count();
        let warnings = report.warnings().count();
        let summary = format!(
            "{} {}: {} error(s), {} warning(s)",
            StatusIcon::for_counts(errors, warnings),
            report.stack,
            errors,
            warnings
        );
        if report.findings.is_empty() {
            return format!("{}\n", summary.green());
        }

        let mut table = self.table(vec![
            Cell::new("SEVERITY").set_alignment(CellAlignment::Center),
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("MESSAGE").set_alignment(CellAlignment::Left),
        ]);
        let mut findings: Vec<_> = report.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in findings {
            table.add_row(vec![
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::for_severity(finding.severity),
                    finding.severity
                ))
                .fg(self.theme.severity_color(finding.severity)),
                Cell::new(&finding.resource),
                Cell::new(&finding.message),
            ]);
        }

        format!("{}\n{}\n", summary, table)
    }

    /// Render what a synth run wrote
    pub fn render_synth_summary(&self, manifest: &Manifest, location: &str) -> String {
        let mut table = self.table(vec![
            Cell::new("STACK").set_alignment(CellAlignment::Left),
            Cell::new("REGION").set_alignment(CellAlignment::Left),
            Cell::new("TEMPLATE").set_alignment(CellAlignment::Left),
            Cell::new("RESOURCES").set_alignment(CellAlignment::Right),
            Cell::new("OUTPUTS").set_alignment(CellAlignment::Left),
        ]);
        for entry in &manifest.stacks {
            table.add_row(vec![
                Cell::new(&entry.stack_name),
                Cell::new(&entry.region).fg(self.theme.info),
                Cell::new(&entry.template_file),
                Cell::new(entry.resource_count).set_alignment(CellAlignment::Right),
                Cell::new(entry.outputs.join(", ")).fg(self.theme.muted),
            ]);
        }
        format!(
            "{} Cloud assembly written to {}\n{}\n",
            StatusIcon::SUCCESS.green(),
            location,
            table
        )
    }

    /// Render creation order with each resource's dependencies
    pub fn render_graph(&self, synthesized: &SynthesizedStack) -> String {
        let mut table = self.table(vec![
            Cell::new("#").set_alignment(CellAlignment::Right),
            Cell::new("RESOURCE").set_alignment(CellAlignment::Left),
            Cell::new("TYPE").set_alignment(CellAlignment::Left),
            Cell::new(format!("DEPENDS ON {}", StatusIcon::ARROW)).set_alignment(CellAlignment::Left),
        ]);
        for (i, id) in synthesized.order.iter().enumerate() {
            let resource_type = synthesized.template["Resources"][id.as_str()]["Type"]
                .as_str()
                .unwrap_or_default();
            let dependencies: Vec<&str> = synthesized
                .dependencies_of(id)
                .into_iter()
                .map(|d| d.as_str())
                .collect();
            table.add_row(vec![
                Cell::new(i + 1).set_alignment(CellAlignment::Right),
                Cell::new(id.as_str()),
                Cell::new(resource_type).fg(self.theme.muted),
                Cell::new(dependencies.join("\n")),
            ]);
        }
        format!(
            "╭─ {} {} ─╮\n{}\n",
            synthesized.stack_name,
            format!(
                "[{} resources, {} edges]",
                synthesized.order.len(),
                synthesized.edges.len()
            )
            .bright_black(),
            table
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::{Finding, Severity};

    #[test]
    fn test_render_empty_stacks() {
        let renderer = TableRenderer::new();
        let output = renderer.render_stacks_list(&[]);
        assert!(output.contains("No stacks declared"));
    }

    #[test]
    fn test_render_single_stack() {
        let renderer = TableRenderer::new();
        let stacks = vec![StackInfo {
            name: "RegionalDatabaseStack".to_string(),
            region: "me-south-1".to_string(),
            resources: 12,
            outputs: 2,
            errors: 0,
            warnings: 1,
        }];

        let output = renderer.render_stacks_list(&stacks);
        assert!(output.contains("RegionalDatabaseStack"));
        assert!(output.contains("me-south-1"));
        assert!(output.contains("Warnings"));
    }

    #[test]
    fn test_render_findings() {
        let renderer = TableRenderer::new();
        let report = ValidationReport {
            stack: "Demo".to_string(),
            findings: vec![Finding {
                severity: Severity::Error,
                resource: "WebTierASG".to_string(),
                message: "capacity out of order".to_string(),
            }],
        };
        let output = renderer.render_findings(&report);
        assert!(output.contains("1 error(s)"));
        assert!(output.contains("WebTierASG"));
    }
}
