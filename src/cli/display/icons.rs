//! Status icons for CLI output

use crate::domain::stack::Severity;

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// No findings
    pub const SUCCESS: &'static str = "✓";

    /// Warnings only
    pub const WARNING: &'static str = "⚠";

    /// At least one error
    pub const ERROR: &'static str = "✗";

    /// Dependency arrow in graph output
    pub const ARROW: &'static str = "→";

    pub fn for_counts(errors: usize, warnings: usize) -> &'static str {
        if errors > 0 {
            Self::ERROR
        } else if warnings > 0 {
            Self::WARNING
        } else {
            Self::SUCCESS
        }
    }

    pub fn status_text(errors: usize, warnings: usize) -> &'static str {
        if errors > 0 {
            "Invalid"
        } else if warnings > 0 {
            "Warnings"
        } else {
            "Valid"
        }
    }

    pub fn for_severity(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => Self::ERROR,
            Severity::Warning => Self::WARNING,
        }
    }
}
