//! Color theme for CLI output

use crate::domain::stack::Severity;
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Color of a stack row from its finding counts
    pub fn status_color(&self, errors: usize, warnings: usize) -> TableColor {
        if errors > 0 {
            self.error
        } else if warnings > 0 {
            self.warning
        } else {
            self.success
        }
    }

    pub fn severity_color(&self, severity: Severity) -> TableColor {
        match severity {
            Severity::Error => self.error,
            Severity::Warning => self.warning,
        }
    }
}
