use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

use super::{CompatibilityError, IncompatibleSchema};

/// Outcome of a single compatibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Every name resolved
    Ok,
    /// Non-blocking finding
    Warning(String),
    /// Blocking finding
    Failed(String),
}

impl CheckStatus {
    fn severity(&self) -> Severity {
        match self {
            CheckStatus::Ok => Severity::Good,
            CheckStatus::Warning(_) => Severity::Warn,
            CheckStatus::Failed(_) => Severity::Bad,
        }
    }

    fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok)
    }

    fn is_failed(&self) -> bool {
        matches!(self, CheckStatus::Failed(_))
    }
}

/// One named check and its status
#[derive(Debug, Clone)]
pub struct CompatibilityCheck {
    /// What was checked
    pub name: String,
    /// Result of the check
    pub status: CheckStatus,
}

impl CompatibilityCheck {
    pub(crate) fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
        }
    }

    pub(crate) fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warning(message.into()),
        }
    }

    pub(crate) fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failed(message.into()),
        }
    }

    /// Ok when `names` is empty, otherwise failed with the names listed
    pub(crate) fn from_unknown(name: &str, names: &[String]) -> Self {
        if names.is_empty() {
            Self::ok(name)
        } else {
            Self::failed(name, format!("{} unknown: {}", names.len(), names.join(", ")))
        }
    }
}

/// Everything one compatibility pass found
#[derive(Debug, Clone, Default)]
pub struct CompatibilityReport {
    /// Individual checks in the order they ran
    pub checks: Vec<CompatibilityCheck>,
    /// Name of the dataset that was checked, if any
    pub dataset: Option<String>,
    /// Unresolved names, by bucket
    pub unknown: IncompatibleSchema,
    /// Resolved header markers missing from the declared list
    pub undeclared: Vec<String>,
}

impl CompatibilityReport {
    /// Attach a dataset name used when rendering
    pub fn named(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Add a check result
    pub fn add_check(&mut self, check: CompatibilityCheck) {
        self.checks.push(check);
    }

    /// Whether any check failed
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status.is_failed())
    }

    /// Whether any check produced a warning
    pub fn has_warnings(&self) -> bool {
        self.checks
            .iter()
            .any(|c| matches!(c.status, CheckStatus::Warning(_)))
    }

    /// Number of passing checks
    pub fn success_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_ok()).count()
    }

    /// Number of warnings
    pub fn warning_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| matches!(c.status, CheckStatus::Warning(_)))
            .count()
    }

    /// Number of failed checks
    pub fn failure_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_failed()).count()
    }

    /// Turn the report into the gate verdict: one aggregated error when
    /// anything failed to resolve
    pub fn into_result(self) -> Result<Self, CompatibilityError> {
        if self.unknown.is_empty() {
            Ok(self)
        } else {
            Err(CompatibilityError::Incompatible(self.unknown))
        }
    }

    /// Format the report with colors (requires the `colorized_output` feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            self.render(|text, tone| {
                let styled = style(text);
                match tone {
                    Tone::Heading => styled.bold().cyan().to_string(),
                    Tone::Label => styled.bold().to_string(),
                    Tone::Good => styled.green().to_string(),
                    Tone::Warn => styled.yellow().to_string(),
                    Tone::Bad => styled.red().to_string(),
                    Tone::Verdict(inner) => match inner {
                        Severity::Good => styled.green().bold().to_string(),
                        Severity::Warn => styled.yellow().bold().to_string(),
                        Severity::Bad => styled.red().bold().to_string(),
                    },
                }
            })
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            self.to_string()
        }
    }

    fn verdict(&self) -> (&'static str, Severity) {
        if self.has_failures() {
            ("Compatibility FAILED", Severity::Bad)
        } else if self.has_warnings() {
            ("Compatibility PASSED with warnings", Severity::Warn)
        } else {
            ("Compatibility PASSED", Severity::Good)
        }
    }

    /// Lay out the report, passing every styled fragment through `paint`
    fn render(&self, paint: impl Fn(&str, Tone) -> String) -> String {
        let mut out = format!(
            "{}\n{}\n",
            paint("Compatibility Report", Tone::Heading),
            paint("====================", Tone::Heading)
        );
        if let Some(dataset) = &self.dataset {
            out.push_str(&format!("{}: {}\n", paint("Dataset", Tone::Label), dataset));
        }
        out.push('\n');

        for check in &self.checks {
            let severity = check.status.severity();
            out.push_str(&format!(
                "[{}] {}",
                severity.symbol(),
                paint(&check.name, severity.tone())
            ));
            match &check.status {
                CheckStatus::Ok => {}
                CheckStatus::Warning(msg) | CheckStatus::Failed(msg) => {
                    let tag = match severity {
                        Severity::Warn => "WARNING",
                        _ => "FAILED",
                    };
                    out.push_str(&format!(" - {}: {}", paint(tag, Tone::Verdict(severity)), msg));
                }
            }
            out.push('\n');
        }

        let (verdict, severity) = self.verdict();
        out.push_str(&format!(
            "\n{}: {} passed, {} warnings, {} failed\n\n{}\n",
            paint("Summary", Tone::Label),
            paint(&self.success_count().to_string(), Tone::Good),
            paint(&self.warning_count().to_string(), Tone::Warn),
            paint(&self.failure_count().to_string(), Tone::Bad),
            paint(verdict, Tone::Verdict(severity))
        ));
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Severity {
    Good,
    Warn,
    Bad,
}

impl Severity {
    fn symbol(self) -> &'static str {
        match self {
            Severity::Good => "✓",
            Severity::Warn => "⚠",
            Severity::Bad => "✗",
        }
    }

    fn tone(self) -> Tone {
        match self {
            Severity::Good => Tone::Good,
            Severity::Warn => Tone::Warn,
            Severity::Bad => Tone::Bad,
        }
    }
}

/// How a rendered fragment is styled
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(feature = "colorized_output"), allow(dead_code))]
enum Tone {
    Heading,
    Label,
    Good,
    Warn,
    Bad,
    Verdict(Severity),
}

impl fmt::Display for CompatibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|text, _| text.to_string()))
    }
}
