use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    MissingSection,
    MalformedCredit,
    UnexpectedYearShape,
    PositionalFallback,
    FetchFailed,
    CircuitOpen,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingSection => "missing_section",
            Self::MalformedCredit => "malformed_credit",
            Self::UnexpectedYearShape => "unexpected_year_shape",
            Self::PositionalFallback => "positional_fallback",
            Self::FetchFailed => "fetch_failed",
            Self::CircuitOpen => "circuit_open",
        };
        f.write_str(s)
    }
}

/// A non-fatal note attached to a degraded but continuing extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub title_id: String,
    pub kind: DiagnosticKind,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn record(&mut self, title_id: &str, kind: DiagnosticKind, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(title_id, kind = %kind, "{}", detail);
        self.entries.push(Diagnostic {
            title_id: title_id.to_string(),
            kind,
            detail,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn histogram(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_by_kind() {
        let mut d = Diagnostics::new();
        d.record("tt1", DiagnosticKind::MissingSection, "no production block");
        d.record("tt2", DiagnosticKind::MissingSection, "no distributors block");
        d.record("tt2", DiagnosticKind::MalformedCredit, "no country");

        let h = d.histogram();
        assert_eq!(h[&DiagnosticKind::MissingSection], 2);
        assert_eq!(h[&DiagnosticKind::MalformedCredit], 1);
        assert!(!h.contains_key(&DiagnosticKind::FetchFailed));
    }

    #[test]
    fn extend_merges_entries() {
        let mut a = Diagnostics::new();
        let mut b = Diagnostics::new();
        b.record("tt9", DiagnosticKind::CircuitOpen, "skipped");
        a.extend(b);
        assert!(a.has(DiagnosticKind::CircuitOpen));
        assert_eq!(a.entries()[0].title_id, "tt9");
    }
}
