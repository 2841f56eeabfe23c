use lsp_types::{Diagnostic, DiagnosticSeverity};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::constants::panel as panel_consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProblemFilter {
    #[default]
    All,
    Errors,
    Warnings,
}

impl ProblemFilter {
    fn accepts(&self, diagnostic: &Diagnostic) -> bool {
        match self {
            ProblemFilter::All => true,
            ProblemFilter::Errors => diagnostic.severity == Some(DiagnosticSeverity::ERROR),
            ProblemFilter::Warnings => diagnostic.severity == Some(DiagnosticSeverity::WARNING),
        }
    }
}

/// Diagnostics for one file, as listed in the Problems tab.
#[derive(Debug, Clone)]
pub struct ProblemGroup<'a> {
    pub path: &'a Path,
    pub file_name: String,
    /// The two folders directly above the file, for disambiguation.
    pub relative_path: String,
    pub expanded: bool,
    pub problems: Vec<&'a Diagnostic>,
}

impl ProblemGroup<'_> {
    pub fn error_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|d| d.severity == Some(DiagnosticSeverity::ERROR))
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|d| d.severity == Some(DiagnosticSeverity::WARNING))
            .count()
    }
}

#[derive(Debug, Default)]
pub struct ProblemsView {
    diagnostics: BTreeMap<PathBuf, Vec<Diagnostic>>,
    filter: ProblemFilter,
    expanded: HashSet<PathBuf>,
    auto_expanded: bool,
}

impl ProblemsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_diagnostics(&mut self, path: PathBuf, diags: Vec<Diagnostic>) {
        if diags.is_empty() {
            self.diagnostics.remove(&path);
            self.expanded.remove(&path);
        } else {
            self.diagnostics.insert(path, diags);
        }
        self.auto_expand();
    }

    /// Replace every file's diagnostics at once, e.g. after a workspace scan.
    pub fn replace_all(&mut self, diagnostics: impl IntoIterator<Item = (PathBuf, Vec<Diagnostic>)>) {
        self.diagnostics = diagnostics
            .into_iter()
            .filter(|(_, diags)| !diags.is_empty())
            .collect();
        self.expanded.retain(|path| self.diagnostics.contains_key(path));
        self.auto_expand();
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.expanded.clear();
    }

    pub fn filter(&self) -> ProblemFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ProblemFilter) {
        self.filter = filter;
    }

    pub fn total(&self) -> usize {
        self.diagnostics.values().map(Vec::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.count_where(|s| s == Some(DiagnosticSeverity::ERROR))
    }

    pub fn warning_count(&self) -> usize {
        self.count_where(|s| s == Some(DiagnosticSeverity::WARNING))
    }

    pub fn info_count(&self) -> usize {
        self.count_where(|s| {
            s == Some(DiagnosticSeverity::INFORMATION) || s == Some(DiagnosticSeverity::HINT)
        })
    }

    /// Tab badge: errors plus warnings.
    pub fn badge(&self) -> usize {
        self.error_count() + self.warning_count()
    }

    fn count_where(&self, pred: impl Fn(Option<DiagnosticSeverity>) -> bool) -> usize {
        self.diagnostics
            .values()
            .flatten()
            .filter(|d| pred(d.severity))
            .count()
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(path)
    }

    pub fn toggle_file(&mut self, path: &Path) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_path_buf());
        }
    }

    /// Only the first time problems show up; afterwards the user decides.
    fn auto_expand(&mut self) {
        if self.auto_expanded || self.diagnostics.is_empty() {
            return;
        }
        self.auto_expanded = true;
        self.expanded.extend(
            self.diagnostics
                .keys()
                .take(panel_consts::PROBLEMS_AUTO_EXPAND)
                .cloned(),
        );
    }

    /// Filtered diagnostics grouped by file. Files with nothing left after
    /// filtering are omitted.
    pub fn groups(&self) -> Vec<ProblemGroup<'_>> {
        self.diagnostics
            .iter()
            .filter_map(|(path, diags)| {
                let problems: Vec<&Diagnostic> =
                    diags.iter().filter(|d| self.filter.accepts(d)).collect();
                if problems.is_empty() {
                    return None;
                }
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Unknown".to_string());
                Some(ProblemGroup {
                    path,
                    file_name,
                    relative_path: short_parent(path),
                    expanded: self.expanded.contains(path),
                    problems,
                })
            })
            .collect()
    }
}

fn short_parent(path: &Path) -> String {
    let parents: Vec<String> = path
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let start = parents.len().saturating_sub(2);
    parents[start..].join("/")
}
