use tracing::{debug, info, warn};

use crate::backend::ScriptBackend;
use crate::error::LoadError;
use crate::models::Script;

/// Canonical script list plus the view filtered by the current search term.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    scripts: Vec<Script>,
    filtered: Vec<usize>,
    term: String,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        let mut catalog = Self::new();
        catalog.replace(scripts);
        catalog
    }

    /// Fetches the canonical list. On failure the previous list is kept.
    pub fn load(&mut self, backend: &dyn ScriptBackend) -> Result<usize, LoadError> {
        match backend.list_scripts() {
            Ok(scripts) => {
                let count = scripts.len();
                self.replace(scripts);
                info!(count, "Catalog loaded");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "Catalog load failed");
                Err(err)
            }
        }
    }

    /// Replaces the canonical list and resets the view to all scripts.
    pub fn replace(&mut self, scripts: Vec<Script>) {
        self.scripts = scripts;
        self.term.clear();
        self.filtered = (0..self.scripts.len()).collect();
    }

    /// Recomputes the filtered view from the canonical list.
    pub fn filter(&mut self, term: &str) {
        self.term = term.to_string();
        self.filtered = filter_indices(&self.scripts, term);
        debug!(term, matched = self.filtered.len(), "Catalog filtered");
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn filtered(&self) -> Vec<&Script> {
        self.filtered.iter().map(|&i| &self.scripts[i]).collect()
    }

    pub fn filtered_at(&self, position: usize) -> Option<&Script> {
        self.filtered.get(position).map(|&i| &self.scripts[i])
    }

    pub fn find(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name == name)
    }

    /// `(filtered, total)`
    pub fn count(&self) -> (usize, usize) {
        (self.filtered.len(), self.scripts.len())
    }

    pub fn count_label(&self) -> String {
        let (shown, total) = self.count();
        if shown == total {
            format!("{total} scripts available")
        } else {
            format!("{shown} of {total} scripts")
        }
    }
}

/// Indices of the scripts matching `term`, in canonical order.
///
/// A blank term matches everything. Otherwise the trimmed term is matched
/// case-insensitively as a substring of title, description, name or author.
pub fn filter_indices(scripts: &[Script], term: &str) -> Vec<usize> {
    let needle = term.trim().to_lowercase();
    scripts
        .iter()
        .enumerate()
        .filter(|(_, s)| needle.is_empty() || matches(s, &needle))
        .map(|(i, _)| i)
        .collect()
}

fn matches(script: &Script, needle: &str) -> bool {
    let hit = |field: &str| field.to_lowercase().contains(needle);
    hit(&script.title)
        || hit(&script.description)
        || hit(&script.name)
        || script.author.as_deref().is_some_and(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::error::ExecutionError;
    use crate::models::{ExecutionResult, FormValues, ScriptConfig};

    fn script(name: &str, title: &str, description: &str, author: Option<&str>) -> Script {
        Script {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            version: None,
            author: author.map(Into::into),
        }
    }

    fn sample() -> Catalog {
        Catalog::with_scripts(vec![
            script("a", "Alpha", "first script", Some("Ada")),
            script("backup", "Nightly Backup", "copies the database", None),
            script("report", "Report", "builds a PDF", Some("Grace")),
        ])
    }

    fn names(catalog: &Catalog) -> Vec<&str> {
        catalog.filtered().iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn filter_matches_title_case_insensitively() {
        let mut catalog = Catalog::with_scripts(vec![script("a", "Alpha", "", None)]);
        catalog.filter("alp");
        assert_eq!(names(&catalog), vec!["a"]);
        catalog.filter("zzz");
        assert!(names(&catalog).is_empty());
    }

    #[test]
    fn filter_checks_every_field() {
        let mut catalog = sample();
        catalog.filter("DATABASE");
        assert_eq!(names(&catalog), vec!["backup"]);
        catalog.filter("grace");
        assert_eq!(names(&catalog), vec!["report"]);
        catalog.filter("back");
        assert_eq!(names(&catalog), vec!["backup"]);
    }

    #[test]
    fn blank_term_restores_full_view() {
        let mut catalog = sample();
        catalog.filter("report");
        catalog.filter("   ");
        assert_eq!(catalog.filtered().len(), catalog.scripts().len());
        catalog.filter("");
        let all: Vec<&Script> = catalog.scripts().iter().collect();
        assert_eq!(catalog.filtered(), all);
    }

    #[test]
    fn filter_is_pure_and_leaves_canonical_list_alone() {
        let mut catalog = sample();
        let canonical = catalog.scripts().to_vec();
        catalog.filter("r");
        let first = names(&catalog).join(",");
        catalog.filter("r");
        assert_eq!(names(&catalog).join(","), first);
        assert_eq!(catalog.scripts(), canonical.as_slice());
        assert_eq!(
            filter_indices(&canonical, "r"),
            filter_indices(&canonical, "r")
        );
    }

    #[test]
    fn term_is_trimmed() {
        let mut catalog = sample();
        catalog.filter("  alpha ");
        assert_eq!(names(&catalog), vec!["a"]);
    }

    #[test]
    fn count_label_reflects_filter() {
        let mut catalog = sample();
        assert_eq!(catalog.count_label(), "3 scripts available");
        catalog.filter("alpha");
        assert_eq!(catalog.count(), (1, 3));
        assert_eq!(catalog.count_label(), "1 of 3 scripts");
    }

    struct StaticBackend(Result<Vec<Script>, LoadError>);

    impl ScriptBackend for StaticBackend {
        fn list_scripts(&self) -> Result<Vec<Script>, LoadError> {
            self.0.clone()
        }

        fn script_config(&self, name: &str) -> Result<ScriptConfig, ConfigError> {
            Err(ConfigError::Transport {
                script: name.into(),
                message: "unused".into(),
            })
        }

        fn execute(&self, _: &str, _: &FormValues) -> Result<ExecutionResult, ExecutionError> {
            Err(ExecutionError::Transport("unused".into()))
        }
    }

    #[test]
    fn load_replaces_list_and_resets_filter() {
        let mut catalog = sample();
        catalog.filter("alpha");
        let backend = StaticBackend(Ok(vec![script("x", "X", "", None), script("y", "Y", "", None)]));
        assert_eq!(catalog.load(&backend), Ok(2));
        assert_eq!(catalog.term(), "");
        assert_eq!(names(&catalog), vec!["x", "y"]);
    }

    #[test]
    fn failed_load_keeps_previous_list() {
        let mut catalog = sample();
        let backend = StaticBackend(Err(LoadError::Server("nope".into())));
        assert_eq!(catalog.load(&backend), Err(LoadError::Server("nope".into())));
        assert_eq!(catalog.scripts().len(), 3);
    }
}
