//! Static task discovery.
//!
//! Reads the source text of a service unit and recovers the names of the
//! tasks it declares, without compiling or running any of it. The text is
//! parsed into a syntax tree and three declaration forms are tried in order;
//! the first one that yields a non-empty literal list wins:
//!
//! 1. a module-level `const`/`static` named `TASKS` (any case);
//! 2. an associated `TASKS` const inside an `impl` for a type named
//!    `Service` or `Plugin`;
//! 3. a zero-argument `fn get_tasks()` whose first return value is a literal
//!    list.
//!
//! ```text
//! pub const TASKS: &[&str] = &["ping", "echo"];
//!
//! impl Service {
//!     pub const TASKS: &'static [&'static str] = &["ping", "echo"];
//! }
//!
//! pub fn get_tasks() -> Vec<&'static str> {
//!     vec!["ping", "echo"]
//! }
//! ```
//!
//! Lists built at runtime are invisible here. That is accepted: the
//! extractor must stay safe to run over code whose dependencies are absent.
//! Text nested deeper than [`MAX_NESTING`] is rejected before parsing.

mod literal;
mod nesting;
mod rules;

use std::path::Path;

pub use nesting::MAX_NESTING;

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::{debug, warn},
};

/// Identifier (compared case-insensitively) that binds a task list.
pub const TASK_BINDING: &str = "tasks";

/// Type names conventionally used for a unit's capability object.
pub const CAPABILITY_TYPES: &[&str] = &["Service", "Plugin"];

/// Name of the task-list factory function.
pub const TASK_FACTORY: &str = "get_tasks";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("source does not parse: {0}")]
    Parse(#[from] syn::Error),

    #[error("source nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Which declaration form produced the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    ModuleBinding,
    CapabilityType,
    Factory,
}

/// Result of a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub tasks: Vec<String>,
    /// `None` when no rule matched.
    pub origin: Option<TaskOrigin>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Parse `source` and apply the extraction rules.
///
/// Fails when the text is not valid Rust or nests too deeply to parse
/// safely; a valid file without any declaration yields an empty
/// [`Extraction`].
pub fn parse_tasks(source: &str) -> Result<Extraction, ExtractError> {
    if nesting::exceeds(source, MAX_NESTING) {
        return Err(ExtractError::TooDeep { limit: MAX_NESTING });
    }
    let file = syn::parse_file(source)?;
    Ok(rules::apply(&file))
}

/// Task names declared in `source`, or an empty list when there are none or
/// the text does not parse.
pub fn extract_tasks(source: &str) -> Vec<String> {
    match parse_tasks(source) {
        Ok(extraction) => extraction.tasks,
        Err(e) => {
            debug!(error = %e, "task extraction skipped unparsable source");
            Vec::new()
        },
    }
}

/// Read and parse a source file.
pub fn parse_file_tasks(path: &Path) -> Result<Extraction, ExtractError> {
    let source = std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_tasks(&source)
}

/// Like [`extract_tasks`], reading the source from `path`.
pub fn extract_tasks_from_file(path: &Path) -> Vec<String> {
    match parse_file_tasks(path) {
        Ok(extraction) => extraction.tasks,
        Err(e) => {
            warn!(?path, %e, "task extraction failed");
            Vec::new()
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn module_binding_wins_over_lower_rules() {
        let src = r#"
            pub struct Service;

            impl Service {
                pub const TASKS: &'static [&'static str] = &["from_impl"];
            }

            pub fn get_tasks() -> Vec<&'static str> {
                vec!["from_factory"]
            }

            pub const TASKS: &[&str] = &["ping", "echo"];
        "#;
        let extraction = parse_tasks(src).unwrap();
        assert_eq!(extraction.tasks, vec!["ping", "echo"]);
        assert_eq!(extraction.origin, Some(TaskOrigin::ModuleBinding));
    }

    #[test]
    fn capability_type_used_when_no_module_binding() {
        let src = r#"
            pub struct Service;

            impl Service {
                pub const TASKS: &'static [&'static str] = &["ping"];
            }

            pub fn get_tasks() -> Vec<&'static str> {
                vec!["other"]
            }
        "#;
        let extraction = parse_tasks(src).unwrap();
        assert_eq!(extraction.tasks, vec!["ping"]);
        assert_eq!(extraction.origin, Some(TaskOrigin::CapabilityType));
    }

    #[test]
    fn trait_impl_for_plugin_counts_as_capability_type() {
        let src = r#"
            impl svcplug_common::Describe for Plugin {
                const tasks: &'static [&'static str] = &["render"];
            }
        "#;
        assert_eq!(extract_tasks(src), vec!["render"]);
    }

    #[test]
    fn other_type_names_are_ignored() {
        let src = r#"
            impl Helper {
                const TASKS: &'static [&'static str] = &["not_a_task"];
            }
        "#;
        assert!(extract_tasks(src).is_empty());
    }

    #[test]
    fn factory_tail_expression() {
        let src = r#"
            pub fn get_tasks() -> &'static [&'static str] {
                &["save_text"]
            }
        "#;
        let extraction = parse_tasks(src).unwrap();
        assert_eq!(extraction.tasks, vec!["save_text"]);
        assert_eq!(extraction.origin, Some(TaskOrigin::Factory));
    }

    #[test]
    fn factory_explicit_return() {
        let src = r#"
            fn get_tasks() -> Vec<&'static str> {
                tracing::debug!("listing");
                return vec!["a", "b"];
            }
        "#;
        assert_eq!(extract_tasks(src), vec!["a", "b"]);
    }

    #[test]
    fn factory_only_first_return_counts() {
        let src = r#"
            fn get_tasks() -> Vec<String> {
                return computed();
                vec!["unreachable"]
            }
        "#;
        assert!(extract_tasks(src).is_empty());
    }

    #[test]
    fn factory_with_arguments_is_ignored() {
        let src = r#"
            fn get_tasks(prefix: &str) -> Vec<&'static str> {
                vec!["a"]
            }
        "#;
        assert!(extract_tasks(src).is_empty());
    }

    #[test]
    fn non_literal_binding_falls_through() {
        let src = r#"
            const BASE: &[&str] = &["x"];
            pub const TASKS: &[&str] = BASE;

            impl Service {
                const TASKS: &'static [&'static str] = &["declared"];
            }
        "#;
        assert_eq!(extract_tasks(src), vec!["declared"]);
    }

    #[test]
    fn empty_binding_falls_through() {
        let src = r#"
            pub const TASKS: &[&str] = &[];
            fn get_tasks() -> Vec<&'static str> { vec!["fallback"] }
        "#;
        assert_eq!(extract_tasks(src), vec!["fallback"]);
    }

    #[test]
    fn nested_module_is_not_module_level() {
        let src = r#"
            mod inner {
                pub const TASKS: &[&str] = &["hidden"];
            }
        "#;
        assert!(extract_tasks(src).is_empty());
    }

    #[test]
    fn duplicates_are_preserved() {
        let src = r#"pub static tasks: [&str; 3] = ["a", "b", "a"];"#;
        assert_eq!(extract_tasks(src), vec!["a", "b", "a"]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::garbage("this is not ( rust at all {{")]
    #[case::truncated("pub const TASKS: &[&str] = &[\"ping\",")]
    #[case::python_source("TASKS = [\"ping\"]\nclass Service:\n    pass\n")]
    #[case::no_declarations("pub fn run() {}")]
    fn yields_empty_list_without_declarations(#[case] src: &str) {
        assert!(extract_tasks(src).is_empty());
    }

    #[rstest]
    #[case::parens_300("(", ")", 300)]
    #[case::parens_3000("(", ")", 3000)]
    #[case::brackets("[", "]", 1000)]
    #[case::blocks("{", "}", 1000)]
    #[case::unclosed("(", "", 10_000)]
    fn deeply_nested_source_yields_empty_list(
        #[case] open: &str,
        #[case] close: &str,
        #[case] depth: usize,
    ) {
        let src = format!(
            "pub const TASKS: &[&str] = &[\"ping\"];\nconst X: u8 = {}1{};",
            open.repeat(depth),
            close.repeat(depth)
        );
        assert!(extract_tasks(&src).is_empty());
        assert!(matches!(
            parse_tasks(&src).unwrap_err(),
            ExtractError::TooDeep { limit: MAX_NESTING }
        ));
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let src = format!(
            "pub const TASKS: &[&str] = &[\"ping\"];\nconst X: u8 = {}1{};",
            "(".repeat(32),
            ")".repeat(32)
        );
        assert_eq!(extract_tasks(&src), vec!["ping"]);
    }

    #[test]
    fn parse_error_is_reported_by_parse_tasks() {
        assert!(matches!(
            parse_tasks("fn (").unwrap_err(),
            ExtractError::Parse(_)
        ));
        let valid = parse_tasks("fn main() {}").unwrap();
        assert!(valid.is_empty());
        assert_eq!(valid.origin, None);
    }

    #[test]
    fn file_helpers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("service.rs");
        std::fs::write(&path, "pub const TASKS: &[&str] = &[\"go\"];").unwrap();
        assert_eq!(extract_tasks_from_file(&path), vec!["go"]);

        let missing = tmp.path().join("missing.rs");
        assert!(extract_tasks_from_file(&missing).is_empty());
        assert!(matches!(
            parse_file_tasks(&missing).unwrap_err(),
            ExtractError::Read { .. }
        ));
    }
}
