//! Batch regeneration of wrappers for every implementation unit.

use std::path::PathBuf;

use {
    serde::Serialize,
    svcplug_extract::{TaskOrigin, parse_file_tasks},
    tracing::{info, warn},
};

use crate::{
    discover::{DiscoveryOptions, ServiceUnit, discover_units},
    synth::{Synthesis, Synthesizer},
};

#[derive(Debug, Clone, Default)]
pub struct RegenerateOptions {
    /// Restrict the run to these unit names.
    pub only: Option<Vec<String>>,
    pub force_empty: bool,
}

/// What happened to one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitReport {
    Generated {
        unit: String,
        tasks: Vec<String>,
        origin: Option<TaskOrigin>,
        wrapper_path: PathBuf,
    },
    Refused {
        unit: String,
    },
    Failed {
        unit: String,
        error: String,
    },
}

impl UnitReport {
    pub fn unit(&self) -> &str {
        match self {
            Self::Generated { unit, .. } | Self::Refused { unit } | Self::Failed { unit, .. } => {
                unit
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegenerateReport {
    pub units: Vec<UnitReport>,
}

impl RegenerateReport {
    pub fn generated(&self) -> usize {
        self.count(|r| matches!(r, UnitReport::Generated { .. }))
    }

    pub fn refused(&self) -> usize {
        self.count(|r| matches!(r, UnitReport::Refused { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, UnitReport::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&UnitReport) -> bool) -> usize {
        self.units.iter().filter(|r| pred(r)).count()
    }
}

/// Walks the services root, extracts tasks and writes wrappers.
pub struct Regenerator {
    services_root: PathBuf,
    discovery: DiscoveryOptions,
    synthesizer: Synthesizer,
}

impl Regenerator {
    pub fn new(services_root: impl Into<PathBuf>, synthesizer: Synthesizer) -> Self {
        Self {
            services_root: services_root.into(),
            discovery: DiscoveryOptions::default(),
            synthesizer,
        }
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryOptions) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn units(&self) -> Vec<ServiceUnit> {
        discover_units(&self.services_root, &self.discovery)
    }

    /// Regenerate every selected unit. A failing unit is reported and the
    /// run continues with the next one.
    pub fn regenerate(&self, options: &RegenerateOptions) -> RegenerateReport {
        let units = self.units();
        let mut report = RegenerateReport::default();

        if let Some(only) = &options.only {
            for name in only {
                if !units.iter().any(|u| &u.name == name) {
                    warn!(unit = %name, "requested unit not found");
                    report.units.push(UnitReport::Failed {
                        unit: name.clone(),
                        error: format!(
                            "no unit named '{name}' under {}",
                            self.services_root.display()
                        ),
                    });
                }
            }
        }

        for unit in units.iter().filter(|u| {
            options
                .only
                .as_ref()
                .is_none_or(|only| only.iter().any(|n| n == &u.name))
        }) {
            let entry = self.regenerate_unit(unit, options.force_empty);
            match &entry {
                UnitReport::Generated { unit, tasks, .. } => {
                    info!(unit = %unit, tasks = tasks.len(), "wrapper regenerated");
                },
                UnitReport::Refused { unit } => {
                    info!(unit = %unit, "no tasks found, wrapper skipped");
                },
                UnitReport::Failed { unit, error } => {
                    warn!(unit = %unit, %error, "wrapper regeneration failed");
                },
            }
            report.units.push(entry);
        }

        report
    }

    fn regenerate_unit(&self, unit: &ServiceUnit, force_empty: bool) -> UnitReport {
        let failed = |error: String| UnitReport::Failed {
            unit: unit.name.clone(),
            error,
        };

        // An unparsable unit still gets a report; it simply has no tasks.
        let extraction = match parse_file_tasks(&unit.source_path) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "task extraction failed");
                Default::default()
            },
        };

        let artifacts = match self
            .synthesizer
            .synthesize(&unit.name, &extraction.tasks, force_empty)
        {
            Ok(Synthesis::Wrapper(artifacts)) => artifacts,
            Ok(Synthesis::Refused { unit }) => return UnitReport::Refused { unit },
            Err(e) => return failed(e.to_string()),
        };

        match self.synthesizer.write(&artifacts) {
            Ok(wrapper_path) => UnitReport::Generated {
                unit: unit.name.clone(),
                tasks: extraction.tasks,
                origin: extraction.origin,
                wrapper_path,
            },
            Err(e) => failed(e.to_string()),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::manifest::ManifestStore};

    fn setup() -> (tempfile::TempDir, Regenerator) {
        let tmp = tempfile::tempdir().unwrap();
        let services = tmp.path().join("services");
        for (name, src) in [
            ("echo", "pub const TASKS: &[&str] = &[\"ping\"];"),
            ("empty", "pub fn helper() {}"),
            ("broken", "fn ( {"),
        ] {
            std::fs::create_dir_all(services.join(name)).unwrap();
            std::fs::write(services.join(name).join("mod.rs"), src).unwrap();
        }
        let regen = Regenerator::new(&services, Synthesizer::new(tmp.path().join("plugins")));
        (tmp, regen)
    }

    #[test]
    fn regenerates_units_with_tasks_and_refuses_the_rest() {
        let (tmp, regen) = setup();
        let report = regen.regenerate(&RegenerateOptions::default());

        assert_eq!(report.generated(), 1);
        assert_eq!(report.refused(), 2);
        assert_eq!(report.failed(), 0);

        let echo = report.units.iter().find(|r| r.unit() == "echo").unwrap();
        let UnitReport::Generated { tasks, origin, .. } = echo else {
            panic!("echo should be generated");
        };
        assert_eq!(tasks, &vec!["ping".to_string()]);
        assert_eq!(*origin, Some(TaskOrigin::ModuleBinding));

        let manifest = ManifestStore::in_dir(&tmp.path().join("plugins/echo"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(manifest.tasks, vec!["ping"]);
        assert!(!tmp.path().join("plugins/empty").exists());
    }

    #[test]
    fn force_empty_generates_everything() {
        let (tmp, regen) = setup();
        let report = regen.regenerate(&RegenerateOptions {
            only: None,
            force_empty: true,
        });
        assert_eq!(report.generated(), 3);
        assert!(tmp.path().join("plugins/broken/plugin.rs").is_file());
    }

    #[test]
    fn only_filters_and_reports_missing_names() {
        let (_tmp, regen) = setup();
        let report = regen.regenerate(&RegenerateOptions {
            only: Some(vec!["echo".into(), "nope".into()]),
            force_empty: false,
        });
        assert_eq!(report.units.len(), 2);
        assert_eq!(report.generated(), 1);
        assert!(matches!(
            report.units.iter().find(|r| r.unit() == "nope").unwrap(),
            UnitReport::Failed { .. }
        ));
    }

    #[test]
    fn deeply_nested_unit_is_refused_and_siblings_generate() {
        let (tmp, regen) = setup();
        let nested = tmp.path().join("services/nested");
        std::fs::create_dir_all(&nested).unwrap();
        let src = format!(
            "pub const TASKS: &[&str] = &[\"go\"];\nconst X: u8 = {}1{};",
            "[".repeat(2000),
            "]".repeat(2000)
        );
        std::fs::write(nested.join("mod.rs"), src).unwrap();

        let report = regen.regenerate(&RegenerateOptions::default());
        assert_eq!(report.generated(), 1);
        assert!(matches!(
            report.units.iter().find(|r| r.unit() == "nested").unwrap(),
            UnitReport::Refused { .. }
        ));
        assert!(tmp.path().join("plugins/echo/plugin.rs").is_file());
    }

    #[test]
    fn write_failure_is_isolated() {
        let (tmp, regen) = setup();
        // A plain file where the wrapper directory should go.
        std::fs::create_dir_all(tmp.path().join("plugins")).unwrap();
        std::fs::write(tmp.path().join("plugins/echo"), "blocker").unwrap();

        let report = regen.regenerate(&RegenerateOptions {
            only: None,
            force_empty: true,
        });
        assert_eq!(report.failed(), 1);
        assert_eq!(report.generated(), 2);
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = UnitReport::Refused {
            unit: "empty".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"status": "refused", "unit": "empty"})
        );
    }
}
