//! Service units shipped with svcplug.
//!
//! Every subdirectory of this crate's `src/` is one unit: its `mod.rs` is
//! the entry file read by task extraction, and [`register_all`] links the
//! unit's type into a [`ServiceCatalog`] under the directory name.

use std::path::PathBuf;

use svcplug_common::{Result, ServiceCatalog};

pub mod dummy;
pub mod echo;
pub mod payload_maker;
pub mod text_tools;

mod paths;

/// Settings shared by the bundled units.
#[derive(Debug, Clone)]
pub struct UnitSettings {
    /// Root for files read and written by units.
    pub uploads_dir: PathBuf,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

/// Link every bundled unit into `catalog`.
pub fn register_all(catalog: &mut ServiceCatalog, settings: &UnitSettings) -> Result<()> {
    catalog.register_default::<echo::Echo>("echo")?;
    catalog.register_default::<dummy::Service>("dummy")?;

    let uploads = settings.uploads_dir.clone();
    catalog.register("text_tools", move || {
        Ok(text_tools::TextTools::new(uploads.clone()))
    })?;

    let uploads = settings.uploads_dir.clone();
    catalog.register("payload_maker", move || {
        Ok(payload_maker::PayloadMaker::new(uploads.clone()))
    })?;

    Ok(())
}

/// A catalog holding only the bundled units.
pub fn catalog(settings: &UnitSettings) -> Result<ServiceCatalog> {
    let mut catalog = ServiceCatalog::new();
    register_all(&mut catalog, settings)?;
    Ok(catalog)
}

#[cfg(test)]
pub(crate) mod test_support {
    use svcplug_common::{Service, TaskSet};

    /// Names registered by `S::register_tasks`.
    pub fn registered<S: Service>() -> Vec<String> {
        let mut tasks = TaskSet::<S>::new();
        S::register_tasks(&mut tasks);
        tasks.names()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_links_every_unit() {
        let catalog = catalog(&UnitSettings::default()).unwrap();
        assert_eq!(
            catalog.names(),
            vec!["dummy", "echo", "payload_maker", "text_tools"]
        );
    }

    #[test]
    fn registering_twice_fails() {
        let mut catalog = catalog(&UnitSettings::default()).unwrap();
        assert!(register_all(&mut catalog, &UnitSettings::default()).is_err());
    }
}
