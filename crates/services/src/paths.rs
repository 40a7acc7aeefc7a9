use std::path::{Component, Path, PathBuf};

/// Join a caller-supplied relative path onto `base`, refusing absolute
/// paths and `..` components.
pub(crate) fn join_relative(base: &Path, rel: &str) -> Result<PathBuf, String> {
    let rel_path = Path::new(rel);
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {},
            Component::ParentDir => return Err(format!("path escapes uploads root: {rel}")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path must be relative: {rel}"));
            },
        }
    }
    Ok(base.join(rel_path))
}
