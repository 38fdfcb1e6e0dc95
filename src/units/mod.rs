//! Units shipped with sysunit, plus those discovered on the search path

pub mod apk_install;
pub mod args;
pub mod hi;

use anyhow::{Context, Result};
use std::path::PathBuf;
use unitkit::{Registry, Unit, script};

/// Units compiled into the binary
pub fn builtin_units() -> unitkit::Result<Vec<Unit>> {
    Ok(vec![hi::unit()?, args::unit()?, apk_install::unit()?])
}

/// Build the registry: built-ins first, then script units from `search_path`.
/// A script unit may not reuse a built-in name.
pub fn build_registry(search_path: &[PathBuf]) -> Result<Registry> {
    let mut builder = Registry::builder();

    for unit in builtin_units()? {
        builder.register(unit)?;
    }

    let scripts = script::discover(search_path).context("Could not scan unit search path")?;
    for script in scripts {
        log::debug!("Registering script unit {}", script.name);
        builder.register(script.into_unit()?)?;
    }

    let registry = builder.build();
    log::debug!("Registry holds {} units", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use unitkit::Error;

    #[test]
    fn test_builtins_registered() {
        let registry = build_registry(&[]).unwrap();
        assert!(registry.contains("hi"));
        assert!(registry.contains("args"));
        assert!(registry.contains("apk_install"));
        assert_eq!(registry.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_units_added() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("motd");
        std::fs::write(&script, "#!/bin/sh\necho motd\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let registry = build_registry(&[dir.path().to_path_buf()]).unwrap();
        assert!(registry.contains("motd"));
        assert_eq!(registry.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_cannot_shadow_builtin() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("hi");
        std::fs::write(&script, "#!/bin/sh\necho hello\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = build_registry(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateUnit { name }) if name == "hi"
        ));
    }
}
