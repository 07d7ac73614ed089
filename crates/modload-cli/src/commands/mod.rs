//! Subcommand implementations

pub mod resolve;
pub mod run;

use crate::LoaderArgs;
use anyhow::Context;
use modload_engine::{LoaderOptions, Manifest, MANIFEST_FILE};
use std::path::PathBuf;
use tracing::debug;

/// Merge the manifest (explicit, or found in the base directory) with
/// command-line flags. Flags win.
pub fn loader_options(args: &LoaderArgs) -> anyhow::Result<(LoaderOptions, Option<Manifest>)> {
    let manifest_path = match &args.manifest {
        Some(path) => Some(path.clone()),
        None => {
            let candidate = args
                .base
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(MANIFEST_FILE);
            candidate.is_file().then_some(candidate)
        }
    };

    let manifest = match &manifest_path {
        Some(path) => {
            debug!(manifest = %path.display(), "reading manifest");
            Some(
                Manifest::from_file(path)
                    .with_context(|| format!("failed to load manifest {}", path.display()))?,
            )
        }
        None => None,
    };

    let base_dir = match (&args.base, &manifest_path) {
        (Some(base), _) => base.clone(),
        (None, Some(path)) => path
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
        (None, None) => PathBuf::from("."),
    };

    let mut options = match &manifest {
        Some(manifest) => manifest.loader_options(base_dir),
        None => LoaderOptions::default().with_base_dir(base_dir),
    };
    if !args.extensions.is_empty() {
        options.extensions = args.extensions.clone();
    }
    options.validate().context("invalid loader options")?;

    Ok((options, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_in_base_dir_is_picked_up() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(MANIFEST_FILE),
            "[package]\nname = \"demo\"\nmain = \"./app\"\n\n[loader]\nextensions = [\".json\"]\n",
        )
        .unwrap();

        let args = LoaderArgs {
            base: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let (options, manifest) = loader_options(&args).unwrap();
        assert_eq!(options.extensions, vec![".json"]);
        assert_eq!(manifest.unwrap().main(), Some("./app"));
    }

    #[test]
    fn test_flags_override_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("custom.toml");
        fs::write(&manifest, "[loader]\nextensions = [\".json\"]\nmax-call-depth = 9\n").unwrap();

        let args = LoaderArgs {
            base: None,
            manifest: Some(manifest),
            extensions: vec![".js".to_string()],
        };
        let (options, _) = loader_options(&args).unwrap();
        assert_eq!(options.base_dir, temp_dir.path());
        assert_eq!(options.extensions, vec![".js"]);
        assert_eq!(options.max_call_depth, 9);
    }

    #[test]
    fn test_unknown_extension_flag_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let args = LoaderArgs {
            base: Some(temp_dir.path().to_path_buf()),
            manifest: None,
            extensions: vec![".ts".to_string()],
        };
        assert!(loader_options(&args).is_err());
    }
}
