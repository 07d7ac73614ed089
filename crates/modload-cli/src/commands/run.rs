//! `modload run`: load a module and print its exports.

use super::loader_options;
use crate::LoaderArgs;
use anyhow::{anyhow, Context};
use modload_engine::{Loader, Value};

pub fn execute(reference: Option<String>, args: &LoaderArgs) -> anyhow::Result<()> {
    let (options, manifest) = loader_options(args)?;
    let reference = match reference {
        Some(reference) => reference,
        None => manifest
            .as_ref()
            .and_then(|m| m.main())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no module given and no package.main in the manifest"))?,
    };

    let loader = Loader::with_options(options);
    let exports = loader
        .load(&reference)
        .with_context(|| format!("failed to load '{}'", reference))?;

    println!("{}", render(&exports)?);
    Ok(())
}

/// Pretty JSON when the value has a JSON form, the inspected value otherwise.
fn render(value: &Value) -> anyhow::Result<String> {
    match value.to_json().context("exports cannot be printed as JSON")? {
        Some(json) => Ok(serde_json::to_string_pretty(&json)?),
        None => Ok(value.inspect()),
    }
}
