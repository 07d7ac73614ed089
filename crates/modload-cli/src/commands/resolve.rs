//! `modload resolve`: print where a reference points.

use super::loader_options;
use crate::LoaderArgs;
use anyhow::Context;
use modload_engine::Loader;

pub fn execute(reference: &str, args: &LoaderArgs) -> anyhow::Result<()> {
    let (options, _) = loader_options(args)?;
    let loader = Loader::with_options(options);
    let resolved = loader
        .resolve(reference, loader.base_dir())
        .with_context(|| format!("failed to resolve '{}'", reference))?;
    println!("{}", resolved.display());
    Ok(())
}
