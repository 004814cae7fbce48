use anyhow::{Context, Result};

use cycif_db::fusion::{fuse_db_keys, FuseMode};
use cycif_db::headers::{HeaderKey, HeaderKeyComparator};
use cycif_db::markers::{ComparatorContext, MarkerRegistry};

fn parse_list(raw: &str) -> Result<Vec<HeaderKey>> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| k.parse::<HeaderKey>().with_context(|| format!("Bad key list `{}`", raw)))
        .collect()
}

/// Fuse key lists and print the result, one key per line
pub fn run(
    registry: &MarkerRegistry,
    key_lists: &[String],
    mode: &str,
    ctx: ComparatorContext,
    labels: bool,
) -> Result<()> {
    let mode: FuseMode = mode.parse()?;
    let lists = key_lists
        .iter()
        .map(|raw| parse_list(raw))
        .collect::<Result<Vec<_>>>()?;

    let fused = fuse_db_keys(registry, &lists, mode, ctx)?;

    let export = HeaderKeyComparator::new(registry, ComparatorContext::export());
    for key in &fused {
        if labels {
            println!("{}\t{}", key, export.label(key)?);
        } else {
            println!("{}", key);
        }
    }

    Ok(())
}
