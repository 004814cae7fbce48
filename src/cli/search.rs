use anyhow::Result;

use cycif_db::markers::MarkerRegistry;

/// List markers matching a query
pub fn run(registry: &MarkerRegistry, query: &str) -> Result<()> {
    let found = registry.search(query);
    if found.is_empty() {
        println!("No markers match `{}`", query);
        return Ok(());
    }

    println!("{:>6}  {:<24}  Aliases", "Id", "Label");
    for marker in found {
        println!(
            "{:>6}  {:<24}  {}",
            marker.id,
            marker.full_label(),
            marker.aliases.join(", ")
        );
    }

    Ok(())
}
