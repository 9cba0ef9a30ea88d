//! Inspect command implementation.

use super::plan::Plan;
use diamond_core::{BlobStore, Category, Diamond, FileBlobStore, MemoryBlobStore};
use serde::Serialize;
use std::path::Path;

/// Diamond inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Plan path.
    pub plan: String,
    /// Cuts applied.
    pub cuts: u64,
    /// Registered selectors.
    pub selector_count: usize,
    /// Whether loupe reads came from the shard cache.
    pub cache_enabled: bool,
    /// Facets with their selectors.
    pub facets: Vec<FacetView>,
    /// Facets per category (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryView>,
    /// Live blobs in the store.
    pub live_blobs: usize,
    /// Work units spent on the loupe reads above.
    pub read_cost: u64,
}

/// One facet.
#[derive(Debug, Serialize)]
pub struct FacetView {
    /// Facet address.
    pub address: String,
    /// Selectors routed to it.
    pub selectors: Vec<String>,
}

/// The facets of one category.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    /// Category name.
    pub name: String,
    /// Facet addresses.
    pub facets: Vec<String>,
}

/// Runs the inspect command.
///
/// Blobs go to `blob_log` when given, otherwise to memory.
pub fn run(
    plan_path: &Path,
    blob_log: Option<&Path>,
    category: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = Plan::load(plan_path)?;
    let store: Box<dyn BlobStore> = match blob_log {
        Some(path) => Box::new(FileBlobStore::open_with_create_dirs(path)?),
        None => Box::new(MemoryBlobStore::new()),
    };
    let (diamond, _) = plan.build(store)?;
    diamond.flush()?;

    let result = inspect(&diamond, &plan_path.display().to_string(), category)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text(&result),
    }

    Ok(())
}

fn inspect(
    diamond: &Diamond,
    plan: &str,
    category: Option<&str>,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let before = diamond.stats();

    let facets = diamond
        .facets()?
        .into_iter()
        .map(|record| FacetView {
            address: record.address.to_string(),
            selectors: record.selectors.iter().map(ToString::to_string).collect(),
        })
        .collect();

    let category = match category {
        Some(name) => {
            let facets = diamond.facet_addresses_in(&Category::new(name))?;
            Some(CategoryView {
                name: name.to_string(),
                facets: facets.iter().map(ToString::to_string).collect(),
            })
        }
        None => None,
    };

    let read_cost = diamond.stats().since(&before).read_cost();

    Ok(InspectResult {
        plan: plan.to_string(),
        cuts: diamond.sequence().as_u64(),
        selector_count: diamond.selector_count(),
        cache_enabled: diamond.is_cache_enabled(),
        facets,
        category,
        live_blobs: diamond.live_blob_count(),
        read_cost,
    })
}

fn print_text(result: &InspectResult) {
    println!("Diamond Inspection");
    println!("==================");
    println!("Plan: {}", result.plan);
    println!();
    println!("Cuts applied:   {}", result.cuts);
    println!("Selectors:      {}", result.selector_count);
    println!("Facets:         {}", result.facets.len());
    println!(
        "Loupe source:   {}",
        if result.cache_enabled { "shard cache" } else { "live scan" }
    );
    println!("Live blobs:     {}", result.live_blobs);
    println!("Read cost:      {}", result.read_cost);

    println!();
    for facet in &result.facets {
        println!("{} ({} selectors)", facet.address, facet.selectors.len());
        for selector in &facet.selectors {
            println!("  {selector}");
        }
    }

    if let Some(category) = &result.category {
        println!();
        println!("Category {}:", category.name);
        for facet in &category.facets {
            println!("  {facet}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_reports_plan_state() {
        let plan = Plan::parse(
            r#"{
                "cache_enabled": true,
                "facets": [{ "address": "0x0000000000000000000000000000000000000001", "selectors": ["0x00000001"] }],
                "cuts": [{ "add": [{ "facet": "0x0000000000000000000000000000000000000001", "selectors": ["0x00000001"] }] }]
            }"#,
        )
        .unwrap();
        let (diamond, _) = plan.build(Box::new(MemoryBlobStore::new())).unwrap();

        let result = inspect(&diamond, "plan.json", Some("default")).unwrap();
        assert_eq!(result.cuts, 1);
        assert_eq!(result.facets.len(), 1);
        assert_eq!(result.facets[0].selectors, vec!["0x00000001".to_string()]);
        assert_eq!(result.category.unwrap().facets.len(), 1);
        assert!(result.read_cost > 0);
    }

    #[test]
    fn run_writes_blob_log() {
        let dir = tempfile::tempdir().unwrap();
        let plan_path = dir.path().join("plan.json");
        std::fs::write(
            &plan_path,
            r#"{ "cache_enabled": true, "facets": [] }"#,
        )
        .unwrap();
        let log = dir.path().join("blobs.log");

        run(&plan_path, Some(&log), None, "json").unwrap();
        assert!(log.exists());
    }
}
