//! Loupe cost benchmark.
//!
//! Builds a diamond for every (selectors, facets) pair of a grid and charges
//! `facets()` and `facetAddresses()` reads against the cached and the live
//! loupe. Costs are [`StatsSnapshot::read_cost`] work units, so runs are
//! deterministic and comparable across machines.

use super::plan::DeclaredFacet;
use diamond_codec::{FacetAddress, Selector};
use diamond_core::{Config, CoreResult, Diamond, FacetCut, Loupe, StatsSnapshot};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// CSV header written by [`to_csv`].
pub const CSV_HEADER: &str = "Implementation,Function,Facets,Selectors,Cost";

/// Measured loupe functions.
pub const FUNCTIONS: [&str; 2] = ["facets()", "facetAddresses()"];

/// Measured implementations.
pub const IMPLEMENTATIONS: [&str; 2] = ["cached", "live"];

/// One measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchRow {
    /// `cached` or `live`.
    pub implementation: String,
    /// Loupe function name.
    pub function: String,
    /// Facets in the diamond.
    pub facets: usize,
    /// Selectors in the diamond.
    pub selectors: usize,
    /// Work units charged.
    pub cost: u64,
}

/// Builds a cache-enabled diamond with `facets` facets splitting
/// `selectors` selectors evenly.
pub fn populate(facets: usize, selectors: usize) -> CoreResult<Diamond> {
    let diamond = Diamond::in_memory(Config::new().cache_enabled(true))?;
    if facets == 0 {
        return Ok(diamond);
    }

    let mut cut = FacetCut::new();
    let mut next = 1u32;
    for index in 0..facets {
        let share = selectors / facets + usize::from(index < selectors % facets);
        let owned: Vec<Selector> = (next..next + share as u32).map(Selector::from_u32).collect();
        next += share as u32;

        let address = FacetAddress::from_index(index as u64 + 1);
        diamond.deploy(Arc::new(DeclaredFacet::new(address, owned.clone(), None)))?;
        cut = cut.add(address, owned);
    }
    diamond.diamond_cut(cut)?;
    Ok(diamond)
}

fn read(loupe: &dyn Loupe, function: &str) -> CoreResult<()> {
    match function {
        "facets()" => loupe.facets_packed().map(drop),
        _ => loupe.facet_addresses_packed().map(drop),
    }
}

/// Charges one read of `function` against `implementation`.
pub fn measure(diamond: &Diamond, implementation: &str, function: &str) -> CoreResult<u64> {
    let before = diamond.stats();
    match implementation {
        "cached" => diamond.with_cached_loupe(|loupe| read(loupe, function))?,
        _ => diamond.with_live_loupe(|loupe| read(loupe, function))?,
    }
    let delta: StatsSnapshot = diamond.stats().since(&before);
    Ok(delta.read_cost())
}

/// Measures every grid point. Pairs with fewer selectors than facets are
/// skipped since every facet needs at least one selector.
pub fn run_grid(selector_counts: &[usize], facet_counts: &[usize]) -> CoreResult<Vec<BenchRow>> {
    let mut rows = Vec::new();
    for &selectors in selector_counts {
        for &facets in facet_counts {
            if facets == 0 || selectors < facets {
                debug!(selectors, facets, "skipping grid point");
                continue;
            }

            let diamond = populate(facets, selectors)?;
            for implementation in IMPLEMENTATIONS {
                for function in FUNCTIONS {
                    rows.push(BenchRow {
                        implementation: implementation.to_string(),
                        function: function.to_string(),
                        facets,
                        selectors,
                        cost: measure(&diamond, implementation, function)?,
                    });
                }
            }
        }
    }
    Ok(rows)
}

/// Renders rows as CSV with [`CSV_HEADER`].
pub fn to_csv(rows: &[BenchRow]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            row.implementation, row.function, row.facets, row.selectors, row.cost
        );
    }
    out
}

/// Runs the bench command.
pub fn run(
    selector_counts: &[usize],
    facet_counts: &[usize],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = run_grid(selector_counts, facet_counts)?;
    let csv = to_csv(&rows);

    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            info!(rows = rows.len(), path = %path.display(), "wrote benchmark results");
            println!("✓ Benchmark results written to {:?}", path);
        }
        None => print!("{csv}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_splits_selectors_evenly() {
        let diamond = populate(3, 10).unwrap();
        let facets = diamond.facets().unwrap();
        let sizes: Vec<usize> = facets.iter().map(|f| f.selectors.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn live_cost_grows_with_selectors() {
        let small = populate(2, 10).unwrap();
        let large = populate(2, 100).unwrap();
        assert_eq!(measure(&small, "live", "facetAddresses()").unwrap(), 10);
        assert_eq!(measure(&large, "live", "facetAddresses()").unwrap(), 100);
    }

    #[test]
    fn cached_addresses_cost_one_blob() {
        // 4-byte count + 2 * 20-byte addresses = 44 bytes = 2 words.
        let diamond = populate(2, 100).unwrap();
        assert_eq!(measure(&diamond, "cached", "facetAddresses()").unwrap(), 1 + 2);
    }

    #[test]
    fn grid_skips_impossible_points() {
        let rows = run_grid(&[1, 4], &[1, 2]).unwrap();
        // (1,1), (4,1), (4,2) times two implementations times two functions.
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.selectors >= r.facets));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let rows = vec![BenchRow {
            implementation: "cached".into(),
            function: "facets()".into(),
            facets: 2,
            selectors: 10,
            cost: 1234,
        }];
        assert_eq!(
            to_csv(&rows),
            "Implementation,Function,Facets,Selectors,Cost\ncached,facets(),2,10,1234\n"
        );
    }
}
