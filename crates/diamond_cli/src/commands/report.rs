//! Markdown report from benchmark CSV.

use super::bench::{BenchRow, FUNCTIONS};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

/// Errors reading benchmark CSV.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The input could not be read.
    #[error("failed to read benchmark results: {0}")]
    Io(#[from] std::io::Error),

    /// The header lacks a required column.
    #[error("missing column {0:?}")]
    MissingColumn(&'static str),

    /// A data line could not be parsed.
    #[error("line {line}: {message}")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
}

const COLUMNS: [&str; 5] = ["Implementation", "Function", "Facets", "Selectors", "Cost"];

/// Parses benchmark CSV. Columns may appear in any order.
pub fn parse_csv(text: &str) -> Result<Vec<BenchRow>, ReportError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };

    let names: Vec<&str> = header.split(',').map(str::trim).collect();
    let mut positions = [0usize; 5];
    for (slot, column) in positions.iter_mut().zip(COLUMNS) {
        *slot = names
            .iter()
            .position(|name| *name == column)
            .ok_or(ReportError::MissingColumn(column))?;
    }

    let mut rows = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |i: usize| {
            fields.get(positions[i]).copied().ok_or_else(|| ReportError::Malformed {
                line: line_no,
                message: format!("missing {}", COLUMNS[i]),
            })
        };
        let number = |i: usize| -> Result<u64, ReportError> {
            field(i)?.parse().map_err(|e| ReportError::Malformed {
                line: line_no,
                message: format!("{}: {e}", COLUMNS[i]),
            })
        };

        rows.push(BenchRow {
            implementation: field(0)?.to_string(),
            function: field(1)?.to_string(),
            facets: number(2)? as usize,
            selectors: number(3)? as usize,
            cost: number(4)?,
        });
    }
    Ok(rows)
}

/// Formats `value` with comma thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_table(
    function: &str,
    cells: &BTreeMap<(usize, usize), BTreeMap<&str, u64>>,
    implementations: &[&str],
) -> String {
    let mut headers = vec!["Selectors/Facets"];
    headers.extend_from_slice(implementations);

    let mut md = vec![format!("## {function} Function Cost\n")];
    md.push(format!("| {} |", headers.join(" | ")));
    let dashes: Vec<String> = headers.iter().map(|h| "-".repeat(h.len())).collect();
    md.push(format!("|{}|", dashes.join("|")));

    for ((selectors, facets), costs) in cells {
        let mut row = vec![format!("{selectors}/{facets}")];
        row.extend(
            implementations
                .iter()
                .map(|imp| costs.get(imp).map(|c| group_thousands(*c)).unwrap_or_default()),
        );
        md.push(format!("| {} |", row.join(" | ")));
    }
    md.push("\n---\n".to_string());
    md.join("\n")
}

/// Renders the Markdown report: one table per function.
pub fn render(rows: &[BenchRow]) -> String {
    // function -> (selectors, facets) -> implementation -> cost
    let mut data: BTreeMap<&str, BTreeMap<(usize, usize), BTreeMap<&str, u64>>> = BTreeMap::new();
    for row in rows {
        data.entry(row.function.as_str())
            .or_default()
            .entry((row.selectors, row.facets))
            .or_default()
            .insert(row.implementation.as_str(), row.cost);
    }

    let implementations: Vec<&str> = rows
        .iter()
        .map(|r| r.implementation.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut md = String::from(
        "\n# Diamond Loupe Cost Benchmark Report\n\n\
         ## Usage\n\n\
         Run the benchmark and write the CSV results:\n\
         ```bash\n\
         diamond bench --output benchmark.csv\n\
         ```\n\n\
         Then convert the CSV results into this report:\n\
         ```bash\n\
         diamond report benchmark.csv --output BENCHMARK_REPORT.md\n\
         ```\n\n\
         Costs are work units: one per registry entry scanned, one per blob read \
         and one per started 32-byte word copied out of the blob store.\n\n",
    );

    let ordered = FUNCTIONS
        .iter()
        .copied()
        .filter(|f| data.contains_key(f))
        .chain(data.keys().copied().filter(|f| !FUNCTIONS.contains(f)));
    let tables: Vec<String> = ordered
        .map(|function| format_table(function, &data[function], &implementations))
        .collect();
    md.push_str(&tables.concat());
    md
}

/// Runs the report command.
pub fn run(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(input).map_err(ReportError::from)?;
    let rows = parse_csv(&text)?;
    let md = render(&rows);

    match output {
        Some(path) => {
            std::fs::write(path, md)?;
            println!("✓ Markdown report generated: {:?}", path);
        }
        None => print!("{md}"),
    }
    Ok(())
}
