//! Blob log inspection.

use diamond_core::FileBlobStore;
use serde::Serialize;
use std::path::Path;

/// Blob log summary.
#[derive(Debug, Serialize)]
pub struct BlobsResult {
    /// Log path.
    pub path: String,
    /// File size in bytes.
    pub file_len: u64,
    /// Length of the valid record prefix.
    pub valid_len: u64,
    /// Valid records.
    pub records: usize,
    /// Blob records ever written.
    pub blobs: usize,
    /// Release markers.
    pub releases: usize,
    /// Blobs still live.
    pub live_blobs: usize,
    /// Payload bytes held by live blobs.
    pub live_bytes: u64,
    /// Payload bytes held by released blobs.
    pub released_bytes: u64,
    /// Whether bytes follow the last valid record.
    pub torn_tail: bool,
}

/// Runs the blobs command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No blob log found at {:?}", path).into());
    }

    let report = FileBlobStore::inspect(path)?;
    let result = BlobsResult {
        path: path.display().to_string(),
        file_len: report.file_len,
        valid_len: report.valid_len,
        records: report.records,
        blobs: report.blobs,
        releases: report.releases,
        live_blobs: report.live_blobs,
        live_bytes: report.live_bytes,
        released_bytes: report.released_bytes,
        torn_tail: report.has_torn_tail(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("Blob Log Inspection");
            println!("===================");
            println!("Path: {}", result.path);
            println!();
            println!("File size:      {} bytes", result.file_len);
            println!("Records:        {}", result.records);
            println!("  Blobs:        {}", result.blobs);
            println!("  Releases:     {}", result.releases);
            println!(
                "Live blobs:     {} ({} bytes)",
                result.live_blobs, result.live_bytes
            );
            println!("Released bytes: {}", result.released_bytes);
            if result.torn_tail {
                println!();
                println!(
                    "⚠ {} bytes past the last valid record will be truncated on open",
                    result.file_len - result.valid_len
                );
            }
        }
    }

    Ok(())
}
