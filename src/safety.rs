//! Guards against writing the match report over an input file.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that a report path is safe to overwrite.
///
/// Checks:
/// - The report must be a `.json` file
/// - It cannot be any of the input paths (titles file, settings file)
/// - It cannot already hold a JSON array, which is what an input titles file looks like
pub fn validate_report_path(output: &Path, input_paths: &[&Path]) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        bail!(
            "Safety check failed: report '{}' must have a .json extension",
            output.display()
        );
    }

    for input in input_paths {
        if same_file(output, input) {
            bail!(
                "Safety check failed: report '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    if looks_like_title_list(output) {
        bail!(
            "Safety check failed: '{}' already holds a title list; refusing to overwrite it",
            output.display()
        );
    }

    Ok(())
}

/// Equal paths, or both resolve to the same file on disk
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Reports are JSON objects; title inputs are JSON arrays
fn looks_like_title_list(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|text| text.trim_start().starts_with('['))
        .unwrap_or(false)
}
