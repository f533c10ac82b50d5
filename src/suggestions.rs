//! # Error Suggestions
//!
//! Helpers that turn failures into messages saying what went wrong AND how
//! to fix it. Commands pass library errors through [`explain`] before
//! returning them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use packsync::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

use crate::error::Error;

/// Fields accepted in a package declaration.
pub const PACKAGE_FIELDS: [&str; 11] = [
    "id", "as", "url", "branch", "pin", "disable", "requires", "wants", "setup", "config", "load",
];

/// Generate an error for when the configuration file is not found.
///
/// Includes hints about:
/// - Creating a new config file
/// - Using the -c/--config flag
/// - Using the PACKSYNC_CONFIG environment variable
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a packsync.yaml file with a 'packages:' list\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set PACKSYNC_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for an unknown field in a package declaration.
///
/// Suggests the closest known field when one is near.
pub fn unknown_field(spec: &str, field: &str) -> anyhow::Error {
    let did_you_mean = find_similar(field, &PACKAGE_FIELDS)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown field '{field}' in package '{spec}'{did_you_mean}\n\n\
         Valid fields are: {fields}",
        fields = PACKAGE_FIELDS.join(", ")
    )
}

/// Generate an error for a cycle detected in package dependencies.
///
/// Includes hints about how to resolve the cycle.
pub fn cycle_detected(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cycle detected in package dependencies: {cycle}\n\n\
         hint: Remove one of the 'requires:' or 'wants:' entries to break the cycle\n\
         hint: A package may list itself, but not reach itself through others"
    )
}

/// Generate an error for a sync run that finished with failures.
pub fn sync_failed(failures: usize) -> anyhow::Error {
    anyhow::anyhow!(
        "Sync finished with {failures} failure(s)\n\n\
         hint: Re-run with --log-level debug for git output\n\
         hint: Failed packages are left unchanged and retried on the next sync"
    )
}

/// Turn a library error into a hinted one where a hint exists.
pub fn explain(error: Error) -> anyhow::Error {
    match error {
        Error::SpecValidation {
            ref spec,
            ref field,
            ref message,
        } if message == "is not a known field" && spec != "group" => unknown_field(spec, field),
        Error::CycleDetected { ref cycle } => cycle_detected(cycle),
        other => anyhow::Error::new(other),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            (distance <= 2 && distance < input.len()).then_some((candidate, distance))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance over chars, one row at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b_chars.len() + 1];
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        prev = row;
    }

    prev[b_chars.len()]
}
