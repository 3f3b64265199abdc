//! Plain-text rendering of dataset cache state for the CLI.

use crate::models::{CacheStatus, DatasetState};

const NOT_STARTED: char = '◇';
const IN_FLIGHT: char = '○';
const LOADED: char = '●';
const FAILED: char = '✗';

fn status_symbol(status: CacheStatus) -> char {
    match status {
        CacheStatus::NotStarted => NOT_STARTED,
        CacheStatus::InFlight => IN_FLIGHT,
        CacheStatus::Loaded => LOADED,
        CacheStatus::Failed => FAILED,
    }
}

/// Render one line per dataset.
///
/// Example output:
/// ```text
/// Datasets
/// ├── ● kelurahan-boundaries (151 features)
/// ├── ○ rt-boundaries
/// └── ✗ kecamatan-boundaries: Upstream returned 500 Internal Server Error: boom
/// ```
pub fn render_datasets(states: &[DatasetState]) -> String {
    let mut output = String::from("Datasets\n");
    if states.is_empty() {
        output.push_str("└── (none registered)\n");
        return output;
    }

    for (i, state) in states.iter().enumerate() {
        let branch = if i == states.len() - 1 { "└── " } else { "├── " };
        output.push_str(branch);
        output.push(status_symbol(state.status));
        output.push(' ');
        output.push_str(state.key.as_str());

        match (state.feature_count, &state.error_message) {
            (Some(count), _) => output.push_str(&format!(" ({} features)", count)),
            (None, Some(error)) => output.push_str(&format!(": {}", error)),
            (None, None) => {}
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetKey;

    fn state(key: &str, status: CacheStatus, count: Option<usize>, error: Option<&str>) -> DatasetState {
        DatasetState {
            key: DatasetKey::new(key),
            status,
            feature_count: count,
            error_message: error.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(render_datasets(&[]), "Datasets\n└── (none registered)\n");
    }

    #[test]
    fn test_mixed_states() {
        let output = render_datasets(&[
            state("kelurahan-boundaries", CacheStatus::Loaded, Some(151), None),
            state("rt-boundaries", CacheStatus::InFlight, None, None),
            state("kecamatan-boundaries", CacheStatus::Failed, None, Some("timeout")),
        ]);
        assert_eq!(
            output,
            "Datasets\n├── ● kelurahan-boundaries (151 features)\n├── ○ rt-boundaries\n└── ✗ kecamatan-boundaries: timeout\n"
        );
    }

    #[test]
    fn test_not_started_has_no_suffix() {
        let output = render_datasets(&[state("rt-boundaries", CacheStatus::NotStarted, None, None)]);
        assert_eq!(output, "Datasets\n└── ◇ rt-boundaries\n");
    }
}
