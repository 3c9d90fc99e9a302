use super::types::SourceSelection;

pub(super) const ARCHIVE_BASE_URL: &str =
    "https://exoplanetarchive.ipac.caltech.edu/cgi-bin/nstedAPI/nph-nstedAPI";

pub(super) const MAX_BATCH_SIZE: usize = 10_000;
pub(super) const MAX_TREES: usize = 1_000;
pub(super) const MAX_DEPTH: usize = 64;
const MIN_TIMEOUT_SECS: u64 = 1;
const MIN_RESPONSE_BYTES: usize = 1024;

pub(super) fn default_source() -> SourceSelection {
    SourceSelection::Synthetic
}

pub(super) fn default_batch_size() -> usize {
    150
}

pub(super) fn default_refresh_preview() -> usize {
    50
}

pub(super) fn default_n_trees() -> usize {
    100
}

pub(super) fn default_max_depth() -> usize {
    10
}

pub(super) fn default_min_samples_split() -> usize {
    2
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_min_samples() -> usize {
    10
}

pub(super) fn default_base_url() -> String {
    ARCHIVE_BASE_URL.to_string()
}

pub(super) fn default_timeout_secs() -> u64 {
    30
}

pub(super) fn default_max_response_bytes() -> usize {
    32 * 1024 * 1024
}

pub(super) fn clamp_test_fraction(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        value
    } else {
        default_test_fraction()
    }
}

pub(super) fn clamp_timeout_secs(value: u64) -> u64 {
    value.max(MIN_TIMEOUT_SECS)
}

pub(super) fn clamp_response_bytes(value: usize) -> usize {
    value.max(MIN_RESPONSE_BYTES)
}
