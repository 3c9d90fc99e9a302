use super::types::CatalogRecord;

/// Supplier of fresh catalog batches.
///
/// Implementations never fail: an unavailable source yields an empty batch and
/// logs the reason.
pub trait RecordSource: Send + Sync {
    /// Short identifier used in logs.
    fn label(&self) -> &str;

    /// Produce up to `count` records.
    fn produce(&self, count: usize) -> Vec<CatalogRecord>;
}
