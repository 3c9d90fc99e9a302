//! Archive ingestion: fetch table rows and normalize them into catalog records.

mod archive;
mod lenient;
pub mod normalize;
mod shapes;

pub use archive::{ArchiveClient, ArchiveSource, FetchError, parse_rows};
pub use normalize::{DropReason, NormalizeSummary, habitable_zone, normalize, normalize_batch};
pub use shapes::{ConfirmedRow, K2Row, KeplerRow, RawRecord, SourceKind, TessRow};
