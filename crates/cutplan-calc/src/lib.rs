//! # Cutplan Calculation Engine
//!
//! 尺碼正規化、識別命名、數量彙總與試算基準解析

pub mod aggregation;
pub mod baseline;
pub mod consumption;
pub mod coverage;
pub mod naming;
pub mod size_key;

// Re-export 主要類型
pub use aggregation::{QuantityAggregator, RemainingQuantity, SegmentTotal, NO_BAGNO};
pub use baseline::{BaselineError, BaselineResolver};
pub use consumption::ConsumptionCalculator;
pub use coverage::{coverage_by_size, coverage_percent, CoverageStatus, SizeCoverage};
pub use naming::{order_suffix, IdentityNamer};
pub use size_key::SizeKeyNormalizer;
