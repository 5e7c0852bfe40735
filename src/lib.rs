//! # Cutplan
//!
//! 裁剪計劃數量對帳與彙總引擎

pub mod logging;
pub mod overview;

// Re-export 主要類型
pub use cutplan_calc;
pub use cutplan_core;
pub use cutplan_sync;

pub use overview::{OrderOverview, TypeOverview};
