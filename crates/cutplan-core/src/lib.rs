//! # Cutplan Core
//!
//! 裁剪計劃核心資料模型與類型定義

pub mod calculator;
pub mod combination;
pub mod config;
pub mod identity;
pub mod order;
pub mod quantity;
pub mod table;

// Re-export 主要類型
pub use calculator::{BaselineSelector, CalculatorMarker, CalculatorTab, TabSide};
pub use combination::ProductionCenterCombination;
pub use config::{CombinationKeyEntry, EngineConfig, ItemTypeCodes, RetryPolicy};
pub use identity::Identity;
pub use order::{orders_from_lines, Order, OrderLine, OrderSize, OrderStatus};
pub use quantity::{coerce_quantity, SizeQuantityMap};
pub use table::{PlanningRow, PlanningTable, SpreadingMethod, StripSpec, TableType};

/// 裁剪計劃錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CutPlanError {
    #[error("訂單 {order} 中尺碼重複: {size}")]
    DuplicateSize { order: String, size: String },

    #[error("生產中心組合重複: {production_center}/{cutting_room}/{destination}")]
    DuplicateCombination {
        production_center: String,
        cutting_room: String,
        destination: String,
    },

    #[error("找不到生產中心組合: {0}")]
    CombinationNotFound(String),

    #[error("找不到裁剪表: {0}")]
    TableNotFound(String),

    #[error("找不到資料列: {0}")]
    RowNotFound(String),

    #[error("無效的訂單狀態: {0}")]
    InvalidOrderStatus(u8),

    #[error("無效的基準選擇: {0}")]
    InvalidBaselineKey(String),

    #[error("無效的分頁鍵: {0}")]
    InvalidTabKey(String),

    #[error("配置解析錯誤: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CutPlanError>;
