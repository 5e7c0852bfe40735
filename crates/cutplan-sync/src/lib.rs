//! # Cutplan Sync
//!
//! 計劃編輯工作階段、刪除帳本與遠端存檔協調

pub mod calculator_sync;
pub mod ledger;
pub mod orchestrator;
pub mod payload;
pub mod retry;
pub mod session;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-export 主要類型
pub use calculator_sync::{
    load_calculator, parse_tab_key, records_from_tabs, sync_calculator, tab_key,
    tabs_from_records, CalculatorSyncError, CalculatorSyncReport,
};
pub use ledger::{CombinationLedger, DeletionLedger};
pub use orchestrator::{
    EntityFailure, ReconciliationOrchestrator, SaveError, SavePhase, SaveReport,
};
pub use payload::{
    CalculatorSavePayload, CalculatorTabRecord, CommentPayload, EntityPayload,
    ProductionCenterPayload, SizePayload,
};
pub use retry::with_retry;
pub use session::PlanningSession;
pub use store::{PlanningStore, StoreError};
pub use validation::{validate_snapshot, ValidationError};
