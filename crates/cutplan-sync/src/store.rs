//! 遠端存取介面

use async_trait::async_trait;
use cutplan_core::{Identity, OrderLine, RetryPolicy};
use std::collections::BTreeMap;

use crate::payload::{
    CalculatorSavePayload, CalculatorTabRecord, CommentPayload, EntityPayload,
    ProductionCenterPayload,
};

/// 遠端存取錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// 記錄不存在（刪除時視為已刪除）
    #[error("遠端記錄不存在: {0}")]
    NotFound(String),

    /// 伺服器拒絕
    #[error(
        "伺服器拒絕請求{}: {}",
        .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default(),
        .message
    )]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// 連線錯誤
    #[error("連線失敗: {0}")]
    Transport(String),
}

impl StoreError {
    /// 建構伺服器拒絕錯誤
    pub fn rejected(code: Option<&str>, message: impl Into<String>) -> Self {
        StoreError::Rejected {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// 是否為鎖競爭類暫時性錯誤
    pub fn is_transient(&self, policy: &RetryPolicy) -> bool {
        match self {
            StoreError::NotFound(_) => false,
            StoreError::Rejected { code, message } => {
                policy.is_transient(code.as_deref(), message)
            }
            StoreError::Transport(message) => policy.is_transient(None, message),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// 計劃資料的遠端存取介面
///
/// 所有寫入皆以識別或裁剪表ID為鍵，重複送出結果相同。
#[async_trait]
pub trait PlanningStore: Send + Sync {
    /// 保存裁剪表的生產中心指派（以裁剪表ID為鍵）
    async fn save_production_center(
        &self,
        payload: &ProductionCenterPayload,
    ) -> Result<(), StoreError>;

    /// 新增或更新計劃實體
    async fn upsert_entity(&self, payload: &EntityPayload) -> Result<(), StoreError>;

    /// 刪除計劃實體；記錄不存在時回傳 `StoreError::NotFound`
    async fn delete_entity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// 刪除生產中心組合
    async fn delete_combination(&self, combination_id: &str) -> Result<(), StoreError>;

    /// 讀取訂單明細
    async fn fetch_order_lines(&self, order: &str) -> Result<Vec<OrderLine>, StoreError>;

    /// 保存訂單備註（空字串代表刪除）
    async fn save_comment(&self, payload: &CommentPayload) -> Result<(), StoreError>;

    /// 讀取試算分頁（鍵為 `"n"` 或 `"n_right"`）
    async fn load_calculator(
        &self,
        order: &str,
        combination_id: &str,
    ) -> Result<BTreeMap<String, CalculatorTabRecord>, StoreError>;

    /// 保存單一試算分頁
    async fn save_calculator(&self, payload: &CalculatorSavePayload) -> Result<(), StoreError>;

    /// 刪除單一試算分頁
    async fn delete_calculator_tab(
        &self,
        order: &str,
        combination_id: &str,
        tab_key: &str,
    ) -> Result<(), StoreError>;
}
