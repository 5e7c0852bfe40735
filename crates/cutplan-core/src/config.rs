//! 引擎配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::table::{SpreadingMethod, TableType};
use crate::Result;

/// 存檔重試策略（僅針對鎖競爭類的暫時性錯誤）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最多嘗試次數（含第一次）
    pub max_attempts: u32,

    /// 線性退避步長（毫秒），第 n 次失敗後等待 n × 步長
    pub backoff_step_ms: u64,

    /// 視為鎖競爭的錯誤代碼
    pub transient_codes: Vec<String>,

    /// 視為鎖競爭的訊息片段（不分大小寫）
    pub transient_substrings: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step_ms: 1000,
            transient_codes: vec!["LockWaitTimeout".to_string(), "1205".to_string()],
            transient_substrings: vec![
                "lock wait timeout".to_string(),
                "deadlock".to_string(),
                "document has been modified".to_string(),
            ],
        }
    }
}

impl RetryPolicy {
    /// 建構器模式：設置最多嘗試次數
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// 建構器模式：設置退避步長
    pub fn with_backoff_step_ms(mut self, step_ms: u64) -> Self {
        self.backoff_step_ms = step_ms;
        self
    }

    /// 第 `attempt` 次嘗試失敗後的等待時間
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(attempt)))
    }

    /// 判斷錯誤是否屬於暫時性鎖競爭
    pub fn is_transient(&self, code: Option<&str>, message: &str) -> bool {
        if let Some(code) = code {
            if self.transient_codes.iter().any(|c| c == code) {
                return true;
            }
        }
        let message = message.to_lowercase();
        self.transient_substrings
            .iter()
            .any(|s| message.contains(&s.to_lowercase()))
    }
}

/// 品項類型代碼（持久化名稱的一部分）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTypeCodes {
    pub mattress_automatic: String,
    pub mattress_manual: String,
    pub adhesive_automatic: String,
    pub adhesive_manual: String,
    pub along: String,
    pub weft: String,
    pub bias: String,
    /// 布條列隱含的底布鋪布（依布條類型區分）
    pub backing_along: String,
    pub backing_weft: String,
    pub backing_bias: String,
}

impl Default for ItemTypeCodes {
    fn default() -> Self {
        Self {
            mattress_automatic: "AS".to_string(),
            mattress_manual: "MS".to_string(),
            adhesive_automatic: "AA".to_string(),
            adhesive_manual: "AM".to_string(),
            along: "CA".to_string(),
            weft: "CW".to_string(),
            bias: "CB".to_string(),
            backing_along: "CMA".to_string(),
            backing_weft: "CMW".to_string(),
            backing_bias: "CMB".to_string(),
        }
    }
}

impl ItemTypeCodes {
    /// 依裁剪表類型與鋪布方式取得代碼（未指定鋪布方式時視為自動）
    pub fn code_for(&self, table_type: TableType, method: Option<SpreadingMethod>) -> &str {
        let manual = method == Some(SpreadingMethod::Manual);
        match table_type {
            TableType::Mattress if manual => &self.mattress_manual,
            TableType::Mattress => &self.mattress_automatic,
            TableType::Adhesive if manual => &self.adhesive_manual,
            TableType::Adhesive => &self.adhesive_automatic,
            TableType::Along => &self.along,
            TableType::Weft => &self.weft,
            TableType::Bias => &self.bias,
        }
    }

    /// 布條類型的底布鋪布代碼；鋪布類回傳 `None`
    pub fn backing_code_for(&self, table_type: TableType) -> Option<&str> {
        match table_type {
            TableType::Along => Some(&self.backing_along),
            TableType::Weft => Some(&self.backing_weft),
            TableType::Bias => Some(&self.backing_bias),
            TableType::Mattress | TableType::Adhesive => None,
        }
    }
}

/// 裁剪室 + 目的地 → 組合簡碼
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationKeyEntry {
    pub cutting_room: String,
    pub destination: String,
    pub key: String,
}

/// 引擎配置（外部查找表與重試策略）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 重試策略
    pub retry: RetryPolicy,

    /// 品項類型代碼
    pub item_type_codes: ItemTypeCodes,

    /// 組合簡碼查找表
    pub combination_keys: Vec<CombinationKeyEntry>,

    /// 必須指定目的地的裁剪室
    pub destination_required_rooms: Vec<String>,
}

impl EngineConfig {
    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 建構器模式：設置重試策略
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 建構器模式：設置品項類型代碼
    pub fn with_item_type_codes(mut self, codes: ItemTypeCodes) -> Self {
        self.item_type_codes = codes;
        self
    }

    /// 建構器模式：添加組合簡碼
    pub fn with_combination_key(
        mut self,
        cutting_room: impl Into<String>,
        destination: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.combination_keys.push(CombinationKeyEntry {
            cutting_room: cutting_room.into(),
            destination: destination.into(),
            key: key.into(),
        });
        self
    }

    /// 建構器模式：設置必須指定目的地的裁剪室
    pub fn with_destination_required_room(mut self, cutting_room: impl Into<String>) -> Self {
        self.destination_required_rooms.push(cutting_room.into());
        self
    }

    /// 查找組合簡碼
    pub fn combination_key(&self, cutting_room: &str, destination: &str) -> Option<&str> {
        self.combination_keys
            .iter()
            .find(|e| e.cutting_room == cutting_room && e.destination == destination)
            .map(|e| e.key.as_str())
    }

    /// 該裁剪室是否必須指定目的地
    pub fn requires_destination(&self, cutting_room: &str) -> bool {
        self.destination_required_rooms.iter().any(|r| r == cutting_room)
    }
}
