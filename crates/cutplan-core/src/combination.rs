//! 生產中心組合模型

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 同一微秒內建立多個組合時的遞增序號
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 客戶端組合ID：`微秒時間-序號`
fn generate_combination_id() -> String {
    let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_micros(), sequence)
}

/// 生產中心組合（生產中心 / 裁剪室 / 目的地）
///
/// 同一訂單內 (production_center, cutting_room, destination) 不可重複。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCenterCombination {
    /// 組合ID（未持久化前由客戶端以時間產生）
    pub combination_id: String,

    /// 生產中心
    pub production_center: String,

    /// 裁剪室
    pub cutting_room: String,

    /// 目的地（視裁剪室而定，可為空）
    pub destination: String,
}

impl ProductionCenterCombination {
    /// 創建新的組合，ID 取當前時間（微秒）加遞增序號
    pub fn new(
        production_center: impl Into<String>,
        cutting_room: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            combination_id: generate_combination_id(),
            production_center: production_center.into(),
            cutting_room: cutting_room.into(),
            destination: destination.into(),
        }
    }

    /// 建構器模式：指定組合ID（已持久化的組合）
    pub fn with_id(mut self, combination_id: impl Into<String>) -> Self {
        self.combination_id = combination_id.into();
        self
    }

    /// 檢查兩個組合是否指派到相同位置
    pub fn same_assignment(&self, other: &ProductionCenterCombination) -> bool {
        self.production_center == other.production_center
            && self.cutting_room == other.cutting_room
            && self.destination == other.destination
    }
}
