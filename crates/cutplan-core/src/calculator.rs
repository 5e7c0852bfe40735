//! 排料數量試算模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::quantity::SizeQuantityMap;
use crate::{CutPlanError, Result};

/// 試算基準來源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSelector {
    /// 原始訂單
    Original,
    /// 另一個試算分頁的計算結果
    Tab(String),
    /// 指定裁剪表的計劃彙總
    Table(String),
}

impl Default for BaselineSelector {
    fn default() -> Self {
        Self::Original
    }
}

impl fmt::Display for BaselineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineSelector::Original => f.write_str("original"),
            BaselineSelector::Tab(id) => write!(f, "tab:{}", id),
            BaselineSelector::Table(id) => write!(f, "table:{}", id),
        }
    }
}

impl FromStr for BaselineSelector {
    type Err = CutPlanError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "original" {
            return Ok(Self::Original);
        }
        match s.split_once(':') {
            Some(("tab", id)) if !id.is_empty() => Ok(Self::Tab(id.to_string())),
            Some(("table", id)) if !id.is_empty() => Ok(Self::Table(id.to_string())),
            _ => Err(CutPlanError::InvalidBaselineKey(s.to_string())),
        }
    }
}

/// 試算表位置（左側主表 / 右側對照表）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabSide {
    Left,
    Right,
}

/// 試算排料（無獨立遠端識別）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorMarker {
    /// 幅寬
    pub width: Decimal,

    /// 每層各尺碼件數
    pub quantities: SizeQuantityMap,

    /// 層數
    pub layers: u32,
}

impl CalculatorMarker {
    pub fn new(width: Decimal, quantities: SizeQuantityMap, layers: u32) -> Self {
        Self {
            width,
            quantities,
            layers,
        }
    }

    /// 該排料產出的各尺碼件數
    pub fn produced(&self) -> SizeQuantityMap {
        self.quantities.scaled(Decimal::from(self.layers))
    }
}

/// 試算分頁
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorTab {
    /// 分頁ID
    pub id: String,

    /// 分頁序號（持久化鍵）
    pub tab_number: u32,

    /// 基準來源
    pub baseline: BaselineSelector,

    /// 左側排料
    pub markers: Vec<CalculatorMarker>,

    /// 右側對照表排料
    pub right_markers: Vec<CalculatorMarker>,
}

impl CalculatorTab {
    /// 創建新的試算分頁
    pub fn new(id: impl Into<String>, tab_number: u32) -> Self {
        Self {
            id: id.into(),
            tab_number,
            baseline: BaselineSelector::Original,
            markers: Vec::new(),
            right_markers: Vec::new(),
        }
    }

    /// 建構器模式：設置基準
    pub fn with_baseline(mut self, baseline: BaselineSelector) -> Self {
        self.baseline = baseline;
        self
    }

    /// 建構器模式：添加排料
    pub fn with_marker(mut self, marker: CalculatorMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// 建構器模式：添加右側對照排料
    pub fn with_right_marker(mut self, marker: CalculatorMarker) -> Self {
        self.right_markers.push(marker);
        self
    }

    /// 取得指定側的排料
    pub fn markers_for(&self, side: TabSide) -> &[CalculatorMarker] {
        match side {
            TabSide::Left => &self.markers,
            TabSide::Right => &self.right_markers,
        }
    }

    /// 是否有右側對照表
    pub fn has_right_table(&self) -> bool {
        !self.right_markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("original", BaselineSelector::Original)]
    #[case("", BaselineSelector::Original)]
    #[case("tab:t2", BaselineSelector::Tab("t2".to_string()))]
    #[case("table:abc", BaselineSelector::Table("abc".to_string()))]
    fn test_parse_baseline(#[case] key: &str, #[case] expected: BaselineSelector) {
        assert_eq!(key.parse::<BaselineSelector>().unwrap(), expected);
    }

    #[test]
    fn test_baseline_round_trip_key() {
        let selector = BaselineSelector::Table("T-9".to_string());
        assert_eq!(selector.to_string(), "table:T-9");
        assert!("tab:".parse::<BaselineSelector>().is_err());
        assert!("unknown".parse::<BaselineSelector>().is_err());
    }

    #[test]
    fn test_marker_produced() {
        let marker = CalculatorMarker::new(
            Decimal::from(150),
            SizeQuantityMap::new().with("3-4", 2).with("5-6", 1),
            12,
        );
        let produced = marker.produced();
        assert_eq!(produced.get("3-4"), Decimal::from(24));
        assert_eq!(produced.get("5-6"), Decimal::from(12));
    }
}
