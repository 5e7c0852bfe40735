//! 排料試算基準解析

use cutplan_core::{BaselineSelector, CalculatorTab, Order, PlanningTable, SizeQuantityMap, TabSide};
use std::collections::HashSet;

use crate::aggregation::QuantityAggregator;
use crate::coverage::{coverage_by_size, SizeCoverage};
use crate::size_key::SizeKeyNormalizer;

/// 基準解析錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BaselineError {
    #[error("試算分頁基準形成循環: {}", .0.join(" → "))]
    Cycle(Vec<String>),

    #[error("找不到基準試算分頁: {0}")]
    TabNotFound(String),

    #[error("找不到基準裁剪表: {0}")]
    TableNotFound(String),
}

/// 基準解析器
///
/// 分頁之間的基準引用構成依賴圖；解析時沿引用鏈前進並記錄已走訪分頁，
/// 重複走訪即視為循環。
pub struct BaselineResolver<'a> {
    tabs: &'a [CalculatorTab],
    tables: &'a [PlanningTable],
}

impl<'a> BaselineResolver<'a> {
    pub fn new(tabs: &'a [CalculatorTab], tables: &'a [PlanningTable]) -> Self {
        Self { tabs, tables }
    }

    /// 分頁自身計算結果：Σ 排料件數 × 層數（尺碼鍵已正規化）
    pub fn tab_totals(tab: &CalculatorTab, side: TabSide) -> SizeQuantityMap {
        let mut totals = SizeQuantityMap::new();
        for marker in tab.markers_for(side) {
            totals.merge(&marker.produced());
        }
        SizeKeyNormalizer::normalize_map(&totals)
    }

    /// 解析分頁的目標數量
    pub fn resolve_target(
        &self,
        tab: &CalculatorTab,
        order: &Order,
    ) -> Result<SizeQuantityMap, BaselineError> {
        self.check_chain(tab)?;

        match &tab.baseline {
            BaselineSelector::Original => {
                Ok(SizeKeyNormalizer::normalize_map(&order.size_quantities()))
            }
            BaselineSelector::Tab(id) => {
                let source = self.find_tab(id)?;
                Ok(Self::tab_totals(source, TabSide::Left))
            }
            BaselineSelector::Table(id) => {
                let table = self
                    .tables
                    .iter()
                    .find(|t| &t.id == id)
                    .ok_or_else(|| BaselineError::TableNotFound(id.clone()))?;
                Ok(QuantityAggregator::planned_by_size(table))
            }
        }
    }

    /// 解析失敗時退回原始訂單
    pub fn resolve_or_original(&self, tab: &CalculatorTab, order: &Order) -> SizeQuantityMap {
        match self.resolve_target(tab, order) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!("分頁 {} 基準解析失敗，改用原始訂單: {}", tab.id, err);
                SizeKeyNormalizer::normalize_map(&order.size_quantities())
            }
        }
    }

    /// 左側覆蓋率（基準解析失敗時退回原始訂單）
    pub fn tab_coverage(&self, tab: &CalculatorTab, order: &Order) -> Vec<SizeCoverage> {
        let target = self.resolve_or_original(tab, order);
        coverage_by_size(order, &target, &Self::tab_totals(tab, TabSide::Left))
    }

    /// 右側對照表的基準固定為左側自身計算結果
    pub fn right_target(tab: &CalculatorTab) -> SizeQuantityMap {
        Self::tab_totals(tab, TabSide::Left)
    }

    /// 右側覆蓋率：右側計算結果 / 左側計算結果
    pub fn right_coverage(tab: &CalculatorTab, order: &Order) -> Vec<SizeCoverage> {
        coverage_by_size(
            order,
            &Self::right_target(tab),
            &Self::tab_totals(tab, TabSide::Right),
        )
    }

    fn find_tab(&self, id: &str) -> Result<&'a CalculatorTab, BaselineError> {
        self.tabs
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| BaselineError::TabNotFound(id.to_string()))
    }

    /// 沿基準引用鏈檢查循環
    fn check_chain(&self, tab: &CalculatorTab) -> Result<(), BaselineError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut path = vec![tab.id.clone()];
        visited.insert(tab.id.as_str());

        let mut current = tab;
        while let BaselineSelector::Tab(next_id) = &current.baseline {
            path.push(next_id.clone());
            if !visited.insert(next_id.as_str()) {
                return Err(BaselineError::Cycle(path));
            }
            current = self.find_tab(next_id)?;
        }
        Ok(())
    }
}
