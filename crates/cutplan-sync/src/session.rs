//! 計劃編輯工作階段

use cutplan_calc::IdentityNamer;
use cutplan_core::{
    CutPlanError, Order, PlanningRow, PlanningTable, ProductionCenterCombination, Result, TableType,
};
use uuid::Uuid;

use crate::ledger::{CombinationLedger, DeletionLedger};

/// 單一訂單的計劃編輯狀態
///
/// 持有訂單快照、生產中心組合、裁剪表與刪除帳本。所有使用者編輯都經由此處，
/// 帳本只會被編輯操作與存檔流程修改。
#[derive(Debug, Clone)]
pub struct PlanningSession {
    pub(crate) order: Order,
    pub(crate) combinations: Vec<ProductionCenterCombination>,
    pub(crate) tables: Vec<PlanningTable>,
    pub(crate) ledger: DeletionLedger,
    pub(crate) combination_ledger: CombinationLedger,
    pub(crate) comment: String,
    pub(crate) comment_changed: bool,
    pub(crate) dirty: bool,
}

impl PlanningSession {
    /// 創建空白工作階段
    pub fn new(order: Order) -> Self {
        Self {
            order,
            combinations: Vec::new(),
            tables: Vec::new(),
            ledger: DeletionLedger::new(),
            combination_ledger: CombinationLedger::new(),
            comment: String::new(),
            comment_changed: false,
            dirty: false,
        }
    }

    /// 從遠端載入的快照建立工作階段
    ///
    /// 載入的資料列皆已持久化，其識別由命名規則重新推導。
    pub fn from_remote(
        order: Order,
        combinations: Vec<ProductionCenterCombination>,
        mut tables: Vec<PlanningTable>,
        comment: impl Into<String>,
        namer: &IdentityNamer,
    ) -> Self {
        for table in &mut tables {
            let snapshot = table.clone();
            for (row, original) in table.rows.iter_mut().zip(&snapshot.rows) {
                row.persisted_identities = namer.identities_for_row(&snapshot, &order.id, original);
            }
        }

        tracing::info!(
            "載入訂單 {}: {} 個組合, {} 張裁剪表",
            order.id,
            combinations.len(),
            tables.len()
        );

        Self {
            combinations,
            tables,
            comment: comment.into(),
            ..Self::new(order)
        }
    }

    /// 訂單整體替換：捨棄所有編輯狀態
    pub fn replace_order(&mut self, order: Order) {
        tracing::info!("訂單替換: {} → {}", self.order.id, order.id);
        *self = Self::new(order);
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn combinations(&self) -> &[ProductionCenterCombination] {
        &self.combinations
    }

    pub fn tables(&self) -> &[PlanningTable] {
        &self.tables
    }

    /// 指定類型的裁剪表
    pub fn tables_of(&self, table_type: TableType) -> impl Iterator<Item = &PlanningTable> {
        self.tables.iter().filter(move |t| t.table_type == table_type)
    }

    pub fn table(&self, table_id: &str) -> Option<&PlanningTable> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    /// 取得可編輯的裁剪表（標記為未存檔）
    pub fn table_mut(&mut self, table_id: &str) -> Result<&mut PlanningTable> {
        self.dirty = true;
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| CutPlanError::TableNotFound(table_id.to_string()))
    }

    pub fn ledger(&self) -> &DeletionLedger {
        &self.ledger
    }

    pub fn combination_ledger(&self) -> &CombinationLedger {
        &self.combination_ledger
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn comment_changed(&self) -> bool {
        self.comment_changed
    }

    /// 是否有未存檔的編輯
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.comment_changed || !self.ledger.is_empty()
    }

    /// 存檔完成後標記為乾淨
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.comment_changed = false;
    }

    /// 新增生產中心組合
    pub fn add_combination(&mut self, combination: ProductionCenterCombination) -> Result<()> {
        if self
            .combinations
            .iter()
            .any(|c| c.same_assignment(&combination))
        {
            return Err(CutPlanError::DuplicateCombination {
                production_center: combination.production_center,
                cutting_room: combination.cutting_room,
                destination: combination.destination,
            });
        }

        self.combination_ledger.forget(&combination.combination_id);
        self.combinations.push(combination);
        self.dirty = true;
        Ok(())
    }

    /// 修改組合指派，並同步使用該組合的裁剪表
    pub fn update_combination(
        &mut self,
        combination_id: &str,
        production_center: impl Into<String>,
        cutting_room: impl Into<String>,
        destination: impl Into<String>,
    ) -> Result<()> {
        let updated = ProductionCenterCombination::new(production_center, cutting_room, destination)
            .with_id(combination_id);

        if self
            .combinations
            .iter()
            .any(|c| c.combination_id != combination_id && c.same_assignment(&updated))
        {
            return Err(CutPlanError::DuplicateCombination {
                production_center: updated.production_center,
                cutting_room: updated.cutting_room,
                destination: updated.destination,
            });
        }

        let slot = self
            .combinations
            .iter_mut()
            .find(|c| c.combination_id == combination_id)
            .ok_or_else(|| CutPlanError::CombinationNotFound(combination_id.to_string()))?;
        *slot = updated.clone();

        for table in self.tables.iter_mut().filter(|t| t.uses_combination(combination_id)) {
            table.assign_combination(&updated);
        }
        self.dirty = true;
        Ok(())
    }

    /// 刪除組合：先移除所有使用該組合的裁剪表，再將組合放入刪除帳本
    ///
    /// 回傳被移除的裁剪表ID。
    pub fn delete_combination(&mut self, combination_id: &str) -> Result<Vec<String>> {
        let index = self
            .combinations
            .iter()
            .position(|c| c.combination_id == combination_id)
            .ok_or_else(|| CutPlanError::CombinationNotFound(combination_id.to_string()))?;

        let removed: Vec<String> = self
            .tables
            .iter()
            .filter(|t| t.uses_combination(combination_id))
            .map(|t| t.id.clone())
            .collect();
        for table_id in &removed {
            self.remove_table(table_id)?;
        }

        self.combinations.remove(index);
        self.combination_ledger.mark_deleted(combination_id);
        self.dirty = true;

        tracing::info!(
            "刪除組合 {}，連帶移除 {} 張裁剪表",
            combination_id,
            removed.len()
        );
        Ok(removed)
    }

    /// 新增裁剪表，回傳其ID
    pub fn add_table(&mut self, table: PlanningTable) -> String {
        let id = table.id.clone();
        self.tables.push(table);
        self.dirty = true;
        id
    }

    /// 移除裁剪表，已持久化的資料列進入刪除帳本
    pub fn remove_table(&mut self, table_id: &str) -> Result<PlanningTable> {
        let index = self
            .tables
            .iter()
            .position(|t| t.id == table_id)
            .ok_or_else(|| CutPlanError::TableNotFound(table_id.to_string()))?;

        let table = self.tables.remove(index);
        for row in &table.rows {
            self.mark_row_deleted(table.table_type, row);
        }
        self.dirty = true;
        Ok(table)
    }

    /// 為裁剪表指派組合
    pub fn assign_combination(&mut self, table_id: &str, combination_id: &str) -> Result<()> {
        let combination = self
            .combinations
            .iter()
            .find(|c| c.combination_id == combination_id)
            .cloned()
            .ok_or_else(|| CutPlanError::CombinationNotFound(combination_id.to_string()))?;

        self.table_mut(table_id)?.assign_combination(&combination);
        Ok(())
    }

    /// 新增資料列
    pub fn add_row(&mut self, table_id: &str, row: PlanningRow) -> Result<()> {
        self.table_mut(table_id)?.rows.push(row);
        Ok(())
    }

    /// 移除資料列，已持久化的識別進入刪除帳本
    pub fn remove_row(&mut self, table_id: &str, row_id: Uuid) -> Result<PlanningRow> {
        let table = self.table_mut(table_id)?;
        let table_type = table.table_type;
        let index = table
            .rows
            .iter()
            .position(|r| r.id == row_id)
            .ok_or_else(|| CutPlanError::RowNotFound(row_id.to_string()))?;

        let row = table.rows.remove(index);
        self.mark_row_deleted(table_type, &row);
        Ok(row)
    }

    /// 修改訂單備註
    pub fn set_comment(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.comment {
            self.comment = text;
            self.comment_changed = true;
        }
    }

    fn mark_row_deleted(&mut self, table_type: TableType, row: &PlanningRow) {
        for identity in &row.persisted_identities {
            self.ledger.mark_deleted(table_type, identity.clone());
        }
    }
}
