//! 持久化識別命名

use cutplan_core::{
    EngineConfig, Identity, ItemTypeCodes, PlanningRow, PlanningTable,
    ProductionCenterCombination,
};
use std::collections::HashMap;

/// 訂單號尾碼長度
const ORDER_SUFFIX_LEN: usize = 6;

/// 識別命名器
///
/// 格式：`[組合簡碼-]訂單尾碼-品項代碼-布料類型-三位序號`。
/// 純函數，從重新載入的快照可推導出完全相同的結果，存檔流程依此辨認「同一列」。
#[derive(Debug, Clone)]
pub struct IdentityNamer {
    combination_keys: HashMap<(String, String), String>,
    codes: ItemTypeCodes,
}

impl IdentityNamer {
    /// 從引擎配置建立命名器
    pub fn from_config(config: &EngineConfig) -> Self {
        let combination_keys = config
            .combination_keys
            .iter()
            .map(|e| ((e.cutting_room.clone(), e.destination.clone()), e.key.clone()))
            .collect();

        Self {
            combination_keys,
            codes: config.item_type_codes.clone(),
        }
    }

    /// 推導識別
    pub fn derive_identity(
        &self,
        combination: &ProductionCenterCombination,
        order_id: &str,
        item_type_code: &str,
        fabric_type: &str,
        sequence_number: u32,
    ) -> Identity {
        self.compose(
            &combination.cutting_room,
            &combination.destination,
            order_id,
            item_type_code,
            fabric_type,
            sequence_number,
        )
    }

    /// 資料列的識別（使用裁剪表上的組合冗餘欄位）
    pub fn identity_for_row(
        &self,
        table: &PlanningTable,
        order_id: &str,
        row: &PlanningRow,
    ) -> Identity {
        let code = self.item_type_code(table);
        self.compose(
            &table.cutting_room,
            &table.destination,
            order_id,
            code,
            &table.fabric_type,
            row.sequence_number,
        )
    }

    /// 布條列隱含底布鋪布的識別；鋪布類回傳 `None`
    pub fn backing_identity_for_row(
        &self,
        table: &PlanningTable,
        order_id: &str,
        row: &PlanningRow,
    ) -> Option<Identity> {
        let code = self.backing_item_type_code(table)?;
        Some(self.compose(
            &table.cutting_room,
            &table.destination,
            order_id,
            code,
            &table.fabric_type,
            row.sequence_number,
        ))
    }

    /// 資料列擁有的全部識別（布條列含底布）
    pub fn identities_for_row(
        &self,
        table: &PlanningTable,
        order_id: &str,
        row: &PlanningRow,
    ) -> Vec<Identity> {
        let mut identities = vec![self.identity_for_row(table, order_id, row)];
        identities.extend(self.backing_identity_for_row(table, order_id, row));
        identities
    }

    /// 裁剪表對應的品項代碼
    pub fn item_type_code(&self, table: &PlanningTable) -> &str {
        self.codes.code_for(table.table_type, table.spreading_method)
    }

    /// 布條底布的品項代碼（依布條類型）
    pub fn backing_item_type_code(&self, table: &PlanningTable) -> Option<&str> {
        self.codes.backing_code_for(table.table_type)
    }

    /// 組合簡碼（查無時為 `None`）
    pub fn combination_key(&self, cutting_room: &str, destination: &str) -> Option<&str> {
        self.combination_keys
            .get(&(cutting_room.to_string(), destination.to_string()))
            .map(String::as_str)
    }

    fn compose(
        &self,
        cutting_room: &str,
        destination: &str,
        order_id: &str,
        item_type_code: &str,
        fabric_type: &str,
        sequence_number: u32,
    ) -> Identity {
        let suffix = order_suffix(order_id);
        let name = match self.combination_key(cutting_room, destination) {
            Some(key) => format!(
                "{}-{}-{}-{}-{:03}",
                key, suffix, item_type_code, fabric_type, sequence_number
            ),
            None => format!(
                "{}-{}-{}-{:03}",
                suffix, item_type_code, fabric_type, sequence_number
            ),
        };
        Identity::new(name)
    }
}

/// 訂單號最後 6 個字元（不足時取全部）
pub fn order_suffix(order_id: &str) -> &str {
    let count = order_id.chars().count();
    if count <= ORDER_SUFFIX_LEN {
        return order_id;
    }
    let start = order_id
        .char_indices()
        .nth(count - ORDER_SUFFIX_LEN)
        .map_or(0, |(i, _)| i);
    &order_id[start..]
}
