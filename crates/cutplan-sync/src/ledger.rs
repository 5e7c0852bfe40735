//! 刪除帳本

use cutplan_core::{Identity, TableType};
use std::collections::{BTreeMap, BTreeSet};

/// 待刪除識別帳本（依裁剪表類型分組）
///
/// 資料列被移除時其已持久化的識別進入帳本；只有在遠端確認刪除
/// （或回報不存在）後才會離開帳本。
#[derive(Debug, Clone, Default)]
pub struct DeletionLedger {
    entries: BTreeMap<TableType, BTreeSet<Identity>>,
}

impl DeletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記識別為待刪除
    pub fn mark_deleted(&mut self, table_type: TableType, identity: Identity) {
        tracing::debug!("標記待刪除: {} ({})", identity, table_type);
        self.entries.entry(table_type).or_default().insert(identity);
    }

    /// 是否已標記
    pub fn contains(&self, table_type: TableType, identity: &Identity) -> bool {
        self.entries
            .get(&table_type)
            .is_some_and(|set| set.contains(identity))
    }

    /// 指定類型的待刪除識別
    pub fn pending(&self, table_type: TableType) -> Vec<Identity> {
        self.entries
            .get(&table_type)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 所有待刪除識別（依存檔順序）
    pub fn all_pending(&self) -> Vec<Identity> {
        TableType::SAVE_ORDER
            .iter()
            .flat_map(|t| self.pending(*t))
            .collect()
    }

    /// 計算刪除集合：帳本 − 目前識別
    ///
    /// 仍存在於目前集合中的識別代表資料列已重新加入，直接從帳本移除，
    /// 不會送出刪除。
    pub fn take_delete_set(
        &mut self,
        table_type: TableType,
        current: &BTreeSet<Identity>,
    ) -> Vec<Identity> {
        let Some(set) = self.entries.get_mut(&table_type) else {
            return Vec::new();
        };
        set.retain(|identity| !current.contains(identity));
        let to_delete: Vec<Identity> = set.iter().cloned().collect();
        if set.is_empty() {
            self.entries.remove(&table_type);
        }
        to_delete
    }

    /// 遠端確認刪除後移出帳本
    pub fn confirm(&mut self, table_type: TableType, identity: &Identity) -> bool {
        let Some(set) = self.entries.get_mut(&table_type) else {
            return false;
        };
        let removed = set.remove(identity);
        if set.is_empty() {
            self.entries.remove(&table_type);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空帳本（訂單整體替換時）
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// 待刪除生產中心組合帳本
#[derive(Debug, Clone, Default)]
pub struct CombinationLedger {
    combination_ids: BTreeSet<String>,
}

impl CombinationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_deleted(&mut self, combination_id: impl Into<String>) {
        self.combination_ids.insert(combination_id.into());
    }

    /// 重新加入的組合不再刪除
    pub fn forget(&mut self, combination_id: &str) -> bool {
        self.combination_ids.remove(combination_id)
    }

    pub fn pending(&self) -> Vec<String> {
        self.combination_ids.iter().cloned().collect()
    }

    pub fn confirm(&mut self, combination_id: &str) -> bool {
        self.combination_ids.remove(combination_id)
    }

    pub fn is_empty(&self) -> bool {
        self.combination_ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.combination_ids.clear();
    }
}
