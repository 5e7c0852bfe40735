//! 排料試算分頁的持久化對應
//!
//! 每個分頁以 (訂單, 組合, 分頁鍵) 保存；分頁鍵為序號，右側對照表加上 `_right` 後綴。

use cutplan_core::{
    BaselineSelector, CalculatorTab, CutPlanError, RetryPolicy, TabSide,
};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::payload::{CalculatorSavePayload, CalculatorTabRecord};
use crate::retry::with_retry;
use crate::store::{PlanningStore, StoreError};

const RIGHT_SUFFIX: &str = "_right";

/// 試算同步錯誤
#[derive(Debug, thiserror::Error)]
pub enum CalculatorSyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] CutPlanError),
}

/// 試算同步結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculatorSyncReport {
    pub saved: Vec<String>,
    pub deleted: Vec<String>,
    pub failed_deletes: Vec<String>,
}

/// 分頁鍵：`"3"` 或 `"3_right"`
pub fn tab_key(tab_number: u32, side: TabSide) -> String {
    match side {
        TabSide::Left => tab_number.to_string(),
        TabSide::Right => format!("{tab_number}{RIGHT_SUFFIX}"),
    }
}

/// 解析分頁鍵
pub fn parse_tab_key(key: &str) -> Result<(u32, TabSide), CutPlanError> {
    let (number, side) = match key.strip_suffix(RIGHT_SUFFIX) {
        Some(number) => (number, TabSide::Right),
        None => (key, TabSide::Left),
    };
    number
        .parse::<u32>()
        .map(|n| (n, side))
        .map_err(|_| CutPlanError::InvalidTabKey(key.to_string()))
}

/// 分頁轉為遠端記錄；右側對照表有排料時才產生右側記錄
///
/// 載入後分頁ID即為序號，因此引用其他分頁的基準一律以序號寫入。
pub fn records_from_tabs(tabs: &[CalculatorTab]) -> Vec<(String, CalculatorTabRecord)> {
    let numbers: HashMap<&str, u32> = tabs
        .iter()
        .map(|t| (t.id.as_str(), t.tab_number))
        .collect();

    let mut records = Vec::new();
    for tab in tabs {
        let selected_baseline = stored_baseline(&tab.baseline, &numbers);
        records.push((
            tab_key(tab.tab_number, TabSide::Left),
            CalculatorTabRecord {
                selected_baseline: selected_baseline.clone(),
                markers: tab.markers.clone(),
            },
        ));

        if tab.has_right_table() {
            records.push((
                tab_key(tab.tab_number, TabSide::Right),
                CalculatorTabRecord {
                    selected_baseline,
                    markers: tab.right_markers.clone(),
                },
            ));
        }
    }
    records
}

fn stored_baseline(baseline: &BaselineSelector, numbers: &HashMap<&str, u32>) -> String {
    match baseline {
        BaselineSelector::Tab(id) => match numbers.get(id.as_str()) {
            Some(number) => BaselineSelector::Tab(number.to_string()).to_string(),
            None => {
                tracing::warn!("基準引用的分頁 {} 不存在", id);
                baseline.to_string()
            }
        },
        other => other.to_string(),
    }
}

/// 遠端記錄轉為分頁（依序號排序，分頁ID為序號）
///
/// 右側記錄的基準欄位不使用；無法解析的基準退回原始訂單。
pub fn tabs_from_records(
    records: &BTreeMap<String, CalculatorTabRecord>,
) -> Result<Vec<CalculatorTab>, CutPlanError> {
    let mut tabs: BTreeMap<u32, CalculatorTab> = BTreeMap::new();

    for (key, record) in records {
        let (number, side) = parse_tab_key(key)?;
        let tab = tabs
            .entry(number)
            .or_insert_with(|| CalculatorTab::new(number.to_string(), number));

        match side {
            TabSide::Left => {
                tab.baseline = record.selected_baseline.parse().unwrap_or_else(|err| {
                    tracing::warn!("分頁 {} 基準無法解析，改用原始訂單: {}", key, err);
                    BaselineSelector::Original
                });
                tab.markers = record.markers.clone();
            }
            TabSide::Right => tab.right_markers = record.markers.clone(),
        }
    }

    Ok(tabs.into_values().collect())
}

/// 讀取試算分頁，同時回傳載入時的分頁鍵（供之後計算刪除集合）
pub async fn load_calculator<S: PlanningStore>(
    store: &S,
    policy: &RetryPolicy,
    order: &str,
    combination_id: &str,
) -> Result<(Vec<CalculatorTab>, BTreeSet<String>), CalculatorSyncError> {
    let records = with_retry(policy, "讀取試算分頁", || {
        store.load_calculator(order, combination_id)
    })
    .await?;

    let keys = records.keys().cloned().collect();
    let tabs = tabs_from_records(&records)?;
    tracing::debug!("訂單 {} 組合 {} 載入 {} 個試算分頁", order, combination_id, tabs.len());
    Ok((tabs, keys))
}

/// 保存所有分頁，並刪除載入後已移除的分頁
///
/// 保存依序進行，任一失敗即中止；刪除同時送出，個別失敗只記錄。
pub async fn sync_calculator<S: PlanningStore>(
    store: &S,
    policy: &RetryPolicy,
    order: &str,
    combination_id: &str,
    tabs: &[CalculatorTab],
    loaded_keys: &BTreeSet<String>,
) -> Result<CalculatorSyncReport, StoreError> {
    let mut report = CalculatorSyncReport::default();
    let mut current = BTreeSet::new();

    for (key, record) in records_from_tabs(tabs) {
        let payload = CalculatorSavePayload {
            order: order.to_string(),
            combination_id: combination_id.to_string(),
            tab_key: key.clone(),
            record,
        };
        with_retry(policy, "保存試算分頁", || store.save_calculator(&payload)).await?;
        current.insert(key.clone());
        report.saved.push(key);
    }

    let removed: Vec<&String> = loaded_keys.difference(&current).collect();
    let results = join_all(removed.iter().map(|key| {
        with_retry(policy, "刪除試算分頁", move || {
            store.delete_calculator_tab(order, combination_id, key)
        })
    }))
    .await;

    for (key, result) in removed.into_iter().zip(results) {
        match result {
            Err(err) if !err.is_not_found() => {
                tracing::warn!("試算分頁 {} 刪除失敗: {}", key, err);
                report.failed_deletes.push(key.clone());
            }
            _ => report.deleted.push(key.clone()),
        }
    }

    tracing::info!(
        "訂單 {} 試算同步: 保存 {} 個, 刪除 {} 個",
        order,
        report.saved.len(),
        report.deleted.len()
    );
    Ok(report)
}
