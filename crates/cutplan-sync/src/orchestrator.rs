//! 存檔協調流程
//!
//! 狀態依序為：驗證 → 保存組合指派 → 依類型保存實體 → 依類型刪除 → 保存附屬資料 → 完成。
//! 任一階段中止時已完成的寫入保留，重新存檔以識別為鍵，結果相同。

use cutplan_calc::IdentityNamer;
use cutplan_core::{orders_from_lines, EngineConfig, Identity, Order, OrderStatus, TableType};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::payload::{CommentPayload, EntityPayload, ProductionCenterPayload};
use crate::retry::with_retry;
use crate::session::PlanningSession;
use crate::store::{PlanningStore, StoreError};
use crate::validation::{validate_snapshot, ValidationError};

/// 存檔階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Validating,
    SavingCombinations,
    SavingEntities(TableType),
    Deleting(TableType),
    DeletingCombinations,
    SavingAuxiliary,
    Done,
}

impl fmt::Display for SavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavePhase::Validating => f.write_str("驗證"),
            SavePhase::SavingCombinations => f.write_str("保存組合指派"),
            SavePhase::SavingEntities(t) => write!(f, "保存實體({t})"),
            SavePhase::Deleting(t) => write!(f, "刪除實體({t})"),
            SavePhase::DeletingCombinations => f.write_str("刪除組合"),
            SavePhase::SavingAuxiliary => f.write_str("保存附屬資料"),
            SavePhase::Done => f.write_str("完成"),
        }
    }
}

/// 單筆實體保存失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub identity: Identity,
    pub error: StoreError,
}

/// 存檔錯誤
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("存檔進行中，已忽略重複的存檔請求")]
    InProgress,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("裁剪表 {table_id} 的生產中心指派保存失敗: {source}")]
    Combination {
        table_id: String,
        #[source]
        source: StoreError,
    },

    #[error("{table_type} 共 {} 筆實體保存失敗", .failures.len())]
    Entities {
        table_type: TableType,
        failures: Vec<EntityFailure>,
    },
}

impl SaveError {
    /// 失敗所在的階段；重複請求不屬於任何階段
    pub fn failed_phase(&self) -> Option<SavePhase> {
        match self {
            SaveError::InProgress => None,
            SaveError::Validation(_) => Some(SavePhase::Validating),
            SaveError::Combination { .. } => Some(SavePhase::SavingCombinations),
            SaveError::Entities { table_type, .. } => Some(SavePhase::SavingEntities(*table_type)),
        }
    }
}

/// 存檔結果
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// 依序經過的階段
    pub phases: Vec<SavePhase>,

    /// 已保存的識別
    pub saved: Vec<Identity>,

    /// 已確認刪除的識別
    pub deleted: Vec<Identity>,

    /// 已確認刪除的組合
    pub deleted_combinations: Vec<String>,

    /// 刪除失敗、留待下次存檔的識別
    pub pending_deletes: Vec<Identity>,

    /// 附屬資料保存失敗（不影響其他結果）
    pub auxiliary_error: Option<StoreError>,
}

impl SaveReport {
    fn enter(&mut self, phase: SavePhase) {
        tracing::info!("存檔階段: {}", phase);
        self.phases.push(phase);
    }
}

/// 存檔旗標守衛，離開作用域時釋放
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 存檔協調器
pub struct ReconciliationOrchestrator<S> {
    store: S,
    config: EngineConfig,
    namer: IdentityNamer,
    in_flight: AtomicBool,
}

impl<S: PlanningStore> ReconciliationOrchestrator<S> {
    /// 創建新的協調器
    pub fn new(store: S, config: EngineConfig) -> Self {
        let namer = IdentityNamer::from_config(&config);
        Self {
            store,
            config,
            namer,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namer(&self) -> &IdentityNamer {
        &self.namer
    }

    /// 是否有存檔進行中
    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 讀取訂單明細並組成訂單（可依狀態篩選）
    pub async fn load_order(
        &self,
        order_id: &str,
        status: Option<OrderStatus>,
    ) -> Result<Option<Order>, StoreError> {
        let lines = with_retry(&self.config.retry, "讀取訂單", || {
            self.store.fetch_order_lines(order_id)
        })
        .await?;

        tracing::debug!("訂單 {} 讀取 {} 筆明細", order_id, lines.len());
        Ok(orders_from_lines(&lines, status)
            .into_iter()
            .find(|o| o.id == order_id))
    }

    /// 保存整份計劃
    pub async fn save(&self, session: &mut PlanningSession) -> Result<SaveReport, SaveError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("訂單 {} 存檔進行中，忽略重複請求", session.order.id);
            return Err(SaveError::InProgress);
        };

        let mut report = SaveReport::default();

        report.enter(SavePhase::Validating);
        if let Err(err) = validate_snapshot(&session.tables, &session.combinations, &self.config) {
            tracing::warn!("存檔驗證失敗: {}", err);
            return Err(err.into());
        }

        self.save_combinations(session, &mut report).await?;
        let current = self.save_entities(session, &mut report).await?;
        self.delete_stale(session, &current, &mut report).await;
        self.delete_combinations(session, &mut report).await;
        self.save_auxiliary(session, &mut report).await;

        report.enter(SavePhase::Done);
        session.dirty = false;
        report.pending_deletes = session.ledger.all_pending();

        tracing::info!(
            "訂單 {} 存檔完成: 保存 {} 筆, 刪除 {} 筆, 待刪除 {} 筆",
            session.order.id,
            report.saved.len(),
            report.deleted.len(),
            report.pending_deletes.len()
        );
        Ok(report)
    }

    /// 同時保存所有裁剪表的組合指派，任一失敗即中止
    async fn save_combinations(
        &self,
        session: &PlanningSession,
        report: &mut SaveReport,
    ) -> Result<(), SaveError> {
        report.enter(SavePhase::SavingCombinations);

        let payloads: Vec<ProductionCenterPayload> = session
            .tables
            .iter()
            .map(ProductionCenterPayload::from_table)
            .collect();

        let results = join_all(payloads.iter().map(|payload| {
            with_retry(&self.config.retry, "保存生產中心指派", move || {
                self.store.save_production_center(payload)
            })
        }))
        .await;

        for (payload, result) in payloads.iter().zip(results) {
            if let Err(source) = result {
                tracing::error!("裁剪表 {} 組合指派保存失敗: {}", payload.table_id, source);
                return Err(SaveError::Combination {
                    table_id: payload.table_id.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// 依類型順序逐列保存實體，回傳各類型的目前識別集合
    async fn save_entities(
        &self,
        session: &mut PlanningSession,
        report: &mut SaveReport,
    ) -> Result<BTreeMap<TableType, BTreeSet<Identity>>, SaveError> {
        let order_id = session.order.id.clone();
        let mut current = BTreeMap::new();

        for table_type in TableType::SAVE_ORDER {
            report.enter(SavePhase::SavingEntities(table_type));

            let mut identities_of_type = BTreeSet::new();
            let mut failures = Vec::new();
            let PlanningSession { tables, ledger, .. } = &mut *session;

            for table in tables.iter_mut().filter(|t| t.table_type == table_type) {
                for index in 0..table.rows.len() {
                    let row = &table.rows[index];
                    let identities = self.namer.identities_for_row(table, &order_id, row);

                    // 識別改變：舊識別先放入帳本
                    for old in &row.persisted_identities {
                        if !identities.contains(old) {
                            ledger.mark_deleted(table_type, old.clone());
                        }
                    }
                    identities_of_type.extend(identities.iter().cloned());

                    let mut payloads: Vec<EntityPayload> =
                        EntityPayload::backing_for_row(&self.namer, &order_id, table, row)
                            .into_iter()
                            .collect();
                    payloads.push(EntityPayload::from_row(&self.namer, &order_id, table, row));

                    match self.upsert_row(&payloads).await {
                        Ok(()) => {
                            report.saved.extend(identities.iter().cloned());
                            table.rows[index].persisted_identities = identities;
                        }
                        Err(failure) => failures.push(failure),
                    }
                }
            }

            if !failures.is_empty() {
                tracing::error!("{} 有 {} 筆實體保存失敗，中止存檔", table_type, failures.len());
                return Err(SaveError::Entities {
                    table_type,
                    failures,
                });
            }
            current.insert(table_type, identities_of_type);
        }

        Ok(current)
    }

    /// 依序保存同一列的實體（底布在前）
    async fn upsert_row(&self, payloads: &[EntityPayload]) -> Result<(), EntityFailure> {
        for payload in payloads {
            tracing::debug!("保存實體 {}", payload.identity);
            with_retry(&self.config.retry, "保存實體", move || {
                self.store.upsert_entity(payload)
            })
            .await
            .map_err(|error| {
                tracing::warn!("實體 {} 保存失敗: {}", payload.identity, error);
                EntityFailure {
                    identity: payload.identity.clone(),
                    error,
                }
            })?;
        }
        Ok(())
    }

    /// 刪除帳本中不再存在的識別；個別失敗保留在帳本
    async fn delete_stale(
        &self,
        session: &mut PlanningSession,
        current: &BTreeMap<TableType, BTreeSet<Identity>>,
        report: &mut SaveReport,
    ) {
        let empty = BTreeSet::new();

        for table_type in TableType::SAVE_ORDER {
            let live = current.get(&table_type).unwrap_or(&empty);
            let to_delete = session.ledger.take_delete_set(table_type, live);
            if to_delete.is_empty() {
                continue;
            }
            report.enter(SavePhase::Deleting(table_type));

            let results = join_all(to_delete.iter().map(|identity| {
                with_retry(&self.config.retry, "刪除實體", move || {
                    self.store.delete_entity(identity)
                })
            }))
            .await;

            for (identity, result) in to_delete.into_iter().zip(results) {
                match result {
                    Ok(()) => {}
                    Err(err) if err.is_not_found() => {
                        tracing::debug!("實體 {} 已不存在，視為刪除完成", identity);
                    }
                    Err(err) => {
                        tracing::warn!("實體 {} 刪除失敗，保留待下次存檔: {}", identity, err);
                        continue;
                    }
                }
                session.ledger.confirm(table_type, &identity);
                report.deleted.push(identity);
            }
        }
    }

    async fn delete_combinations(&self, session: &mut PlanningSession, report: &mut SaveReport) {
        let live: Vec<String> = session
            .combination_ledger
            .pending()
            .into_iter()
            .filter(|id| session.combinations.iter().any(|c| &c.combination_id == id))
            .collect();
        for id in &live {
            session.combination_ledger.forget(id);
        }

        let pending = session.combination_ledger.pending();
        if pending.is_empty() {
            return;
        }
        report.enter(SavePhase::DeletingCombinations);

        let results = join_all(pending.iter().map(|id| {
            with_retry(&self.config.retry, "刪除組合", move || {
                self.store.delete_combination(id)
            })
        }))
        .await;

        for (id, result) in pending.into_iter().zip(results) {
            match result {
                Err(err) if !err.is_not_found() => {
                    tracing::warn!("組合 {} 刪除失敗，保留待下次存檔: {}", id, err);
                }
                _ => {
                    session.combination_ledger.confirm(&id);
                    report.deleted_combinations.push(id);
                }
            }
        }
    }

    /// 備註有變更時才寫入；失敗只回報不回滾
    async fn save_auxiliary(&self, session: &mut PlanningSession, report: &mut SaveReport) {
        if !session.comment_changed {
            return;
        }
        report.enter(SavePhase::SavingAuxiliary);

        let payload = CommentPayload {
            order: session.order.id.clone(),
            comment_text: session.comment.clone(),
        };
        match with_retry(&self.config.retry, "保存備註", || {
            self.store.save_comment(&payload)
        })
        .await
        {
            Ok(()) => session.comment_changed = false,
            Err(err) => {
                tracing::warn!("訂單 {} 備註保存失敗: {}", payload.order, err);
                report.auxiliary_error = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use cutplan_core::{
        OrderLine, PlanningRow, PlanningTable, ProductionCenterCombination, RetryPolicy,
        SizeQuantityMap, SpreadingMethod, StripSpec,
    };
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_retry(RetryPolicy::default().with_backoff_step_ms(0))
            .with_combination_key("ROOM-A", "D1", "ZA")
    }

    fn order() -> Order {
        Order::new("ORD-25123456", "ST", "FW", "001")
            .with_size("S", 100)
            .unwrap()
            .with_size("M", 200)
            .unwrap()
    }

    fn combination() -> ProductionCenterCombination {
        ProductionCenterCombination::new("PC1", "ROOM-A", "D1").with_id("1")
    }

    fn mattress_row(seq: u32) -> PlanningRow {
        PlanningRow::new(seq)
            .with_marker(format!("MK-{seq}"), Decimal::from(3), Decimal::from(150))
            .with_pieces_per_size(SizeQuantityMap::new().with("S", 1).with("M", 2))
            .with_layers(20)
    }

    fn mattress_table(rows: &[u32]) -> PlanningTable {
        let mut table = PlanningTable::new(TableType::Mattress)
            .with_id("M1")
            .with_fabric("01", "F100", "BLK")
            .with_spreading_method(SpreadingMethod::Automatic)
            .with_combination(&combination());
        for seq in rows {
            table = table.with_row(mattress_row(*seq));
        }
        table
    }

    fn along_table() -> PlanningTable {
        PlanningTable::new(TableType::Along)
            .with_id("A1")
            .with_fabric("01", "F100", "BLK")
            .with_combination(&combination())
            .with_row(PlanningRow::new(1).with_strip(StripSpec::new(
                40,
                Decimal::from(140),
                Decimal::from(2),
                Decimal::from(7),
            )))
    }

    fn new_session(tables: Vec<PlanningTable>) -> PlanningSession {
        let mut session = PlanningSession::new(order());
        session.add_combination(combination()).unwrap();
        for table in tables {
            session.add_table(table);
        }
        session
    }

    fn loaded_session(
        orchestrator: &ReconciliationOrchestrator<MemoryStore>,
        rows: &[u32],
    ) -> PlanningSession {
        PlanningSession::from_remote(
            order(),
            vec![combination()],
            vec![mattress_table(rows)],
            "",
            orchestrator.namer(),
        )
    }

    fn row_id(session: &PlanningSession, table_id: &str, seq: u32) -> uuid::Uuid {
        session
            .table(table_id)
            .and_then(|t| t.rows.iter().find(|r| r.sequence_number == seq))
            .map(|r| r.id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_save() {
        let orchestrator = ReconciliationOrchestrator::new(MemoryStore::new(), config());
        let mut session = new_session(vec![mattress_table(&[1, 2]), along_table()]);

        let report = orchestrator.save(&mut session).await.unwrap();

        assert_eq!(
            orchestrator.store().entity_names(),
            vec![
                "ZA-123456-AS-01-001",
                "ZA-123456-AS-01-002",
                "ZA-123456-CA-01-001",
                "ZA-123456-CMA-01-001",
            ]
        );
        assert_eq!(report.saved.len(), 4);
        assert_eq!(report.phases.first(), Some(&SavePhase::Validating));
        assert_eq!(report.phases.last(), Some(&SavePhase::Done));
        assert!(!session.is_dirty());
        assert!(session.tables().iter().all(|t| t.rows.iter().all(|r| r.is_persisted())));

        // 底布先於布條保存
        let calls = orchestrator.store().calls();
        let backing = calls.iter().position(|c| c == "upsert:ZA-123456-CMA-01-001");
        let strip = calls.iter().position(|c| c == "upsert:ZA-123456-CA-01-001");
        assert!(backing < strip);
    }

    #[tokio::test]
    async fn test_types_are_saved_in_fixed_order() {
        let orchestrator = ReconciliationOrchestrator::new(MemoryStore::new(), config());
        let mut session = new_session(vec![along_table(), mattress_table(&[1])]);

        let report = orchestrator.save(&mut session).await.unwrap();

        let entity_phases: Vec<SavePhase> = report
            .phases
            .iter()
            .copied()
            .filter(|p| matches!(p, SavePhase::SavingEntities(_)))
            .collect();
        let expected: Vec<SavePhase> = TableType::SAVE_ORDER
            .iter()
            .map(|t| SavePhase::SavingEntities(*t))
            .collect();
        assert_eq!(entity_phases, expected);

        let calls = orchestrator.store().calls();
        let mattress = calls.iter().position(|c| c == "upsert:ZA-123456-AS-01-001");
        let along = calls.iter().position(|c| c == "upsert:ZA-123456-CMA-01-001");
        assert!(mattress < along);
    }

    #[tokio::test]
    async fn test_deletion_set_excludes_current_identities() {
        let store = MemoryStore::new()
            .with_entity("ZA-123456-AS-01-001")
            .with_entity("ZA-123456-AS-01-002")
            .with_entity("ZA-123456-AS-01-003");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = loaded_session(&orchestrator, &[1, 2, 3]);

        for seq in [1, 2, 3] {
            let id = row_id(&session, "M1", seq);
            session.remove_row("M1", id).unwrap();
        }
        // 序號 2 重新加入，序號 4 為新列
        session.add_row("M1", mattress_row(2)).unwrap();
        session.add_row("M1", mattress_row(4)).unwrap();

        let report = orchestrator.save(&mut session).await.unwrap();

        assert_eq!(
            report.deleted,
            vec![
                Identity::from("ZA-123456-AS-01-001"),
                Identity::from("ZA-123456-AS-01-003"),
            ]
        );
        assert!(session.ledger().is_empty());
        assert_eq!(
            orchestrator.store().entity_names(),
            vec!["ZA-123456-AS-01-002", "ZA-123456-AS-01-004"]
        );
        assert!(!orchestrator
            .store()
            .calls()
            .contains(&"delete:ZA-123456-AS-01-002".to_string()));
    }

    #[tokio::test]
    async fn test_identity_change_deletes_then_creates() {
        let store = MemoryStore::new().with_entity("ZA-123456-AS-01-001");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = loaded_session(&orchestrator, &[1]);

        session.table_mut("M1").unwrap().fabric_type = "02".to_string();
        let report = orchestrator.save(&mut session).await.unwrap();

        assert_eq!(report.deleted, vec![Identity::from("ZA-123456-AS-01-001")]);
        assert_eq!(orchestrator.store().entity_names(), vec!["ZA-123456-AS-02-001"]);
        assert_eq!(
            session.tables()[0].rows[0].persisted_identities,
            vec![Identity::from("ZA-123456-AS-02-001")]
        );
    }

    #[tokio::test]
    async fn test_removing_along_row_keeps_weft_backing() {
        let weft_table = PlanningTable::new(TableType::Weft)
            .with_id("W1")
            .with_fabric("01", "F100", "BLK")
            .with_combination(&combination())
            .with_row(PlanningRow::new(1).with_strip(StripSpec::new(
                40,
                Decimal::from(140),
                Decimal::from(2),
                Decimal::from(7),
            )));
        let orchestrator = ReconciliationOrchestrator::new(MemoryStore::new(), config());
        let mut session = new_session(vec![along_table(), weft_table]);
        orchestrator.save(&mut session).await.unwrap();

        let id = row_id(&session, "A1", 1);
        session.remove_row("A1", id).unwrap();
        let report = orchestrator.save(&mut session).await.unwrap();

        assert_eq!(
            report.deleted,
            vec![
                Identity::from("ZA-123456-CA-01-001"),
                Identity::from("ZA-123456-CMA-01-001"),
            ]
        );
        assert_eq!(
            orchestrator.store().entity_names(),
            vec!["ZA-123456-CMW-01-001", "ZA-123456-CW-01-001"]
        );
        assert_eq!(
            session.table("W1").unwrap().rows[0].persisted_identities,
            vec![
                Identity::from("ZA-123456-CW-01-001"),
                Identity::from("ZA-123456-CMW-01-001"),
            ]
        );
    }

    #[tokio::test]
    async fn test_lock_contention_is_retried() {
        let store = MemoryStore::new();
        store.fail_with_lock("upsert:ZA-123456-AS-01-001", 2);
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = new_session(vec![mattress_table(&[1])]);

        orchestrator.save(&mut session).await.unwrap();

        let attempts = orchestrator
            .store()
            .calls()
            .iter()
            .filter(|c| *c == "upsert:ZA-123456-AS-01-001")
            .count();
        assert_eq!(attempts, 3);
        assert_eq!(orchestrator.store().entity_names(), vec!["ZA-123456-AS-01-001"]);
    }

    #[tokio::test]
    async fn test_entity_failure_stops_later_phases() {
        let store = MemoryStore::new().with_entity("ZA-123456-AS-01-003");
        store.reject("upsert:ZA-123456-AS-01-001");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = loaded_session(&orchestrator, &[1, 2, 3]);

        let id = row_id(&session, "M1", 3);
        session.remove_row("M1", id).unwrap();
        session.set_comment("急單");

        let err = orchestrator.save(&mut session).await.unwrap_err();

        match &err {
            SaveError::Entities {
                table_type,
                failures,
            } => {
                assert_eq!(*table_type, TableType::Mattress);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].identity, Identity::from("ZA-123456-AS-01-001"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.failed_phase(),
            Some(SavePhase::SavingEntities(TableType::Mattress))
        );

        // 同類型其他列仍然保存，刪除與備註未執行
        let calls = orchestrator.store().calls();
        assert!(calls.contains(&"upsert:ZA-123456-AS-01-002".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("delete:") || c.starts_with("comment:")));
        assert_eq!(session.ledger().len(), 1);
        assert!(session.is_dirty());
        assert!(!orchestrator.is_saving());
    }

    #[tokio::test]
    async fn test_partial_delete_failure_is_kept_for_next_save() {
        let store = MemoryStore::new()
            .with_entity("ZA-123456-AS-01-001")
            .with_entity("ZA-123456-AS-01-002");
        store.reject("delete:ZA-123456-AS-01-002");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = loaded_session(&orchestrator, &[1, 2, 3]);

        for seq in [1, 2, 3] {
            let id = row_id(&session, "M1", seq);
            session.remove_row("M1", id).unwrap();
        }

        let report = orchestrator.save(&mut session).await.unwrap();

        // 序號 3 遠端不存在（404），視為刪除完成
        assert_eq!(
            report.deleted,
            vec![
                Identity::from("ZA-123456-AS-01-001"),
                Identity::from("ZA-123456-AS-01-003"),
            ]
        );
        assert_eq!(
            report.pending_deletes,
            vec![Identity::from("ZA-123456-AS-01-002")]
        );
        assert!(session
            .ledger()
            .contains(TableType::Mattress, &Identity::from("ZA-123456-AS-01-002")));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_calls() {
        let orchestrator = ReconciliationOrchestrator::new(MemoryStore::new(), config());
        let duplicate = mattress_table(&[1]).with_id("M2");
        let mut session = new_session(vec![mattress_table(&[1]), duplicate]);

        let err = orchestrator.save(&mut session).await.unwrap_err();

        assert!(matches!(
            err,
            SaveError::Validation(ValidationError::DuplicateTable { .. })
        ));
        assert_eq!(err.failed_phase(), Some(SavePhase::Validating));
        assert!(orchestrator.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_combination_failure_aborts() {
        let store = MemoryStore::new();
        store.reject("pc:M1");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = new_session(vec![mattress_table(&[1])]);

        let err = orchestrator.save(&mut session).await.unwrap_err();

        assert!(matches!(err, SaveError::Combination { ref table_id, .. } if table_id == "M1"));
        assert!(orchestrator.store().entity_names().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_save_is_rejected() {
        let store = MemoryStore::new().with_delay(Duration::from_millis(20));
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut first = new_session(vec![mattress_table(&[1])]);
        let mut second = new_session(vec![mattress_table(&[1])]);

        let (a, b) = tokio::join!(orchestrator.save(&mut first), orchestrator.save(&mut second));

        assert!(a.is_ok());
        assert!(matches!(b, Err(SaveError::InProgress)));
        assert!(!orchestrator.is_saving());
    }

    #[tokio::test]
    async fn test_deleted_combination_is_drained() {
        let store = MemoryStore::new().with_entity("ZA-123456-AS-01-001");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = loaded_session(&orchestrator, &[1]);

        session.delete_combination("1").unwrap();
        let report = orchestrator.save(&mut session).await.unwrap();

        assert_eq!(report.deleted_combinations, vec!["1".to_string()]);
        assert_eq!(report.deleted, vec![Identity::from("ZA-123456-AS-01-001")]);
        assert!(session.combination_ledger().is_empty());
        assert!(report.phases.contains(&SavePhase::DeletingCombinations));
    }

    #[tokio::test]
    async fn test_comment_failure_is_reported_without_rollback() {
        let store = MemoryStore::new();
        store.reject("comment:ORD-25123456");
        let orchestrator = ReconciliationOrchestrator::new(store, config());
        let mut session = new_session(vec![mattress_table(&[1])]);
        session.set_comment("急單");

        let report = orchestrator.save(&mut session).await.unwrap();

        assert!(report.auxiliary_error.is_some());
        assert!(session.comment_changed());
        assert_eq!(orchestrator.store().entity_names(), vec!["ZA-123456-AS-01-001"]);
    }

    #[tokio::test]
    async fn test_unchanged_comment_is_not_written() {
        let orchestrator = ReconciliationOrchestrator::new(MemoryStore::new(), config());
        let mut session = new_session(vec![mattress_table(&[1])]);

        let report = orchestrator.save(&mut session).await.unwrap();

        assert!(!report.phases.contains(&SavePhase::SavingAuxiliary));
        assert!(!orchestrator
            .store()
            .calls()
            .iter()
            .any(|c| c.starts_with("comment:")));
    }

    #[tokio::test]
    async fn test_load_order_groups_lines() {
        let store = MemoryStore::new();
        {
            let mut state = store.state.lock().unwrap();
            for (size, qty, status) in [("S", 100, 3), ("M", 200, 3), ("L", 50, 4)] {
                state.order_lines.push(OrderLine {
                    order: "ORD-1".to_string(),
                    style: "ST".to_string(),
                    season: "FW".to_string(),
                    color_code: "001".to_string(),
                    size: size.to_string(),
                    quantity: Decimal::from(qty),
                    status,
                });
            }
        }
        let orchestrator = ReconciliationOrchestrator::new(store, config());

        let order = orchestrator
            .load_order("ORD-1", Some(OrderStatus::Open))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.sizes.len(), 2);
        assert_eq!(order.total_quantity(), Decimal::from(300));

        let missing = orchestrator.load_order("ORD-2", None).await.unwrap();
        assert!(missing.is_none());
    }
}
