//! 測試用記憶體存取層

use async_trait::async_trait;
use cutplan_core::{Identity, OrderLine};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::payload::{
    CalculatorSavePayload, CalculatorTabRecord, CommentPayload, EntityPayload,
    ProductionCenterPayload,
};
use crate::store::{PlanningStore, StoreError};

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub production_centers: BTreeMap<String, ProductionCenterPayload>,
    pub entities: BTreeMap<Identity, EntityPayload>,
    pub combinations: BTreeSet<String>,
    pub comments: BTreeMap<String, String>,
    pub calculator: BTreeMap<(String, String, String), CalculatorTabRecord>,
    pub order_lines: Vec<OrderLine>,
    pub calls: Vec<String>,
    /// 操作鍵 → 剩餘的鎖競爭失敗次數
    pub lock_failures: BTreeMap<String, u32>,
    /// 永遠失敗的操作鍵
    pub rejected: BTreeSet<String>,
}

/// 記憶體存取層；操作鍵格式為 `動作:對象`
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub state: Mutex<MemoryState>,
    pub delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_entity(self, identity: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .entities
            .insert(Identity::from(identity), placeholder(identity));
        self
    }

    pub fn fail_with_lock(&self, key: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .lock_failures
            .insert(key.to_string(), times);
    }

    pub fn reject(&self, key: &str) {
        self.state.lock().unwrap().rejected.insert(key.to_string());
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .entities
            .keys()
            .map(|i| i.as_str().to_string())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    async fn enter(&self, key: String) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(key.clone());
        if state.rejected.contains(&key) {
            return Err(StoreError::rejected(Some("417"), format!("{key} rejected")));
        }
        if let Some(remaining) = state.lock_failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::rejected(
                    Some("1205"),
                    "Lock wait timeout exceeded; try restarting transaction",
                ));
            }
        }
        Ok(())
    }
}

fn placeholder(identity: &str) -> EntityPayload {
    use cutplan_core::TableType;
    use rust_decimal::Decimal;

    EntityPayload {
        identity: Identity::from(identity),
        order: String::new(),
        table_id: String::new(),
        table_type: TableType::Mattress,
        item_type_code: String::new(),
        fabric_type: String::new(),
        fabric_code: String::new(),
        fabric_color: String::new(),
        spreading_method: None,
        production_center: String::new(),
        cutting_room: String::new(),
        destination: String::new(),
        part_index: 1,
        sequence_number: 0,
        marker_name: String::new(),
        marker_length: Decimal::ZERO,
        width: Decimal::ZERO,
        layers: Decimal::ZERO,
        length_mattress: Decimal::ZERO,
        cons_planned: Decimal::ZERO,
        bagno: None,
        sizes: Vec::new(),
        strip: None,
        backing_mattress: None,
    }
}

#[async_trait]
impl PlanningStore for MemoryStore {
    async fn save_production_center(
        &self,
        payload: &ProductionCenterPayload,
    ) -> Result<(), StoreError> {
        self.enter(format!("pc:{}", payload.table_id)).await?;
        self.state
            .lock()
            .unwrap()
            .production_centers
            .insert(payload.table_id.clone(), payload.clone());
        Ok(())
    }

    async fn upsert_entity(&self, payload: &EntityPayload) -> Result<(), StoreError> {
        self.enter(format!("upsert:{}", payload.identity)).await?;
        self.state
            .lock()
            .unwrap()
            .entities
            .insert(payload.identity.clone(), payload.clone());
        Ok(())
    }

    async fn delete_entity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.enter(format!("delete:{identity}")).await?;
        match self.state.lock().unwrap().entities.remove(identity) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(identity.to_string())),
        }
    }

    async fn delete_combination(&self, combination_id: &str) -> Result<(), StoreError> {
        self.enter(format!("delete-combination:{combination_id}")).await?;
        self.state
            .lock()
            .unwrap()
            .combinations
            .insert(combination_id.to_string());
        Ok(())
    }

    async fn fetch_order_lines(&self, order: &str) -> Result<Vec<OrderLine>, StoreError> {
        self.enter(format!("order:{order}")).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .order_lines
            .iter()
            .filter(|l| l.order == order)
            .cloned()
            .collect())
    }

    async fn save_comment(&self, payload: &CommentPayload) -> Result<(), StoreError> {
        self.enter(format!("comment:{}", payload.order)).await?;
        let mut state = self.state.lock().unwrap();
        if payload.comment_text.is_empty() {
            state.comments.remove(&payload.order);
        } else {
            state
                .comments
                .insert(payload.order.clone(), payload.comment_text.clone());
        }
        Ok(())
    }

    async fn load_calculator(
        &self,
        order: &str,
        combination_id: &str,
    ) -> Result<BTreeMap<String, CalculatorTabRecord>, StoreError> {
        self.enter(format!("load-calculator:{order}")).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .calculator
            .iter()
            .filter(|((o, c, _), _)| o == order && c == combination_id)
            .map(|((_, _, key), record)| (key.clone(), record.clone()))
            .collect())
    }

    async fn save_calculator(&self, payload: &CalculatorSavePayload) -> Result<(), StoreError> {
        self.enter(format!("save-calculator:{}", payload.tab_key)).await?;
        self.state.lock().unwrap().calculator.insert(
            (
                payload.order.clone(),
                payload.combination_id.clone(),
                payload.tab_key.clone(),
            ),
            payload.record.clone(),
        );
        Ok(())
    }

    async fn delete_calculator_tab(
        &self,
        order: &str,
        combination_id: &str,
        tab_key: &str,
    ) -> Result<(), StoreError> {
        self.enter(format!("delete-calculator:{tab_key}")).await?;
        let key = (
            order.to_string(),
            combination_id.to_string(),
            tab_key.to_string(),
        );
        match self.state.lock().unwrap().calculator.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(tab_key.to_string())),
        }
    }
}
