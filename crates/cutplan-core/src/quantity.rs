//! 尺碼數量映射

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::str::FromStr;

/// 尺碼 → 數量
///
/// 由彙總計算產生，不直接持久化。反序列化時非數值的內容一律視為 0，
/// 讓外部來源（排料系統、舊資料）的髒值不會中斷計算。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SizeQuantityMap(BTreeMap<String, Decimal>);

impl SizeQuantityMap {
    /// 創建空映射
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 取得尺碼數量（不存在時為 0）
    pub fn get(&self, size: &str) -> Decimal {
        self.0.get(size).copied().unwrap_or(Decimal::ZERO)
    }

    /// 是否包含尺碼
    pub fn contains(&self, size: &str) -> bool {
        self.0.contains_key(size)
    }

    /// 設定尺碼數量（覆蓋）
    pub fn insert(&mut self, size: impl Into<String>, qty: Decimal) {
        self.0.insert(size.into(), qty);
    }

    /// 累加尺碼數量
    pub fn add(&mut self, size: impl Into<String>, qty: Decimal) {
        *self.0.entry(size.into()).or_insert(Decimal::ZERO) += qty;
    }

    /// 合併另一個映射（逐尺碼累加）
    pub fn merge(&mut self, other: &SizeQuantityMap) {
        for (size, qty) in other.iter() {
            self.add(size.clone(), *qty);
        }
    }

    /// 建構器模式：設定尺碼數量
    pub fn with(mut self, size: impl Into<String>, qty: impl Into<Decimal>) -> Self {
        self.insert(size, qty.into());
        self
    }

    /// 每個數量乘上倍數
    pub fn scaled(&self, factor: Decimal) -> Self {
        self.0
            .iter()
            .map(|(size, qty)| (size.clone(), *qty * factor))
            .collect()
    }

    /// 所有尺碼數量總和
    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Decimal> {
        self.0.iter()
    }

    pub fn sizes(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Decimal> {
        self.0
    }
}

impl FromIterator<(String, Decimal)> for SizeQuantityMap {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SizeQuantityMap {
    type Item = (&'a String, &'a Decimal);
    type IntoIter = btree_map::Iter<'a, String, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for SizeQuantityMap {
    type Item = (String, Decimal);
    type IntoIter = btree_map::IntoIter<String, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'de> Deserialize<'de> for SizeQuantityMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(size, value)| (size, coerce_quantity(&value)))
            .collect())
    }
}

/// 將任意 JSON 值轉為數量，無法解析時回傳 0
pub fn coerce_quantity(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}
