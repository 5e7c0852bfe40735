//! 數量彙總

use cutplan_core::{OrderSize, PlanningRow, PlanningTable, SizeQuantityMap, TableType};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::consumption::ConsumptionCalculator;
use crate::size_key::SizeKeyNormalizer;

/// 未填缸號的資料列歸入此桶
pub const NO_BAGNO: &str = "Unknown";

/// 尺碼剩餘數量
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemainingQuantity {
    /// 訂單上的尺碼標籤
    pub size: String,
    pub original_qty: Decimal,
    pub planned_qty: Decimal,
    /// 可為負值（超量分配），由呼叫端判斷
    pub remaining_qty: Decimal,
}

/// 生產中心分段合計
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentTotal {
    pub production_center: String,
    pub cutting_room: String,
    pub destination: String,
    pub part_index: u32,
    pub total_planned: Decimal,
}

/// 數量彙總計算器
pub struct QuantityAggregator;

impl QuantityAggregator {
    /// 計劃件數（各尺碼）：Σ 每層件數 × 計劃層數
    pub fn planned_by_size(table: &PlanningTable) -> SizeQuantityMap {
        let mut totals = SizeQuantityMap::new();
        for row in &table.rows {
            Self::accumulate(&mut totals, row, row.layers);
        }
        totals
    }

    /// 實際產出件數（各尺碼）：Σ 每層件數 × 實際層數
    pub fn produced_by_size(table: &PlanningTable) -> SizeQuantityMap {
        let mut totals = SizeQuantityMap::new();
        for row in &table.rows {
            Self::accumulate(&mut totals, row, row.layers_actual.unwrap_or(0));
        }
        totals
    }

    /// 同類型所有裁剪表的計劃件數合計
    pub fn planned_by_type(tables: &[PlanningTable], table_type: TableType) -> SizeQuantityMap {
        let mut totals = SizeQuantityMap::new();
        for table in tables.iter().filter(|t| t.table_type == table_type) {
            totals.merge(&Self::planned_by_size(table));
        }
        totals
    }

    /// 依缸號分組的計劃件數
    pub fn planned_by_bagno(table: &PlanningTable) -> BTreeMap<String, SizeQuantityMap> {
        let mut groups: BTreeMap<String, SizeQuantityMap> = BTreeMap::new();
        for row in &table.rows {
            let totals = groups.entry(Self::bagno_key(row)).or_default();
            Self::accumulate(totals, row, row.layers);
        }
        groups
    }

    /// 依缸號分組的用量（m），有實際用量時取實際
    pub fn meters_by_bagno(table: &PlanningTable) -> BTreeMap<String, Decimal> {
        let mut groups: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in &table.rows {
            *groups.entry(Self::bagno_key(row)).or_insert(Decimal::ZERO) +=
                ConsumptionCalculator::cons_effective(table, row);
        }
        groups
    }

    /// 剩餘數量 = 訂單數量 − 計劃數量
    pub fn remaining(order_sizes: &[OrderSize], planned: &SizeQuantityMap) -> Vec<RemainingQuantity> {
        let planned = SizeKeyNormalizer::normalize_map(planned);
        order_sizes
            .iter()
            .map(|s| {
                let planned_qty = planned.get(&SizeKeyNormalizer::normalize(&s.size));
                RemainingQuantity {
                    size: s.size.clone(),
                    original_qty: s.qty,
                    planned_qty,
                    remaining_qty: s.qty - planned_qty,
                }
            })
            .collect()
    }

    /// 依 (生產中心, 裁剪室, 目的地, 分部) 分段合計總件數
    ///
    /// 結果依字典序遞增排列，空字串排在最前面。
    pub fn by_segment<F>(tables: &[PlanningTable], filter: F) -> Vec<SegmentTotal>
    where
        F: Fn(&PlanningTable) -> bool,
    {
        let mut segments: BTreeMap<(String, String, String, u32), Decimal> = BTreeMap::new();

        for table in tables.iter().filter(|t| filter(t)) {
            for row in &table.rows {
                let key = (
                    table.production_center.clone(),
                    table.cutting_room.clone(),
                    table.destination.clone(),
                    table.part_index,
                );
                *segments.entry(key).or_insert(Decimal::ZERO) +=
                    row.pieces_per_layer() * Decimal::from(row.layers);
            }
        }

        tracing::debug!("分段數量: {}", segments.len());

        segments
            .into_iter()
            .map(
                |((production_center, cutting_room, destination, part_index), total_planned)| {
                    SegmentTotal {
                        production_center,
                        cutting_room,
                        destination,
                        part_index,
                        total_planned,
                    }
                },
            )
            .collect()
    }

    fn accumulate(totals: &mut SizeQuantityMap, row: &PlanningRow, layers: u32) {
        let Some(pieces) = &row.pieces_per_size else {
            return;
        };
        let layers = Decimal::from(layers);
        for (size, qty) in pieces {
            totals.add(SizeKeyNormalizer::normalize(size), *qty * layers);
        }
    }

    fn bagno_key(row: &PlanningRow) -> String {
        match row.bagno.as_deref().map(str::trim) {
            Some(bagno) if !bagno.is_empty() => bagno.to_string(),
            _ => NO_BAGNO.to_string(),
        }
    }
}
