//! 訂單計劃總覽

use cutplan_calc::{
    coverage_by_size, QuantityAggregator, RemainingQuantity, SegmentTotal, SizeCoverage,
};
use cutplan_core::{SizeQuantityMap, TableType};
use cutplan_sync::PlanningSession;

/// 單一裁剪表類型的彙總
#[derive(Debug, Clone)]
pub struct TypeOverview {
    pub table_type: TableType,
    pub planned: SizeQuantityMap,
    pub remaining: Vec<RemainingQuantity>,
    pub coverage: Vec<SizeCoverage>,
}

/// 訂單總覽：各類型計劃、剩餘與覆蓋率，以及鋪布類的分段合計
#[derive(Debug, Clone)]
pub struct OrderOverview {
    pub order_id: String,
    pub types: Vec<TypeOverview>,
    pub segments: Vec<SegmentTotal>,
}

impl OrderOverview {
    /// 依存檔順序彙總工作階段中出現的類型
    pub fn compute(session: &PlanningSession) -> Self {
        let order = session.order();
        let target = order.size_quantities();

        let types = TableType::SAVE_ORDER
            .iter()
            .filter(|t| session.tables_of(**t).next().is_some())
            .map(|&table_type| {
                let planned = QuantityAggregator::planned_by_type(session.tables(), table_type);
                TypeOverview {
                    table_type,
                    remaining: QuantityAggregator::remaining(&order.sizes, &planned),
                    coverage: coverage_by_size(order, &target, &planned),
                    planned,
                }
            })
            .collect();

        let segments =
            QuantityAggregator::by_segment(session.tables(), |t| t.table_type.is_spreading());

        tracing::debug!("訂單 {} 總覽完成", order.id);

        Self {
            order_id: order.id.clone(),
            types,
            segments,
        }
    }

    pub fn for_type(&self, table_type: TableType) -> Option<&TypeOverview> {
        self.types.iter().find(|t| t.table_type == table_type)
    }
}
