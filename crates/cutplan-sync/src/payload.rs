//! 存檔請求內容

use cutplan_calc::{ConsumptionCalculator, IdentityNamer, SizeKeyNormalizer};
use cutplan_core::{
    CalculatorMarker, Identity, PlanningRow, PlanningTable, SpreadingMethod, StripSpec, TableType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 生產中心指派（以裁剪表ID為鍵）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCenterPayload {
    pub table_id: String,
    pub table_type: TableType,
    pub production_center: String,
    pub cutting_room: String,
    pub destination: String,
}

impl ProductionCenterPayload {
    pub fn from_table(table: &PlanningTable) -> Self {
        Self {
            table_id: table.id.clone(),
            table_type: table.table_type,
            production_center: table.production_center.clone(),
            cutting_room: table.cutting_room.clone(),
            destination: table.destination.clone(),
        }
    }
}

/// 實體的尺碼明細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePayload {
    pub size: String,
    pub pcs_layer: Decimal,
    pub pcs_planned: Decimal,
}

/// 計劃實體（鋪布 / 布條 / 布條底布）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPayload {
    pub identity: Identity,
    pub order: String,
    pub table_id: String,
    pub table_type: TableType,
    pub item_type_code: String,
    pub fabric_type: String,
    pub fabric_code: String,
    pub fabric_color: String,
    pub spreading_method: Option<SpreadingMethod>,
    pub production_center: String,
    pub cutting_room: String,
    pub destination: String,
    pub part_index: u32,
    pub sequence_number: u32,
    pub marker_name: String,
    pub marker_length: Decimal,
    pub width: Decimal,
    pub layers: Decimal,
    pub length_mattress: Decimal,
    pub cons_planned: Decimal,
    pub bagno: Option<String>,
    pub sizes: Vec<SizePayload>,
    pub strip: Option<StripSpec>,
    pub backing_mattress: Option<Identity>,
}

impl EntityPayload {
    /// 由資料列建立實體內容（含衍生欄位）
    pub fn from_row(
        namer: &IdentityNamer,
        order_id: &str,
        table: &PlanningTable,
        row: &PlanningRow,
    ) -> Self {
        let mut payload = Self::base(
            namer.identity_for_row(table, order_id, row),
            namer.item_type_code(table),
            order_id,
            table,
            row,
        );

        match (&row.strip, table.table_type.is_strip()) {
            (Some(strip), true) => {
                payload.apply_strip(table.table_type, strip);
                payload.backing_mattress = namer.backing_identity_for_row(table, order_id, row);
            }
            _ => {
                let layers = Decimal::from(row.layers);
                payload.layers = layers;
                payload.length_mattress = ConsumptionCalculator::length_mattress(table, row);
                payload.cons_planned = ConsumptionCalculator::cons_planned(table, row);
                payload.sizes = row
                    .pieces_per_size
                    .as_ref()
                    .map(|pieces| {
                        SizeKeyNormalizer::normalize_map(pieces)
                            .iter()
                            .map(|(size, pcs_layer)| SizePayload {
                                size: size.clone(),
                                pcs_layer: *pcs_layer,
                                pcs_planned: *pcs_layer * layers,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
            }
        }
        payload
    }

    /// 布條列隱含的底布鋪布；非布條列回傳 `None`
    pub fn backing_for_row(
        namer: &IdentityNamer,
        order_id: &str,
        table: &PlanningTable,
        row: &PlanningRow,
    ) -> Option<Self> {
        let identity = namer.backing_identity_for_row(table, order_id, row)?;
        let code = namer.backing_item_type_code(table)?;
        let strip = row.strip.as_ref()?;
        let mut payload = Self::base(
            identity,
            code,
            order_id,
            table,
            row,
        );
        payload.apply_strip(table.table_type, strip);
        Some(payload)
    }

    fn base(
        identity: Identity,
        item_type_code: &str,
        order_id: &str,
        table: &PlanningTable,
        row: &PlanningRow,
    ) -> Self {
        Self {
            identity,
            order: order_id.to_string(),
            table_id: table.id.clone(),
            table_type: table.table_type,
            item_type_code: item_type_code.to_string(),
            fabric_type: table.fabric_type.clone(),
            fabric_code: table.fabric_code.clone(),
            fabric_color: table.fabric_color.clone(),
            spreading_method: table.spreading_method,
            production_center: table.production_center.clone(),
            cutting_room: table.cutting_room.clone(),
            destination: table.destination.clone(),
            part_index: table.part_index,
            sequence_number: row.sequence_number,
            marker_name: row.marker_name.clone(),
            marker_length: row.marker_length,
            width: row.width,
            layers: Decimal::ZERO,
            length_mattress: Decimal::ZERO,
            cons_planned: Decimal::ZERO,
            bagno: row.bagno.clone(),
            sizes: Vec::new(),
            strip: None,
            backing_mattress: None,
        }
    }

    fn apply_strip(&mut self, table_type: TableType, strip: &StripSpec) {
        self.width = strip.usable_width;
        self.layers = ConsumptionCalculator::strip_layers(table_type, strip);
        self.length_mattress = strip.gross_length;
        self.cons_planned = ConsumptionCalculator::strip_consumption(table_type, strip);
        self.strip = Some(strip.clone());
    }
}

/// 訂單備註
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub order: String,
    pub comment_text: String,
}

/// 試算分頁的遠端記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorTabRecord {
    pub selected_baseline: String,
    pub markers: Vec<CalculatorMarker>,
}

/// 試算分頁存檔內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorSavePayload {
    pub order: String,
    pub combination_id: String,
    pub tab_key: String,
    pub record: CalculatorTabRecord,
}
