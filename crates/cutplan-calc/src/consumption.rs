//! 用量衍生欄位計算

use cutplan_core::{PlanningRow, PlanningTable, StripSpec, TableType};
use rust_decimal::Decimal;

/// 斜紋布條 45° 裁切的長度係數（√2）
const BIAS_FACTOR: Decimal = Decimal::from_parts(14142, 0, 0, false, 4);

/// 用量計算器
pub struct ConsumptionCalculator;

impl ConsumptionCalculator {
    /// 鋪布長度 = 排料圖長度 + 裁剪表預留長度
    pub fn length_mattress(table: &PlanningTable, row: &PlanningRow) -> Decimal {
        row.marker_length + table.allowance
    }

    /// 計劃用量（m）
    ///
    /// 鋪布類：鋪布長度 × 層數；布條類依方向計算，缺少布條參數時為 0。
    pub fn cons_planned(table: &PlanningTable, row: &PlanningRow) -> Decimal {
        if table.table_type.is_spreading() {
            return Self::length_mattress(table, row) * Decimal::from(row.layers);
        }
        row.strip
            .as_ref()
            .map(|strip| Self::strip_consumption(table.table_type, strip))
            .unwrap_or(Decimal::ZERO)
    }

    /// 用量：有實際用量時取實際，否則取計劃
    pub fn cons_effective(table: &PlanningTable, row: &PlanningRow) -> Decimal {
        row.cons_actual
            .unwrap_or_else(|| Self::cons_planned(table, row))
    }

    /// 每層可裁布條數
    ///
    /// 直紋、斜紋沿幅寬排列；橫紋沿毛長排列（毛長換算為 cm）。
    pub fn strips_per_layer(table_type: TableType, strip: &StripSpec) -> Decimal {
        if strip.strip_width <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let span = match table_type {
            TableType::Weft => strip.gross_length * Decimal::ONE_HUNDRED,
            _ => strip.usable_width,
        };
        (span / strip.strip_width).floor()
    }

    /// 完成布條需求所需層數
    pub fn strip_layers(table_type: TableType, strip: &StripSpec) -> Decimal {
        let per_layer = Self::strips_per_layer(table_type, strip);
        if per_layer <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (Decimal::from(strip.pieces) / per_layer).ceil()
    }

    /// 布條用量（m）
    pub fn strip_consumption(table_type: TableType, strip: &StripSpec) -> Decimal {
        let meters = Self::strip_layers(table_type, strip) * strip.gross_length;
        match table_type {
            TableType::Bias => (meters * BIAS_FACTOR).round_dp(2),
            _ => meters,
        }
    }
}
