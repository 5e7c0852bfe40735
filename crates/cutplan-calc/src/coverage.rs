//! 覆蓋率計算

use cutplan_core::{Order, SizeQuantityMap};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::size_key::SizeKeyNormalizer;

/// 覆蓋狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageStatus {
    /// ≥ 100%
    Complete,
    /// ≥ 80%
    Warning,
    /// < 80%
    Deficient,
}

impl CoverageStatus {
    pub fn from_percent(percent: Decimal) -> Self {
        if percent >= Decimal::ONE_HUNDRED {
            CoverageStatus::Complete
        } else if percent >= Decimal::from(80) {
            CoverageStatus::Warning
        } else {
            CoverageStatus::Deficient
        }
    }
}

/// 單一尺碼覆蓋率
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeCoverage {
    pub size: String,
    pub target: Decimal,
    pub calculated: Decimal,
    pub percent: Decimal,
    pub status: CoverageStatus,
}

/// 覆蓋率百分比：round(calculated / target × 100)，target ≤ 0 時為 0
///
/// 四捨五入到整數（.5 進位），其他元件依此判斷狀態門檻。
pub fn coverage_percent(calculated: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (calculated / target * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// 依訂單尺碼順序計算各尺碼覆蓋率（尺碼鍵先正規化）
pub fn coverage_by_size(
    order: &Order,
    target: &SizeQuantityMap,
    calculated: &SizeQuantityMap,
) -> Vec<SizeCoverage> {
    let target = SizeKeyNormalizer::normalize_map(target);
    let calculated = SizeKeyNormalizer::normalize_map(calculated);

    order
        .sizes
        .iter()
        .map(|s| {
            let key = SizeKeyNormalizer::normalize(&s.size);
            let target_qty = target.get(&key);
            let calculated_qty = calculated.get(&key);
            let percent = coverage_percent(calculated_qty, target_qty);
            SizeCoverage {
                size: s.size.clone(),
                target: target_qty,
                calculated: calculated_qty,
                percent,
                status: CoverageStatus::from_percent(percent),
            }
        })
        .collect()
}
