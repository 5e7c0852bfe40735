//! 存檔前驗證

use cutplan_core::{EngineConfig, PlanningRow, PlanningTable, ProductionCenterCombination, TableType};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// 驗證錯誤（第一個錯誤即終止）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{table_type} 裁剪表缺少必填欄位: {field}")]
    MissingTableField {
        table_type: TableType,
        table_id: String,
        field: &'static str,
    },

    #[error("{table_type} 裁剪表未指派生產中心組合")]
    MissingAssignment {
        table_type: TableType,
        table_id: String,
    },

    #[error("{table_type} 裁剪表引用的生產中心組合已不存在: {combination_id}")]
    UnknownCombination {
        table_type: TableType,
        combination_id: String,
    },

    #[error("裁剪室 {cutting_room} 必須指定目的地")]
    MissingDestination {
        table_type: TableType,
        cutting_room: String,
    },

    #[error("{table_type} 第 {sequence_number} 列缺少排料圖或尺碼件數")]
    MissingMarker {
        table_type: TableType,
        sequence_number: u32,
    },

    #[error("{table_type} 第 {sequence_number} 列層數必須大於 0")]
    InvalidLayers {
        table_type: TableType,
        sequence_number: u32,
    },

    #[error("{table_type} 第 {sequence_number} 列{field}必須大於 0")]
    InvalidStripField {
        table_type: TableType,
        sequence_number: u32,
        field: &'static str,
    },

    #[error("{table_type} 裁剪表重複: 裁剪室 {cutting_room}、目的地 {destination}、布料類型 {fabric_type}")]
    DuplicateTable {
        table_type: TableType,
        cutting_room: String,
        destination: String,
        fabric_type: String,
    },

    #[error("生產中心組合重複: {production_center} / {cutting_room} / {destination}")]
    DuplicateCombination {
        production_center: String,
        cutting_room: String,
        destination: String,
    },
}

/// 驗證整份計劃快照
///
/// 依存檔順序逐一檢查裁剪表欄位、組合指派與資料列，再檢查各類型內的唯一性，
/// 最後檢查組合唯一性。回傳第一個發現的錯誤。
pub fn validate_snapshot(
    tables: &[PlanningTable],
    combinations: &[ProductionCenterCombination],
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    for table_type in TableType::SAVE_ORDER {
        for table in tables.iter().filter(|t| t.table_type == table_type) {
            validate_table(table, combinations, config)?;
            for row in &table.rows {
                validate_row(table_type, row)?;
            }
        }
    }

    for table_type in TableType::SAVE_ORDER {
        check_unique_tables(tables, table_type)?;
    }

    check_unique_combinations(combinations)
}

fn validate_table(
    table: &PlanningTable,
    combinations: &[ProductionCenterCombination],
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    let missing = |field| ValidationError::MissingTableField {
        table_type: table.table_type,
        table_id: table.id.clone(),
        field,
    };

    if table.fabric_type.trim().is_empty() {
        return Err(missing("布料類型"));
    }
    if table.fabric_code.trim().is_empty() {
        return Err(missing("布料代碼"));
    }
    if table.fabric_color.trim().is_empty() {
        return Err(missing("布料顏色"));
    }
    if table.table_type.is_spreading() && table.spreading_method.is_none() {
        return Err(missing("鋪布方式"));
    }

    let Some(combination_id) = table.combination_id.as_deref() else {
        return Err(ValidationError::MissingAssignment {
            table_type: table.table_type,
            table_id: table.id.clone(),
        });
    };
    if !combinations.iter().any(|c| c.combination_id == combination_id) {
        return Err(ValidationError::UnknownCombination {
            table_type: table.table_type,
            combination_id: combination_id.to_string(),
        });
    }
    if table.production_center.is_empty() || table.cutting_room.is_empty() {
        return Err(ValidationError::MissingAssignment {
            table_type: table.table_type,
            table_id: table.id.clone(),
        });
    }
    if table.destination.is_empty() && config.requires_destination(&table.cutting_room) {
        return Err(ValidationError::MissingDestination {
            table_type: table.table_type,
            cutting_room: table.cutting_room.clone(),
        });
    }
    Ok(())
}

fn validate_row(table_type: TableType, row: &PlanningRow) -> Result<(), ValidationError> {
    let sequence_number = row.sequence_number;

    if table_type.is_spreading() {
        let has_sizes = row.pieces_per_size.as_ref().is_some_and(|p| !p.is_empty());
        if row.marker_name.trim().is_empty() || !has_sizes {
            return Err(ValidationError::MissingMarker {
                table_type,
                sequence_number,
            });
        }
        if row.layers == 0 {
            return Err(ValidationError::InvalidLayers {
                table_type,
                sequence_number,
            });
        }
        return Ok(());
    }

    let invalid = |field| ValidationError::InvalidStripField {
        table_type,
        sequence_number,
        field,
    };
    let Some(strip) = &row.strip else {
        return Err(invalid("布條數"));
    };
    if strip.pieces == 0 {
        return Err(invalid("布條數"));
    }
    if strip.usable_width <= Decimal::ZERO {
        return Err(invalid("可用幅寬"));
    }
    if strip.gross_length <= Decimal::ZERO {
        return Err(invalid("毛長"));
    }
    if strip.strip_width <= Decimal::ZERO {
        return Err(invalid("布條寬度"));
    }
    Ok(())
}

/// 同一類型內 (裁剪室, 目的地, 布料類型) 必須唯一
fn check_unique_tables(
    tables: &[PlanningTable],
    table_type: TableType,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for table in tables.iter().filter(|t| t.table_type == table_type) {
        let key = (
            table.cutting_room.as_str(),
            table.destination.as_str(),
            table.fabric_type.as_str(),
        );
        if !seen.insert(key) {
            return Err(ValidationError::DuplicateTable {
                table_type,
                cutting_room: table.cutting_room.clone(),
                destination: table.destination.clone(),
                fabric_type: table.fabric_type.clone(),
            });
        }
    }
    Ok(())
}

fn check_unique_combinations(
    combinations: &[ProductionCenterCombination],
) -> Result<(), ValidationError> {
    for (i, combination) in combinations.iter().enumerate() {
        if combinations[..i].iter().any(|c| c.same_assignment(combination)) {
            return Err(ValidationError::DuplicateCombination {
                production_center: combination.production_center.clone(),
                cutting_room: combination.cutting_room.clone(),
                destination: combination.destination.clone(),
            });
        }
    }
    Ok(())
}
