//! 裁剪表與計劃資料列模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::combination::ProductionCenterCombination;
use crate::identity::Identity;
use crate::quantity::SizeQuantityMap;

/// 裁剪表類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    /// 鋪布（床）
    Mattress,
    /// 黏合襯鋪布
    Adhesive,
    /// 直紋布條
    Along,
    /// 橫紋布條
    Weft,
    /// 斜紋布條
    Bias,
}

impl TableType {
    /// 存檔順序：後面的類型可能引用前面類型產生的識別
    pub const SAVE_ORDER: [TableType; 5] = [
        TableType::Mattress,
        TableType::Adhesive,
        TableType::Along,
        TableType::Weft,
        TableType::Bias,
    ];

    /// 是否為鋪布類（鋪布 / 黏合襯）
    pub fn is_spreading(self) -> bool {
        matches!(self, TableType::Mattress | TableType::Adhesive)
    }

    /// 是否為布條類（直紋 / 橫紋 / 斜紋）
    pub fn is_strip(self) -> bool {
        !self.is_spreading()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableType::Mattress => "MATTRESS",
            TableType::Adhesive => "ADHESIVE",
            TableType::Along => "ALONG",
            TableType::Weft => "WEFT",
            TableType::Bias => "BIAS",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 鋪布方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadingMethod {
    /// 自動鋪布機
    Automatic,
    /// 人工鋪布
    Manual,
}

/// 布條參數（寬度單位 cm，長度單位 m）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripSpec {
    /// 需求布條數
    pub pieces: u32,

    /// 可用幅寬
    pub usable_width: Decimal,

    /// 毛長
    pub gross_length: Decimal,

    /// 布條寬度
    pub strip_width: Decimal,
}

impl StripSpec {
    pub fn new(
        pieces: u32,
        usable_width: Decimal,
        gross_length: Decimal,
        strip_width: Decimal,
    ) -> Self {
        Self {
            pieces,
            usable_width,
            gross_length,
            strip_width,
        }
    }
}

/// 計劃資料列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningRow {
    /// 客戶端暫時鍵
    pub id: Uuid,

    /// 序號（決定持久化名稱，編輯時必須保持不變）
    pub sequence_number: u32,

    /// 排料圖名稱
    pub marker_name: String,

    /// 排料圖長度（m）
    pub marker_length: Decimal,

    /// 幅寬（cm）
    pub width: Decimal,

    /// 計劃層數
    pub layers: u32,

    /// 實際層數（生產回報）
    pub layers_actual: Option<u32>,

    /// 每層各尺碼件數
    pub pieces_per_size: Option<SizeQuantityMap>,

    /// 缸號
    pub bagno: Option<String>,

    /// 實際用量（m）
    pub cons_actual: Option<Decimal>,

    /// 布條參數（僅布條類）
    pub strip: Option<StripSpec>,

    /// 上次存檔確認的識別（布條列含底布）
    pub persisted_identities: Vec<Identity>,
}

impl PlanningRow {
    /// 創建新的資料列
    pub fn new(sequence_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence_number,
            marker_name: String::new(),
            marker_length: Decimal::ZERO,
            width: Decimal::ZERO,
            layers: 0,
            layers_actual: None,
            pieces_per_size: None,
            bagno: None,
            cons_actual: None,
            strip: None,
            persisted_identities: Vec::new(),
        }
    }

    /// 建構器模式：設置排料圖
    pub fn with_marker(
        mut self,
        marker_name: impl Into<String>,
        marker_length: Decimal,
        width: Decimal,
    ) -> Self {
        self.marker_name = marker_name.into();
        self.marker_length = marker_length;
        self.width = width;
        self
    }

    /// 建構器模式：設置每層件數
    pub fn with_pieces_per_size(mut self, pieces: SizeQuantityMap) -> Self {
        self.pieces_per_size = Some(pieces);
        self
    }

    /// 建構器模式：設置計劃層數
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    /// 建構器模式：設置實際層數
    pub fn with_layers_actual(mut self, layers: u32) -> Self {
        self.layers_actual = Some(layers);
        self
    }

    /// 建構器模式：設置缸號
    pub fn with_bagno(mut self, bagno: impl Into<String>) -> Self {
        self.bagno = Some(bagno.into());
        self
    }

    /// 建構器模式：設置實際用量
    pub fn with_cons_actual(mut self, cons: Decimal) -> Self {
        self.cons_actual = Some(cons);
        self
    }

    /// 建構器模式：設置布條參數
    pub fn with_strip(mut self, strip: StripSpec) -> Self {
        self.strip = Some(strip);
        self
    }

    /// 建構器模式：標記為已持久化（從遠端載入）
    pub fn with_persisted_identities(mut self, identities: Vec<Identity>) -> Self {
        self.persisted_identities = identities;
        self
    }

    /// 是否已存在遠端記錄
    pub fn is_persisted(&self) -> bool {
        !self.persisted_identities.is_empty()
    }

    /// 每層件數總和
    pub fn pieces_per_layer(&self) -> Decimal {
        self.pieces_per_size
            .as_ref()
            .map(SizeQuantityMap::total)
            .unwrap_or(Decimal::ZERO)
    }
}

/// 裁剪表（共享布料屬性的一組資料列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningTable {
    /// 裁剪表ID
    pub id: String,

    /// 類型
    pub table_type: TableType,

    /// 布料類型
    pub fabric_type: String,

    /// 布料代碼
    pub fabric_code: String,

    /// 布料顏色
    pub fabric_color: String,

    /// 鋪布方式（僅鋪布類）
    pub spreading_method: Option<SpreadingMethod>,

    /// 鋪布預留長度（m）
    pub allowance: Decimal,

    /// 指派的生產中心組合
    pub combination_id: Option<String>,

    /// 以下三欄為組合的冗餘副本，組合刪除時失效
    pub production_center: String,
    pub cutting_room: String,
    pub destination: String,

    /// 分部序號
    pub part_index: u32,

    /// 資料列
    pub rows: Vec<PlanningRow>,
}

impl PlanningTable {
    /// 創建新的裁剪表
    pub fn new(table_type: TableType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table_type,
            fabric_type: String::new(),
            fabric_code: String::new(),
            fabric_color: String::new(),
            spreading_method: None,
            allowance: Decimal::ZERO,
            combination_id: None,
            production_center: String::new(),
            cutting_room: String::new(),
            destination: String::new(),
            part_index: 1,
            rows: Vec::new(),
        }
    }

    /// 建構器模式：指定ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 建構器模式：設置布料
    pub fn with_fabric(
        mut self,
        fabric_type: impl Into<String>,
        fabric_code: impl Into<String>,
        fabric_color: impl Into<String>,
    ) -> Self {
        self.fabric_type = fabric_type.into();
        self.fabric_code = fabric_code.into();
        self.fabric_color = fabric_color.into();
        self
    }

    /// 建構器模式：設置鋪布方式
    pub fn with_spreading_method(mut self, method: SpreadingMethod) -> Self {
        self.spreading_method = Some(method);
        self
    }

    /// 建構器模式：設置預留長度
    pub fn with_allowance(mut self, allowance: Decimal) -> Self {
        self.allowance = allowance;
        self
    }

    /// 建構器模式：指派生產中心組合
    pub fn with_combination(mut self, combination: &ProductionCenterCombination) -> Self {
        self.assign_combination(combination);
        self
    }

    /// 建構器模式：設置分部
    pub fn with_part_index(mut self, part_index: u32) -> Self {
        self.part_index = part_index;
        self
    }

    /// 建構器模式：添加資料列
    pub fn with_row(mut self, row: PlanningRow) -> Self {
        self.rows.push(row);
        self
    }

    /// 指派生產中心組合（同步冗餘欄位）
    pub fn assign_combination(&mut self, combination: &ProductionCenterCombination) {
        self.combination_id = Some(combination.combination_id.clone());
        self.production_center = combination.production_center.clone();
        self.cutting_room = combination.cutting_room.clone();
        self.destination = combination.destination.clone();
    }

    /// 清除組合指派
    pub fn clear_combination(&mut self) {
        self.combination_id = None;
        self.production_center.clear();
        self.cutting_room.clear();
        self.destination.clear();
    }

    /// 是否使用指定組合
    pub fn uses_combination(&self, combination_id: &str) -> bool {
        self.combination_id.as_deref() == Some(combination_id)
    }

    /// 下一個可用序號
    pub fn next_sequence_number(&self) -> u32 {
        self.rows
            .iter()
            .map(|r| r.sequence_number)
            .max()
            .map_or(1, |max| max + 1)
    }
}
