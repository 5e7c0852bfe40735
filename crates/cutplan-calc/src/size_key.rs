//! 尺碼鍵正規化

use cutplan_core::SizeQuantityMap;

/// 尺碼鍵正規化器
///
/// 訂單尺碼與排料系統尺碼使用不同分隔符號（"3-4" 與 "3_4"），
/// 所有以尺碼為鍵的比較都必須先經過這裡，否則跨系統的對應會默默失敗。
pub struct SizeKeyNormalizer;

impl SizeKeyNormalizer {
    /// 將 `-` 替換為 `_`，空字串原樣返回
    pub fn normalize(size: &str) -> String {
        if size.is_empty() {
            return String::new();
        }
        size.replace('-', "_")
    }

    /// 正規化所有鍵（正規化後相同的鍵數量累加）
    pub fn normalize_map(map: &SizeQuantityMap) -> SizeQuantityMap {
        let mut normalized = SizeQuantityMap::new();
        for (size, qty) in map {
            normalized.add(Self::normalize(size), *qty);
        }
        normalized
    }

    /// 正規化後比較：鍵集合相同且每個尺碼數量完全相等
    pub fn equal_quantities(a: &SizeQuantityMap, b: &SizeQuantityMap) -> bool {
        Self::normalize_map(a) == Self::normalize_map(b)
    }

    /// 正規化後比較兩個尺碼標籤
    pub fn same_size(a: &str, b: &str) -> bool {
        Self::normalize(a) == Self::normalize(b)
    }
}
