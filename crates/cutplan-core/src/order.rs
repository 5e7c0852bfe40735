//! 訂單模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quantity::SizeQuantityMap;
use crate::{CutPlanError, Result};

/// 訂單尺碼數量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSize {
    pub size: String,
    pub qty: Decimal,
}

impl OrderSize {
    pub fn new(size: impl Into<String>, qty: impl Into<Decimal>) -> Self {
        Self {
            size: size.into(),
            qty: qty.into(),
        }
    }
}

/// 生產訂單
///
/// 在一次計劃作業中不可變，重新載入或放棄修改時整體替換。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單號
    pub id: String,

    /// 款式
    pub style: String,

    /// 季節
    pub season: String,

    /// 顏色代碼
    pub color_code: String,

    /// 尺碼數量（依訂單順序，尺碼不可重複）
    pub sizes: Vec<OrderSize>,
}

impl Order {
    /// 創建新的訂單
    pub fn new(
        id: impl Into<String>,
        style: impl Into<String>,
        season: impl Into<String>,
        color_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            style: style.into(),
            season: season.into(),
            color_code: color_code.into(),
            sizes: Vec::new(),
        }
    }

    /// 建構器模式：添加尺碼
    pub fn with_size(mut self, size: impl Into<String>, qty: impl Into<Decimal>) -> Result<Self> {
        self.add_size(OrderSize::new(size, qty))?;
        Ok(self)
    }

    /// 添加尺碼，重複時回傳錯誤
    pub fn add_size(&mut self, size: OrderSize) -> Result<()> {
        if self.sizes.iter().any(|s| s.size == size.size) {
            return Err(CutPlanError::DuplicateSize {
                order: self.id.clone(),
                size: size.size,
            });
        }
        self.sizes.push(size);
        Ok(())
    }

    /// 尺碼數量映射
    pub fn size_quantities(&self) -> SizeQuantityMap {
        self.sizes
            .iter()
            .map(|s| (s.size.clone(), s.qty))
            .collect()
    }

    /// 訂單總數量
    pub fn total_quantity(&self) -> Decimal {
        self.sizes.iter().map(|s| s.qty).sum()
    }
}

/// 訂單狀態（來自訂單明細）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 進行中
    Open,
    /// 已結案
    Closed,
}

impl OrderStatus {
    /// 由狀態代碼轉換（3 = 進行中, 4 = 已結案）
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            3 => Ok(Self::Open),
            4 => Ok(Self::Closed),
            other => Err(CutPlanError::InvalidOrderStatus(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Open => 3,
            Self::Closed => 4,
        }
    }
}

/// 訂單明細（每列一個尺碼）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub order: String,
    pub style: String,
    pub season: String,
    pub color_code: String,
    pub size: String,
    pub quantity: Decimal,
    pub status: u8,
}

/// 將訂單明細組合成訂單
///
/// 依明細出現順序建立訂單與尺碼；同一訂單重複出現的尺碼數量累加。
/// `status` 為 `Some` 時只保留該狀態的明細，無法辨識的狀態代碼會被略過。
pub fn orders_from_lines(lines: &[OrderLine], status: Option<OrderStatus>) -> Vec<Order> {
    let mut orders: Vec<Order> = Vec::new();

    for line in lines {
        if let Some(wanted) = status {
            match OrderStatus::from_code(line.status) {
                Ok(s) if s == wanted => {}
                _ => continue,
            }
        }

        let index = match orders.iter().position(|o| o.id == line.order) {
            Some(index) => index,
            None => {
                orders.push(Order::new(
                    line.order.clone(),
                    line.style.clone(),
                    line.season.clone(),
                    line.color_code.clone(),
                ));
                orders.len() - 1
            }
        };

        let order = &mut orders[index];
        match order.sizes.iter_mut().find(|s| s.size == line.size) {
            Some(existing) => existing.qty += line.quantity,
            None => order.sizes.push(OrderSize::new(line.size.clone(), line.quantity)),
        }
    }

    orders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(order: &str, size: &str, qty: i64, status: u8) -> OrderLine {
        OrderLine {
            order: order.to_string(),
            style: "ST-01".to_string(),
            season: "FW25".to_string(),
            color_code: "001".to_string(),
            size: size.to_string(),
            quantity: Decimal::from(qty),
            status,
        }
    }

    #[test]
    fn test_create_order() {
        let order = Order::new("ORD-0012345", "ST-01", "FW25", "001")
            .with_size("S", 100)
            .unwrap()
            .with_size("M", 200)
            .unwrap();

        assert_eq!(order.sizes.len(), 2);
        assert_eq!(order.total_quantity(), Decimal::from(300));
        assert_eq!(order.size_quantities().get("M"), Decimal::from(200));
    }

    #[test]
    fn test_duplicate_size_rejected() {
        let result = Order::new("ORD-1", "ST", "FW", "001")
            .with_size("S", 10)
            .unwrap()
            .with_size("S", 5);

        assert!(matches!(result, Err(CutPlanError::DuplicateSize { .. })));
    }

    #[test]
    fn test_orders_from_lines() {
        let lines = vec![
            line("A", "S", 10, 3),
            line("A", "M", 20, 3),
            line("B", "S", 5, 4),
            line("A", "S", 1, 3),
        ];

        let orders = orders_from_lines(&lines, None);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, "A");
        assert_eq!(orders[0].sizes[0], OrderSize::new("S", 11));
        assert_eq!(orders[0].sizes[1], OrderSize::new("M", 20));

        let open = orders_from_lines(&lines, Some(OrderStatus::Open));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "A");

        let closed = orders_from_lines(&lines, Some(OrderStatus::Closed));
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id, "B");
    }

    #[test]
    fn test_order_status_codes() {
        assert_eq!(OrderStatus::from_code(3).unwrap(), OrderStatus::Open);
        assert_eq!(OrderStatus::from_code(4).unwrap(), OrderStatus::Closed);
        assert!(OrderStatus::from_code(9).is_err());
        assert_eq!(OrderStatus::Closed.code(), 4);
    }
}
