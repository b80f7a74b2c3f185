//! # Receipt Record
//!
//! The plain sale-data record handed to the external PDF renderer.
//!
//! The renderer consumes this record and returns an opaque byte blob;
//! the core does not depend on its formatting. Only the field set
//! matters, so this module is just data plus one constructor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{PaymentMethod, PaymentStatus, Sale, SaleItem};

/// One line of a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub price_at_sale: Money,
}

/// The complete sale-data record for receipt rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptData {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub salesperson_name: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub items: Vec<ReceiptLine>,
}

impl ReceiptData {
    /// Builds the receipt record from a sale and its items.
    pub fn from_sale(sale: &Sale, items: &[SaleItem]) -> Self {
        ReceiptData {
            id: sale.id.clone(),
            created_at: sale.created_at,
            salesperson_name: sale.salesperson_name.clone(),
            payment_method: sale.payment_method,
            payment_status: sale.payment_status,
            total_amount: sale.total,
            amount_paid: sale.paid,
            balance: sale.balance,
            items: items
                .iter()
                .map(|i| ReceiptLine {
                    name: i.product_name.clone(),
                    quantity: i.quantity,
                    price_at_sale: i.price_at_sale,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_from_sale() {
        let now = Utc::now();
        let sale = Sale {
            id: "s1".to_string(),
            salesperson_id: "u2".to_string(),
            salesperson_name: "Sam".to_string(),
            customer_name: Some("Chidi".to_string()),
            customer_phone: None,
            total: Money::from_cents(897),
            paid: Money::from_cents(897),
            balance: Money::zero(),
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let items = vec![SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: "p1".to_string(),
            product_name: "Coca-Cola 330ml".to_string(),
            product_sku: "COKE-330".to_string(),
            quantity: 3,
            price_at_sale: Money::from_cents(299),
            subtotal: Money::from_cents(897),
        }];

        let receipt = ReceiptData::from_sale(&sale, &items);
        assert_eq!(receipt.id, "s1");
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].quantity, 3);
        assert_eq!(receipt.total_amount, Money::from_cents(897));
        assert!(receipt.balance.is_zero());
    }
}
