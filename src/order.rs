use crate::cart::CartLine;
use crate::catalog::Catalog;
use crate::product::ProductId;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::warn;

/// A cart line frozen at checkout, with the name and price it sold at.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Record of a completed checkout. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    placed_at: DateTime<Utc>,
    lines: Vec<OrderLine>,
    total: Decimal,
}

impl Order {
    pub fn new(placed_at: DateTime<Utc>, lines: Vec<OrderLine>, total: Decimal) -> Self {
        Self {
            placed_at,
            lines,
            total,
        }
    }

    /// Snapshots cart lines against current catalog prices. Lines whose
    /// product is missing from the catalog are dropped.
    pub(crate) fn from_cart_lines(
        lines: Vec<CartLine>,
        catalog: &Catalog,
        placed_at: DateTime<Utc>,
    ) -> Self {
        let lines: Vec<OrderLine> = lines
            .into_iter()
            .filter_map(|line| match catalog.get(&line.product_id) {
                Some(product) => Some(OrderLine {
                    product_id: line.product_id,
                    name: product.name.clone(),
                    unit_price: product.price,
                    quantity: line.quantity,
                }),
                None => {
                    warn!(
                        "Dropping {}x{} from order, product no longer in catalog",
                        line.product_id, line.quantity
                    );
                    None
                }
            })
            .collect();
        let total = lines
            .iter()
            .map(OrderLine::subtotal)
            .fold(Decimal::ZERO, Decimal::saturating_add);

        Self::new(placed_at, lines, total)
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Date: {}", self.placed_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Items:")?;
        for line in &self.lines {
            writeln!(f, "  {} (x{}): {}", line.name, line.quantity, line.subtotal())?;
        }
        write!(f, "Total: {}", self.total)
    }
}
