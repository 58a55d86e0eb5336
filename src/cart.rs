use crate::catalog::Catalog;
use crate::error::ShopError;
use crate::product::ProductId;

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's uncommitted selection. Every unit in the cart is reserved, i.e.
/// already taken out of the catalog stock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: BTreeMap<ProductId, CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from persisted lines without touching any stock.
    /// Duplicate ids are merged and zero quantities dropped.
    pub fn restore(lines: impl IntoIterator<Item = (ProductId, u32)>) -> Self {
        let mut cart = Self::new();
        for (product_id, quantity) in lines {
            if quantity == 0 {
                continue;
            }
            let line = cart
                .lines
                .entry(product_id.clone())
                .or_insert(CartLine {
                    product_id,
                    quantity: 0,
                });
            line.quantity = line.quantity.saturating_add(quantity);
        }
        cart
    }

    /// Replays persisted lines through `add`, reserving stock for each one.
    /// Lines that cannot be reserved are skipped. Returns how many lines
    /// were applied.
    pub fn reserve_all(
        &mut self,
        catalog: &mut Catalog,
        lines: impl IntoIterator<Item = (ProductId, u32)>,
    ) -> usize {
        let mut applied = 0;
        for (product_id, quantity) in lines {
            match self.add(catalog, &product_id, i64::from(quantity)) {
                Ok(_) => applied += 1,
                Err(e) => warn!("Skipping cart line {}x{}: {}", product_id, quantity, e),
            }
        }
        applied
    }

    /// Reserves `quantity` units of `id`, merging with an existing line.
    /// Returns the line quantity after the merge.
    pub fn add(
        &mut self,
        catalog: &mut Catalog,
        id: &ProductId,
        quantity: i64,
    ) -> Result<u32, ShopError> {
        let qty = positive(quantity)?;

        let product = catalog.find(id)?;
        if product.stock < qty {
            return Err(ShopError::InsufficientStock {
                product: id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        let merged = self
            .quantity_of(id)
            .checked_add(qty)
            .ok_or(ShopError::InvalidQuantity(quantity))?;

        // The cart total must stay representable after the merge
        let others = self
            .lines
            .values()
            .filter(|line| &line.product_id != id)
            .map(|line| (&line.product_id, line.quantity));
        if checked_total(catalog, others.chain([(id, merged)])).is_none() {
            return Err(ShopError::InvalidQuantity(quantity));
        }

        catalog.adjust_stock(id, -i64::from(qty))?;
        self.lines.insert(
            id.clone(),
            CartLine {
                product_id: id.clone(),
                quantity: merged,
            },
        );

        Ok(merged)
    }

    /// Releases `quantity` units of `id` back to the catalog. Returns the
    /// quantity left in the cart; a line that reaches zero is dropped.
    pub fn remove(
        &mut self,
        catalog: &mut Catalog,
        id: &ProductId,
        quantity: i64,
    ) -> Result<u32, ShopError> {
        let reserved = self
            .lines
            .get(id)
            .map(|line| line.quantity)
            .ok_or_else(|| ShopError::NotInCart(id.clone()))?;

        let qty = positive(quantity)?;
        if qty > reserved {
            return Err(ShopError::InvalidQuantity(quantity));
        }

        catalog.adjust_stock(id, i64::from(qty))?;

        let remaining = reserved - qty;
        if remaining == 0 {
            self.lines.remove(id);
        } else if let Some(line) = self.lines.get_mut(id) {
            line.quantity = remaining;
        }

        Ok(remaining)
    }

    /// Returns every reserved unit to the catalog and empties the cart.
    /// Returns the number of units released.
    pub fn clear(&mut self, catalog: &mut Catalog) -> Result<u64, ShopError> {
        // Check every line up front so a failure leaves both sides untouched
        for line in self.lines.values() {
            let product = catalog.find(&line.product_id)?;
            if product.stock.checked_add(line.quantity).is_none() {
                return Err(ShopError::InvalidQuantity(i64::from(line.quantity)));
            }
        }

        let mut released = 0u64;
        for (id, line) in std::mem::take(&mut self.lines) {
            catalog.adjust_stock(&id, i64::from(line.quantity))?;
            released += u64::from(line.quantity);
        }

        Ok(released)
    }

    /// Empties the cart without touching stock. Used at checkout, where the
    /// reserved units are sold.
    pub(crate) fn take_lines(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines).into_values().collect()
    }

    /// Saturates at `Decimal::MAX` instead of overflowing.
    pub fn total(&self, catalog: &Catalog) -> Decimal {
        self.lines
            .values()
            .filter_map(|line| {
                let product = catalog.get(&line.product_id);
                if product.is_none() {
                    warn!("Cart line for unknown product {} left out of total", line.product_id);
                }
                product.map(|product| product.price.saturating_mul(Decimal::from(line.quantity)))
            })
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.lines.get(id).map_or(0, |line| line.quantity)
    }

    /// Total number of reserved units.
    pub fn item_count(&self) -> u64 {
        self.lines.values().map(|line| u64::from(line.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn checked_total<'a>(
    catalog: &Catalog,
    lines: impl IntoIterator<Item = (&'a ProductId, u32)>,
) -> Option<Decimal> {
    lines.into_iter().try_fold(Decimal::ZERO, |total, (id, quantity)| {
        match catalog.get(id) {
            Some(product) => {
                total.checked_add(product.price.checked_mul(Decimal::from(quantity))?)
            }
            None => Some(total),
        }
    })
}

fn positive(quantity: i64) -> Result<u32, ShopError> {
    if quantity <= 0 {
        return Err(ShopError::InvalidQuantity(quantity));
    }
    u32::try_from(quantity).map_err(|_| ShopError::InvalidQuantity(quantity))
}
