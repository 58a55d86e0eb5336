//! Persistence of the catalog, accounts, carts and order history.
//!
//! Absent data is never an error: a store with nothing saved yet loads as an
//! empty catalog, no accounts, empty carts and empty histories.

mod file;
mod memory;

pub use file::CsvStorage;
pub use memory::MemoryStorage;

use crate::account::Account;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::order::Order;
use crate::product::ProductId;

use std::collections::BTreeMap;

pub trait Storage {
    fn load_catalog(&self) -> Result<Catalog, StorageError>;
    fn save_catalog(&mut self, catalog: &Catalog) -> Result<(), StorageError>;

    /// Accounts come back with credentials and profile only; carts and
    /// histories are loaded separately.
    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError>;
    fn save_accounts(&mut self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError>;

    fn load_cart(&self, username: &str) -> Result<Vec<(ProductId, u32)>, StorageError>;
    fn save_cart(&mut self, username: &str, cart: &Cart) -> Result<(), StorageError>;

    fn load_history(&self, username: &str) -> Result<Vec<Order>, StorageError>;
    fn save_history(&mut self, username: &str, history: &[Order]) -> Result<(), StorageError>;
}
