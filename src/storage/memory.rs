use crate::account::Account;
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::order::Order;
use crate::product::ProductId;
use crate::storage::Storage;

use std::collections::{BTreeMap, HashMap};

/// Keeps everything in memory. Counts saves so callers can check when
/// persistence was triggered.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    catalog: Catalog,
    accounts: BTreeMap<String, Account>,
    carts: HashMap<String, Vec<(ProductId, u32)>>,
    histories: HashMap<String, Vec<Order>>,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn stored_catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Storage for MemoryStorage {
    fn load_catalog(&self) -> Result<Catalog, StorageError> {
        Ok(self.catalog.clone())
    }

    fn save_catalog(&mut self, catalog: &Catalog) -> Result<(), StorageError> {
        self.catalog = catalog.clone();
        self.saves += 1;
        Ok(())
    }

    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError> {
        Ok(self.accounts.clone())
    }

    fn save_accounts(&mut self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError> {
        // Credentials and profile only
        self.accounts = accounts
            .iter()
            .map(|(username, account)| {
                let stored =
                    Account::new(username.clone(), account.password(), account.profile.clone());
                (username.clone(), stored)
            })
            .collect();
        self.saves += 1;
        Ok(())
    }

    fn load_cart(&self, username: &str) -> Result<Vec<(ProductId, u32)>, StorageError> {
        Ok(self.carts.get(username).cloned().unwrap_or_default())
    }

    fn save_cart(&mut self, username: &str, cart: &Cart) -> Result<(), StorageError> {
        let lines = cart
            .lines()
            .map(|line| (line.product_id.clone(), line.quantity))
            .collect();
        self.carts.insert(username.to_string(), lines);
        self.saves += 1;
        Ok(())
    }

    fn load_history(&self, username: &str) -> Result<Vec<Order>, StorageError> {
        Ok(self.histories.get(username).cloned().unwrap_or_default())
    }

    fn save_history(&mut self, username: &str, history: &[Order]) -> Result<(), StorageError> {
        self.histories.insert(username.to_string(), history.to_vec());
        self.saves += 1;
        Ok(())
    }
}
