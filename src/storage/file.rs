use crate::account::{Account, Profile};
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::error::StorageError;
use crate::order::{Order, OrderLine};
use crate::product::{Product, ProductId};
use crate::storage::Storage;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PRODUCTS_FILE: &str = "products.csv";
const USERS_FILE: &str = "users.csv";

/// Flat CSV files in one data directory.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountRecord {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    address: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CartRecord {
    product_id: ProductId,
    quantity: u32,
}

// One row per order line; rows of the same order share the `order` index.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRecord {
    order: usize,
    placed_at: DateTime<Utc>,
    product_id: ProductId,
    name: String,
    #[serde(with = "rust_decimal::serde::str")]
    unit_price: Decimal,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    total: Decimal,
}

impl CsvStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cart_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}_cart.csv", username))
    }

    fn history_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}_history.csv", username))
    }
}

impl Storage for CsvStorage {
    fn load_catalog(&self) -> Result<Catalog, StorageError> {
        let path = self.dir.join(PRODUCTS_FILE);
        let products = read_records::<Product>(&path)?
            .into_iter()
            .filter(|product| {
                if !product.is_valid() {
                    warn!("Skipping product {} with negative price", product.id);
                }
                product.is_valid()
            });

        Ok(Catalog::from_products(products))
    }

    fn save_catalog(&mut self, catalog: &Catalog) -> Result<(), StorageError> {
        write_records(&self.dir.join(PRODUCTS_FILE), catalog.products())
    }

    fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError> {
        let mut accounts = BTreeMap::new();

        for record in read_records::<AccountRecord>(&self.dir.join(USERS_FILE))? {
            if accounts.contains_key(&record.username) {
                warn!("Skipping duplicate user {}", record.username);
                continue;
            }
            let profile = Profile::new(record.first_name, record.last_name, record.address);
            accounts.insert(
                record.username.clone(),
                Account::new(record.username, record.password, profile),
            );
        }

        Ok(accounts)
    }

    fn save_accounts(&mut self, accounts: &BTreeMap<String, Account>) -> Result<(), StorageError> {
        let records = accounts.values().map(|account| AccountRecord {
            username: account.username().to_string(),
            password: account.password().to_string(),
            first_name: account.profile.first_name.clone(),
            last_name: account.profile.last_name.clone(),
            address: account.profile.address.clone(),
        });

        write_records(&self.dir.join(USERS_FILE), records)
    }

    fn load_cart(&self, username: &str) -> Result<Vec<(ProductId, u32)>, StorageError> {
        Ok(read_records::<CartRecord>(&self.cart_path(username))?
            .into_iter()
            .map(|record| (record.product_id, record.quantity))
            .collect())
    }

    fn save_cart(&mut self, username: &str, cart: &Cart) -> Result<(), StorageError> {
        let records = cart.lines().map(|line| CartRecord {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        });

        write_records(&self.cart_path(username), records)
    }

    fn load_history(&self, username: &str) -> Result<Vec<Order>, StorageError> {
        let mut groups: Vec<(usize, DateTime<Utc>, Decimal, Vec<OrderLine>)> = Vec::new();

        for record in read_records::<HistoryRecord>(&self.history_path(username))? {
            let line = OrderLine {
                product_id: record.product_id,
                name: record.name,
                unit_price: record.unit_price,
                quantity: record.quantity,
            };

            if let Some(group) = groups.last_mut().filter(|group| group.0 == record.order) {
                group.3.push(line);
            } else {
                groups.push((record.order, record.placed_at, record.total, vec![line]));
            }
        }

        Ok(groups
            .into_iter()
            .map(|(_, placed_at, total, lines)| Order::new(placed_at, lines, total))
            .collect())
    }

    fn save_history(&mut self, username: &str, history: &[Order]) -> Result<(), StorageError> {
        let records = history.iter().enumerate().flat_map(|(index, order)| {
            order.lines().iter().map(move |line| HistoryRecord {
                order: index,
                placed_at: order.placed_at(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                total: order.total(),
            })
        });

        write_records(&self.history_path(username), records)
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(StorageError::Unavailable(e)),
    };
    let rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    // Skip malformed rows and keep the rest
    let records: Vec<T> = rdr
        .into_deserialize::<T>()
        .filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping invalid record in {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

// Writes to a sibling temp file and renames it into place.
fn write_records<T: Serialize>(
    path: &Path,
    records: impl IntoIterator<Item = T>,
) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    let csv_error = |source: csv::Error| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = WriterBuilder::new().from_path(&tmp).map_err(csv_error)?;
    let mut written = 0usize;
    for record in records {
        wtr.serialize(record).map_err(csv_error)?;
        written += 1;
    }
    wtr.flush()?;
    drop(wtr);

    fs::rename(&tmp, path)?;
    debug!("Saved {} records to {}", written, path.display());
    Ok(())
}
