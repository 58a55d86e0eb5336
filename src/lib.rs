pub mod account;
pub mod cart;
pub mod catalog;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod order;
pub mod product;
pub mod storage;

use crate::config::ShopConfig;
use crate::engine::Shop;
use crate::storage::CsvStorage;

/// Opens the shop stored as CSV files under `config.data_dir`.
pub fn open_shop(config: &ShopConfig) -> Shop<CsvStorage> {
    Shop::open(CsvStorage::new(&config.data_dir), config)
}
