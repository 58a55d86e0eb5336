use crate::product::ProductId;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: i64,
        available: u32,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Product not in cart: {0}")]
    NotInCart(ProductId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid registration: {message}")]
    InvalidRegistration { message: String },

    #[error("Cart is empty, add items before checking out")]
    EmptyCart,

    #[error("No checkout is awaiting confirmation")]
    NoPendingCheckout,

    #[error("No user is logged in")]
    NotLoggedIn,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("Failed to encode {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Deserialize(#[from] toml::de::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument <{argument}> for {command}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Not a number: {0}")]
    InvalidNumber(String),
}
