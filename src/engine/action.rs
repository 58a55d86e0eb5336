use crate::account::Profile;
use crate::order::Order;
use crate::product::ProductId;

use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Register {
        username: String,
        password: String,
        profile: Profile,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    AddToCart {
        product: ProductId,
        quantity: i64,
    },
    RemoveFromCart {
        product: ProductId,
        quantity: i64,
    },
    ClearCart,
    Checkout,
    Confirm(bool),
}

impl Action {
    pub fn register(username: &str, password: &str, profile: Profile) -> Self {
        Self::Register {
            username: username.to_string(),
            password: password.to_string(),
            profile,
        }
    }

    pub fn login(username: &str, password: &str) -> Self {
        Self::Login {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn add(product: impl Into<ProductId>, quantity: i64) -> Self {
        Self::AddToCart {
            product: product.into(),
            quantity,
        }
    }

    pub fn remove(product: impl Into<ProductId>, quantity: i64) -> Self {
        Self::RemoveFromCart {
            product: product.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Registered(String),
    LoggedIn(String),
    LoggedOut(String),
    Added { product: ProductId, in_cart: u32 },
    Removed { product: ProductId, in_cart: u32 },
    Cleared { released: u64 },
    AwaitingConfirmation { total: Decimal },
    OrderPlaced(Order),
    CheckoutDeclined,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Registered(username) => write!(f, "Registered {}", username),
            Outcome::LoggedIn(username) => write!(f, "Welcome, {}!", username),
            Outcome::LoggedOut(username) => write!(f, "Logged out, {}", username),
            Outcome::Added { product, in_cart } => {
                write!(f, "Added product {} ({} in cart)", product, in_cart)
            }
            Outcome::Removed { product, in_cart } => {
                write!(f, "Removed product {} ({} left in cart)", product, in_cart)
            }
            Outcome::Cleared { released } => write!(f, "Cart emptied, {} items returned", released),
            Outcome::AwaitingConfirmation { total } => {
                write!(f, "Your total is {}. Proceed with checkout? (yes/no)", total)
            }
            Outcome::OrderPlaced(order) => write!(f, "Order placed. Total: {}", order.total()),
            Outcome::CheckoutDeclined => write!(f, "Checkout cancelled"),
        }
    }
}
