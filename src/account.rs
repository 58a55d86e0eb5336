use crate::cart::Cart;
use crate::order::Order;

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
}

impl Profile {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            address: address.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.full_name(), self.address)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    username: String,
    password: String,
    pub profile: Profile,
    pub cart: Cart,
    history: Vec<Order>,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>, profile: Profile) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            profile,
            cart: Cart::new(),
            history: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Orders in the order they were placed.
    pub fn history(&self) -> &[Order] {
        &self.history
    }

    pub(crate) fn record_order(&mut self, order: Order) {
        self.history.push(order);
    }

    pub(crate) fn set_history(&mut self, history: Vec<Order>) {
        self.history = history;
    }
}
