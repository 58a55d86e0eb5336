pub mod action;
pub mod shop;

pub use action::{Action, Outcome};
pub use shop::{CheckoutState, Session, Shop};

#[cfg(test)]
mod unit_tests;
