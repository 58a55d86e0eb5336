use crate::account::{Account, Profile};
use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::command::{Input, View, HELP};
use crate::config::ShopConfig;
use crate::engine::action::{Action, Outcome};
use crate::error::{InputError, ShopError, StorageError};
use crate::order::Order;
use crate::product::ProductId;
use crate::storage::Storage;

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Checkout progress of the logged-in account.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    Browsing,
    CartNonEmpty,
    Confirming { total: Decimal },
    Completed,
}

impl CheckoutState {
    fn of(cart: &Cart) -> Self {
        if cart.is_empty() {
            CheckoutState::Browsing
        } else {
            CheckoutState::CartNonEmpty
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    username: String,
    state: CheckoutState,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }
}

/// Owns the catalog and the account registry, and routes user actions to
/// them. Every mutation is persisted through `S` before returning; a failed
/// save is logged and the operation still succeeds.
pub struct Shop<S: Storage> {
    storage: S,
    catalog: Catalog,
    accounts: BTreeMap<String, Account>,
    session: Option<Session>,
    min_password_len: usize,
}

impl<S: Storage> Shop<S> {
    pub fn open(storage: S, config: &ShopConfig) -> Self {
        let catalog = or_empty(storage.load_catalog(), "catalog");
        let mut accounts = or_empty(storage.load_accounts(), "account list");

        for (username, account) in accounts.iter_mut() {
            // The stored catalog already has these units deducted
            let lines = or_empty(storage.load_cart(username), "cart")
                .into_iter()
                .filter(|(id, _)| {
                    let known = catalog.get(id).is_some();
                    if !known {
                        warn!("Dropping unknown product {} from {}'s cart", id, username);
                    }
                    known
                });
            account.cart = Cart::restore(lines);
            account.set_history(or_empty(storage.load_history(username), "history"));
        }

        let mut shop = Self {
            storage,
            catalog,
            accounts,
            session: None,
            min_password_len: config.min_password_len,
        };

        if shop.catalog.is_empty() && config.seed_catalog {
            info!("Seeding empty catalog with sample products");
            shop.catalog = Catalog::sample();
            log_failed_save(shop.storage.save_catalog(&shop.catalog), "seeded catalog");
        }

        info!(
            "Opened shop with {} products and {} accounts",
            shop.catalog.len(),
            shop.accounts.len()
        );
        shop
    }

    pub fn apply(&mut self, action: Action) -> Result<Outcome, ShopError> {
        match action {
            Action::Register {
                username,
                password,
                profile,
            } => {
                self.register(&username, &password, profile)?;
                Ok(Outcome::Registered(username))
            }
            Action::Login { username, password } => {
                self.login(&username, &password)?;
                Ok(Outcome::LoggedIn(username))
            }
            Action::Logout => Ok(Outcome::LoggedOut(self.logout()?)),
            Action::AddToCart { product, quantity } => {
                let in_cart = self.add_to_cart(&product, quantity)?;
                Ok(Outcome::Added { product, in_cart })
            }
            Action::RemoveFromCart { product, quantity } => {
                let in_cart = self.remove_from_cart(&product, quantity)?;
                Ok(Outcome::Removed { product, in_cart })
            }
            Action::ClearCart => Ok(Outcome::Cleared {
                released: self.clear_cart()?,
            }),
            Action::Checkout => Ok(Outcome::AwaitingConfirmation {
                total: self.begin_checkout()?,
            }),
            Action::Confirm(accept) => match self.confirm_checkout(accept)? {
                Some(order) => Ok(Outcome::OrderPlaced(order)),
                None => Ok(Outcome::CheckoutDeclined),
            },
        }
    }

    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        profile: Profile,
    ) -> Result<(), ShopError> {
        if self.accounts.contains_key(username) {
            return Err(ShopError::UsernameTaken(username.to_string()));
        }
        validate_registration(username, password, &profile, self.min_password_len)?;

        self.accounts.insert(
            username.to_string(),
            Account::new(username, password, profile),
        );
        info!("Registered user {}", username);

        log_failed_save(self.storage.save_accounts(&self.accounts), "account list");
        Ok(())
    }

    /// Makes `username` the active session, logging out any other session
    /// first.
    pub fn login(&mut self, username: &str, password: &str) -> Result<&Account, ShopError> {
        let valid = self
            .accounts
            .get(username)
            .is_some_and(|account| account.verify_password(password));
        if !valid {
            info!("Rejected login for {}", username);
            return Err(ShopError::InvalidCredentials);
        }

        if self.session.is_some() {
            self.logout()?;
        }

        let account = self
            .accounts
            .get(username)
            .ok_or(ShopError::InvalidCredentials)?;
        self.session = Some(Session {
            username: username.to_string(),
            state: CheckoutState::of(&account.cart),
        });
        info!("User {} logged in", username);

        Ok(account)
    }

    /// Persists the active account's cart and history, then ends the session.
    pub fn logout(&mut self) -> Result<String, ShopError> {
        let session = self.session.as_ref().ok_or(ShopError::NotLoggedIn)?;
        let account = self
            .accounts
            .get(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        log_failed_save(self.storage.save_cart(account.username(), &account.cart), "cart");
        log_failed_save(
            self.storage.save_history(account.username(), account.history()),
            "history",
        );

        let username = session.username.clone();
        self.session = None;
        info!("User {} logged out", username);

        Ok(username)
    }

    pub fn add_to_cart(&mut self, product: &ProductId, quantity: i64) -> Result<u32, ShopError> {
        let session = self.session.as_mut().ok_or(ShopError::NotLoggedIn)?;
        let account = self
            .accounts
            .get_mut(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        let in_cart = account.cart.add(&mut self.catalog, product, quantity)?;
        session.state = CheckoutState::of(&account.cart);
        debug!("{} reserved {}x{}", session.username, product, quantity);

        self.persist_cart();
        Ok(in_cart)
    }

    pub fn remove_from_cart(
        &mut self,
        product: &ProductId,
        quantity: i64,
    ) -> Result<u32, ShopError> {
        let session = self.session.as_mut().ok_or(ShopError::NotLoggedIn)?;
        let account = self
            .accounts
            .get_mut(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        let in_cart = account.cart.remove(&mut self.catalog, product, quantity)?;
        session.state = CheckoutState::of(&account.cart);
        debug!("{} released {}x{}", session.username, product, quantity);

        self.persist_cart();
        Ok(in_cart)
    }

    /// Empties the cart and returns every reserved unit to the catalog.
    pub fn clear_cart(&mut self) -> Result<u64, ShopError> {
        let session = self.session.as_mut().ok_or(ShopError::NotLoggedIn)?;
        let account = self
            .accounts
            .get_mut(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        let released = account.cart.clear(&mut self.catalog)?;
        session.state = CheckoutState::Browsing;
        debug!("{} emptied cart, {} units released", session.username, released);

        self.persist_cart();
        Ok(released)
    }

    pub fn cart_total(&self) -> Result<Decimal, ShopError> {
        Ok(self.active_account()?.cart.total(&self.catalog))
    }

    /// Moves to confirmation and returns the amount due. A cart totalling
    /// zero is rejected without changing state.
    pub fn begin_checkout(&mut self) -> Result<Decimal, ShopError> {
        let session = self.session.as_mut().ok_or(ShopError::NotLoggedIn)?;
        let account = self
            .accounts
            .get(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        let total = account.cart.total(&self.catalog);
        if total.is_zero() {
            return Err(ShopError::EmptyCart);
        }

        session.state = CheckoutState::Confirming { total };
        Ok(total)
    }

    /// Settles a pending checkout. On acceptance the cart becomes an order
    /// and its units stay sold; declining leaves cart and stock untouched.
    pub fn confirm_checkout(&mut self, accept: bool) -> Result<Option<Order>, ShopError> {
        let session = self.session.as_mut().ok_or(ShopError::NotLoggedIn)?;
        if !matches!(session.state, CheckoutState::Confirming { .. }) {
            return Err(ShopError::NoPendingCheckout);
        }
        let account = self
            .accounts
            .get_mut(&session.username)
            .ok_or(ShopError::NotLoggedIn)?;

        if !accept {
            session.state = CheckoutState::of(&account.cart);
            info!("{} cancelled checkout", session.username);
            return Ok(None);
        }

        let order = Order::from_cart_lines(account.cart.take_lines(), &self.catalog, Utc::now());
        account.record_order(order.clone());
        session.state = CheckoutState::Completed;
        info!("{} placed an order totalling {}", session.username, order.total());

        log_failed_save(self.storage.save_catalog(&self.catalog), "catalog");
        log_failed_save(
            self.storage.save_history(account.username(), account.history()),
            "history",
        );
        log_failed_save(self.storage.save_cart(account.username(), &account.cart), "cart");

        Ok(Some(order))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_account(&self) -> Option<&Account> {
        self.active_account().ok()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn dump_catalog<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(&mut writer, "id,name,price,stock,description")?;

        for product in self.catalog.products() {
            writeln!(
                &mut writer,
                "{},{},{},{},{}",
                product.id,
                product.name,
                product.price,
                product.stock,
                product.description.as_deref().unwrap_or_default()
            )?;
        }

        Ok(())
    }

    pub fn dump_cart<W: Write>(&self, account: &Account, mut writer: W) -> io::Result<()> {
        if account.cart.is_empty() {
            return writeln!(&mut writer, "Your cart is empty.");
        }

        writeln!(&mut writer, "product,name,quantity,subtotal")?;
        for line in account.cart.lines() {
            let (name, price) = self
                .catalog
                .get(&line.product_id)
                .map_or(("?", Decimal::ZERO), |p| (p.name.as_str(), p.price));
            writeln!(
                &mut writer,
                "{},{},{},{}",
                line.product_id,
                name,
                line.quantity,
                price.saturating_mul(Decimal::from(line.quantity))
            )?;
        }
        writeln!(&mut writer, "total,{}", account.cart.total(&self.catalog))
    }

    pub fn dump_history<W: Write>(&self, account: &Account, mut writer: W) -> io::Result<()> {
        if account.history().is_empty() {
            return writeln!(&mut writer, "No purchase history.");
        }

        for order in account.history() {
            writeln!(&mut writer, "{}", order)?;
        }
        Ok(())
    }

    /// Runs one parsed input line and writes the reply. Business errors are
    /// written as replies; only a failing writer is an error here.
    pub fn respond<W: Write>(
        &mut self,
        input: Result<Input, InputError>,
        mut writer: W,
    ) -> io::Result<()> {
        let input = match input {
            Ok(input) => input,
            Err(e) => return writeln!(&mut writer, "Error: {}. Type 'help' for commands.", e),
        };

        match input {
            Input::Help => write!(&mut writer, "{}", HELP),
            Input::Quit => Ok(()),
            Input::Show(View::Products) => self.dump_catalog(writer),
            Input::Show(view) => {
                let Some(account) = self.current_account() else {
                    return writeln!(&mut writer, "Error: {}", ShopError::NotLoggedIn);
                };
                match view {
                    View::Products => self.dump_catalog(writer),
                    View::Cart => self.dump_cart(account, writer),
                    View::History => self.dump_history(account, writer),
                    View::Whoami => {
                        writeln!(&mut writer, "{} ({})", account.username(), account.profile)
                    }
                }
            }
            Input::Action(action) => match self.apply(action) {
                Ok(outcome) => writeln!(&mut writer, "{}", outcome),
                Err(e) => writeln!(&mut writer, "Error: {}", self.describe(&e)),
            },
        }
    }

    /// Human-readable message for `error`, naming products where possible.
    pub fn describe(&self, error: &ShopError) -> String {
        match error {
            ShopError::InsufficientStock {
                product, available, ..
            } => match self.catalog.get(product) {
                Some(p) => format!("Sorry, only {} of {} are available.", available, p.name),
                None => error.to_string(),
            },
            ShopError::NotInCart(product) => match self.catalog.get(product) {
                Some(p) => format!("{} is not in the cart.", p.name),
                None => error.to_string(),
            },
            _ => error.to_string(),
        }
    }

    fn active_account(&self) -> Result<&Account, ShopError> {
        let session = self.session.as_ref().ok_or(ShopError::NotLoggedIn)?;
        self.accounts
            .get(&session.username)
            .ok_or(ShopError::NotLoggedIn)
    }

    fn persist_cart(&mut self) {
        let Some(account) = self
            .session
            .as_ref()
            .and_then(|session| self.accounts.get(&session.username))
        else {
            return;
        };

        log_failed_save(self.storage.save_catalog(&self.catalog), "catalog");
        log_failed_save(self.storage.save_cart(account.username(), &account.cart), "cart");
    }
}

fn or_empty<T: Default>(result: Result<T, StorageError>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!("{}, using an empty {}", e, what);
        T::default()
    })
}

// Saves never fail an operation; the in-memory state stays authoritative and
// is written again on the next mutation.
fn log_failed_save(result: Result<(), StorageError>, what: &str) {
    if let Err(e) = result {
        warn!("Failed to save {}: {}", what, e);
    }
}

fn validate_registration(
    username: &str,
    password: &str,
    profile: &Profile,
    min_password_len: usize,
) -> Result<(), ShopError> {
    let invalid = |message: String| -> Result<(), ShopError> {
        Err(ShopError::InvalidRegistration { message })
    };

    let fields: [&str; 5] = [
        username,
        password,
        &profile.first_name,
        &profile.last_name,
        &profile.address,
    ];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return invalid("Please fill in all required fields".to_string());
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return invalid("Username may only contain letters, digits, '_' and '-'".to_string());
    }

    if password.chars().count() < min_password_len {
        return invalid(format!(
            "Password must be at least {} characters long",
            min_password_len
        ));
    }

    if password.trim() != password {
        return invalid("Password cannot start or end with whitespace".to_string());
    }

    Ok(())
}
