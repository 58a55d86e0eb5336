use crate::account::Profile;
use crate::catalog::Catalog;
use crate::command::Input;
use crate::config::ShopConfig;
use crate::engine::action::{Action, Outcome};
use crate::engine::shop::{CheckoutState, Shop};
use crate::error::ShopError;
use crate::product::{Product, ProductId};
use crate::storage::{MemoryStorage, Storage};
use rust_decimal::Decimal;

fn catalog() -> Catalog {
    Catalog::from_products([
        Product::new("1", "Hoodie", Decimal::from(1500), 10),
        Product::new("2", "Jeans", Decimal::from(2000), 5),
    ])
}

fn profile() -> Profile {
    Profile::new("Diya", "Shah", "12 Main St")
}

fn shop() -> Shop<MemoryStorage> {
    Shop::open(MemoryStorage::with_catalog(catalog()), &ShopConfig::default())
}

fn logged_in_shop() -> Shop<MemoryStorage> {
    let mut shop = shop();
    shop.register("diya", "secret12", profile()).unwrap();
    shop.login("diya", "secret12").unwrap();
    shop
}

fn stock<S: Storage>(shop: &Shop<S>, id: u32) -> u32 {
    shop.catalog().find(&ProductId::from(id)).unwrap().stock
}

fn state<S: Storage>(shop: &Shop<S>) -> CheckoutState {
    shop.session().unwrap().state().clone()
}

#[cfg(test)]
mod account_tests {
    use super::*;

    #[test]
    fn test_register_and_login() {
        let mut shop = shop();

        assert!(shop.register("diya", "secret12", profile()).is_ok());
        let account = shop.login("diya", "secret12").unwrap();

        assert_eq!(account.username(), "diya");
        assert!(account.cart.is_empty());
        assert!(account.history().is_empty());
        assert_eq!(shop.session().unwrap().username(), "diya");
        assert_eq!(state(&shop), CheckoutState::Browsing);
    }

    #[test]
    fn test_register_username_taken() {
        let mut shop = shop();
        shop.register("diya", "secret12", profile()).unwrap();

        let result = shop.register("diya", "another1", profile());
        match result {
            Err(ShopError::UsernameTaken(username)) => assert_eq!(username, "diya"),
            _ => panic!("Expected UsernameTaken error"),
        }

        // Original password still works
        assert!(shop.login("diya", "secret12").is_ok());
    }

    #[test]
    fn test_register_validation() {
        let mut shop = shop();

        let cases = [
            ("", "secret12", profile()),
            ("diya shah", "secret12", profile()),
            ("../diya", "secret12", profile()),
            ("diya", "short", profile()),
            ("diya", " secret12", profile()),
            ("diya", "secret12", Profile::new("Diya", "", "12 Main St")),
        ];

        for (username, password, profile) in cases {
            let result = shop.register(username, password, profile);
            assert!(
                matches!(result, Err(ShopError::InvalidRegistration { .. })),
                "Expected InvalidRegistration for {:?}/{:?}",
                username,
                password
            );
        }
        assert_eq!(shop.accounts().count(), 0);
    }

    #[test]
    fn test_register_respects_configured_password_length() {
        let config = ShopConfig {
            min_password_len: 4,
            ..ShopConfig::default()
        };
        let mut shop = Shop::open(MemoryStorage::new(), &config);

        assert!(shop.register("diya", "abcd", profile()).is_ok());
    }

    #[test]
    fn test_login_invalid_credentials() {
        let mut shop = shop();
        shop.register("diya", "secret12", profile()).unwrap();

        assert!(matches!(
            shop.login("diya", "wrongpass"),
            Err(ShopError::InvalidCredentials)
        ));
        assert!(matches!(
            shop.login("nobody", "secret12"),
            Err(ShopError::InvalidCredentials)
        ));
        assert!(shop.session().is_none());
    }

    #[test]
    fn test_logout_persists_and_ends_session() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("1"), 2).unwrap();

        assert_eq!(shop.logout().unwrap(), "diya");

        assert!(shop.session().is_none());
        // The account itself survives with its cart
        assert_eq!(
            shop.account("diya").unwrap().cart.quantity_of(&ProductId::from("1")),
            2
        );
        let saved = shop.storage().load_cart("diya").unwrap();
        assert_eq!(saved, vec![(ProductId::from("1"), 2)]);
    }

    #[test]
    fn test_logout_without_session() {
        let mut shop = shop();
        assert!(matches!(shop.logout(), Err(ShopError::NotLoggedIn)));
    }

    #[test]
    fn test_login_switches_session() {
        let mut shop = logged_in_shop();
        shop.register("ravi", "password", profile()).unwrap();
        shop.add_to_cart(&ProductId::from("2"), 1).unwrap();

        shop.login("ravi", "password").unwrap();

        assert_eq!(shop.session().unwrap().username(), "ravi");
        let saved = shop.storage().load_cart("diya").unwrap();
        assert_eq!(saved, vec![(ProductId::from("2"), 1)]);
    }

    #[test]
    fn test_cart_actions_require_login() {
        let mut shop = shop();

        assert!(matches!(
            shop.add_to_cart(&ProductId::from("1"), 1),
            Err(ShopError::NotLoggedIn)
        ));
        assert!(matches!(shop.clear_cart(), Err(ShopError::NotLoggedIn)));
        assert!(matches!(shop.begin_checkout(), Err(ShopError::NotLoggedIn)));
        assert_eq!(stock(&shop, 1), 10);
    }
}

#[cfg(test)]
mod checkout_tests {
    use super::*;

    #[test]
    fn test_add_remove_checkout_scenario() {
        let mut shop = logged_in_shop();
        let hoodie = ProductId::from("1");

        // 1. Reserve four hoodies
        shop.add_to_cart(&hoodie, 4).unwrap();
        assert_eq!(stock(&shop, 1), 6);
        assert_eq!(shop.cart_total().unwrap(), Decimal::from(6000));
        assert_eq!(state(&shop), CheckoutState::CartNonEmpty);

        // 2. Put one back
        assert_eq!(shop.remove_from_cart(&hoodie, 1).unwrap(), 3);
        assert_eq!(stock(&shop, 1), 7);
        assert_eq!(shop.cart_total().unwrap(), Decimal::from(4500));

        // 3. Check out
        assert_eq!(shop.begin_checkout().unwrap(), Decimal::from(4500));
        assert_eq!(
            state(&shop),
            CheckoutState::Confirming {
                total: Decimal::from(4500)
            }
        );

        let order = shop.confirm_checkout(true).unwrap().unwrap();
        assert_eq!(order.total(), Decimal::from(4500));
        assert_eq!(state(&shop), CheckoutState::Completed);

        // Sold units are not returned to stock
        let account = shop.current_account().unwrap();
        assert_eq!(account.history().len(), 1);
        assert!(account.cart.is_empty());
        assert_eq!(stock(&shop, 1), 7);
    }

    #[test]
    fn test_add_more_than_stock_leaves_state() {
        let mut shop = logged_in_shop();

        let result = shop.add_to_cart(&ProductId::from("1"), 11);
        assert!(matches!(result, Err(ShopError::InsufficientStock { .. })));

        assert_eq!(stock(&shop, 1), 10);
        assert!(shop.current_account().unwrap().cart.is_empty());
        assert_eq!(state(&shop), CheckoutState::Browsing);
    }

    #[test]
    fn test_checkout_empty_cart_is_rejected() {
        let mut shop = logged_in_shop();

        assert!(matches!(shop.begin_checkout(), Err(ShopError::EmptyCart)));

        assert_eq!(state(&shop), CheckoutState::Browsing);
        assert!(shop.current_account().unwrap().history().is_empty());
    }

    #[test]
    fn test_checkout_zero_priced_cart_is_rejected() {
        let catalog = Catalog::from_products([Product::new("9", "Sticker", Decimal::ZERO, 3)]);
        let mut shop = Shop::open(MemoryStorage::with_catalog(catalog), &ShopConfig::default());
        shop.register("diya", "secret12", profile()).unwrap();
        shop.login("diya", "secret12").unwrap();
        shop.add_to_cart(&ProductId::from("9"), 1).unwrap();

        assert!(matches!(shop.begin_checkout(), Err(ShopError::EmptyCart)));
        assert_eq!(state(&shop), CheckoutState::CartNonEmpty);
    }

    #[test]
    fn test_confirm_without_pending_checkout() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("1"), 1).unwrap();

        assert!(matches!(
            shop.confirm_checkout(true),
            Err(ShopError::NoPendingCheckout)
        ));
        assert!(shop.current_account().unwrap().history().is_empty());
    }

    #[test]
    fn test_declining_checkout_keeps_cart_and_stock() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("2"), 2).unwrap();
        shop.begin_checkout().unwrap();

        assert!(shop.confirm_checkout(false).unwrap().is_none());

        assert_eq!(state(&shop), CheckoutState::CartNonEmpty);
        assert_eq!(stock(&shop, 2), 3);
        let account = shop.current_account().unwrap();
        assert_eq!(account.cart.quantity_of(&ProductId::from("2")), 2);
        assert!(account.history().is_empty());
    }

    #[test]
    fn test_cart_change_cancels_pending_checkout() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("1"), 1).unwrap();
        shop.begin_checkout().unwrap();

        shop.add_to_cart(&ProductId::from("2"), 1).unwrap();

        assert_eq!(state(&shop), CheckoutState::CartNonEmpty);
        assert!(matches!(
            shop.confirm_checkout(true),
            Err(ShopError::NoPendingCheckout)
        ));
    }

    #[test]
    fn test_clear_cart_restores_stock() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("1"), 3).unwrap();
        shop.add_to_cart(&ProductId::from("2"), 2).unwrap();

        assert_eq!(shop.clear_cart().unwrap(), 5);

        assert_eq!(stock(&shop, 1), 10);
        assert_eq!(stock(&shop, 2), 5);
        assert_eq!(state(&shop), CheckoutState::Browsing);
    }

    #[test]
    fn test_history_is_chronological() {
        let mut shop = logged_in_shop();

        for qty in [1, 2] {
            shop.add_to_cart(&ProductId::from("1"), qty).unwrap();
            shop.begin_checkout().unwrap();
            shop.confirm_checkout(true).unwrap();
        }

        let history = shop.current_account().unwrap().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].total(), Decimal::from(1500));
        assert_eq!(history[1].total(), Decimal::from(3000));
        assert!(history[0].placed_at() <= history[1].placed_at());
        assert_eq!(stock(&shop, 1), 7);
    }

    #[test]
    fn test_checkout_persists_catalog_history_and_cart() {
        let mut shop = logged_in_shop();
        shop.add_to_cart(&ProductId::from("2"), 5).unwrap();
        shop.begin_checkout().unwrap();
        shop.confirm_checkout(true).unwrap();

        let storage = shop.storage();
        assert_eq!(
            storage
                .stored_catalog()
                .find(&ProductId::from("2"))
                .unwrap()
                .stock,
            0
        );
        assert_eq!(storage.load_history("diya").unwrap().len(), 1);
        assert!(storage.load_cart("diya").unwrap().is_empty());
    }

    #[test]
    fn test_stock_conserved_across_accounts() {
        let mut shop = logged_in_shop();
        shop.register("ravi", "password", profile()).unwrap();

        shop.add_to_cart(&ProductId::from("1"), 4).unwrap();
        shop.add_to_cart(&ProductId::from("2"), 5).unwrap();
        shop.login("ravi", "password").unwrap();
        assert!(shop.add_to_cart(&ProductId::from("2"), 1).is_err());
        shop.add_to_cart(&ProductId::from("1"), 6).unwrap();
        shop.remove_from_cart(&ProductId::from("1"), 2).unwrap();

        for (id, initial) in [("1", 10), ("2", 5)] {
            let id = ProductId::from(id);
            let reserved: u32 = shop.accounts().map(|a| a.cart.quantity_of(&id)).sum();
            assert_eq!(shop.catalog().find(&id).unwrap().stock + reserved, initial);
        }
    }
}

#[cfg(test)]
mod apply_tests {
    use super::*;

    #[test]
    fn test_apply_routes_actions() {
        let mut shop = shop();

        let outcome = shop
            .apply(Action::register("diya", "secret12", profile()))
            .unwrap();
        assert_eq!(outcome, Outcome::Registered("diya".to_string()));

        let outcome = shop.apply(Action::login("diya", "secret12")).unwrap();
        assert_eq!(outcome, Outcome::LoggedIn("diya".to_string()));

        let outcome = shop.apply(Action::add("1", 2)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Added {
                product: ProductId::from("1"),
                in_cart: 2
            }
        );

        let outcome = shop.apply(Action::Checkout).unwrap();
        assert_eq!(
            outcome,
            Outcome::AwaitingConfirmation {
                total: Decimal::from(3000)
            }
        );

        match shop.apply(Action::Confirm(true)).unwrap() {
            Outcome::OrderPlaced(order) => assert_eq!(order.total(), Decimal::from(3000)),
            other => panic!("Expected OrderPlaced, got {:?}", other),
        }

        let outcome = shop.apply(Action::Logout).unwrap();
        assert_eq!(outcome, Outcome::LoggedOut("diya".to_string()));
    }

    #[test]
    fn test_apply_remove_not_in_cart() {
        let mut shop = logged_in_shop();

        let result = shop.apply(Action::remove("2", 1));
        match result {
            Err(ShopError::NotInCart(id)) => assert_eq!(id, ProductId::from("2")),
            _ => panic!("Expected NotInCart error"),
        }
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let mut shop = logged_in_shop();
        let before = shop.storage().saves();

        shop.apply(Action::add("1", 1)).unwrap();
        // Catalog and cart
        assert_eq!(shop.storage().saves(), before + 2);

        // Failed actions save nothing
        assert!(shop.apply(Action::add("1", 100)).is_err());
        assert_eq!(shop.storage().saves(), before + 2);
    }
}

#[cfg(test)]
mod respond_tests {
    use super::*;

    fn reply(shop: &mut Shop<MemoryStorage>, line: &str) -> String {
        let mut buf = Vec::new();
        shop.respond(line.parse::<Input>(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_respond_products_listing() {
        let mut shop = shop();
        let output = reply(&mut shop, "products");

        assert!(output.contains("id,name,price,stock,description"));
        assert!(output.contains("1,Hoodie,1500,10,"));
        assert!(output.contains("2,Jeans,2000,5,"));
    }

    #[test]
    fn test_respond_session_flow() {
        let mut shop = shop();

        let output = reply(&mut shop, "register diya secret12 Diya Shah 12 Main St");
        assert!(output.contains("Registered diya"));
        assert!(reply(&mut shop, "login diya secret12").contains("Welcome, diya!"));
        assert!(reply(&mut shop, "add 1 4").contains("Added product 1 (4 in cart)"));

        let output = reply(&mut shop, "cart");
        assert!(output.contains("1,Hoodie,4,6000"));
        assert!(output.contains("total,6000"));

        assert!(reply(&mut shop, "checkout").contains("Your total is 6000"));
        assert!(reply(&mut shop, "yes").contains("Order placed. Total: 6000"));

        let output = reply(&mut shop, "history");
        assert!(output.contains("Hoodie (x4): 6000"));
        assert!(output.contains("Total: 6000"));

        assert!(reply(&mut shop, "whoami").contains("diya (Diya Shah, 12 Main St)"));
    }

    #[test]
    fn test_respond_out_of_stock_names_product() {
        let mut shop = logged_in_shop();

        let output = reply(&mut shop, "add 2 9");
        assert_eq!(output, "Error: Sorry, only 5 of Jeans are available.\n");
    }

    #[test]
    fn test_respond_reports_bad_input() {
        let mut shop = shop();

        assert!(reply(&mut shop, "dance").starts_with("Error: Unknown command: dance"));
        assert!(reply(&mut shop, "cart").contains("No user is logged in"));
        assert!(reply(&mut shop, "help").contains("Commands:"));
    }

    #[test]
    fn test_respond_empty_views() {
        let mut shop = logged_in_shop();

        assert_eq!(reply(&mut shop, "cart"), "Your cart is empty.\n");
        assert_eq!(reply(&mut shop, "history"), "No purchase history.\n");
        assert!(reply(&mut shop, "checkout").contains("Cart is empty"));
    }
}

#[cfg(test)]
mod failed_save_tests {
    use super::*;
    use crate::account::Account;
    use crate::cart::Cart;
    use crate::error::StorageError;
    use crate::order::Order;
    use std::collections::BTreeMap;
    use std::io;

    /// Loads from an inner `MemoryStorage`; every save fails.
    struct ReadOnlyStorage(MemoryStorage);

    fn disk_full() -> StorageError {
        StorageError::Unavailable(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    impl Storage for ReadOnlyStorage {
        fn load_catalog(&self) -> Result<Catalog, StorageError> {
            self.0.load_catalog()
        }

        fn save_catalog(&mut self, _: &Catalog) -> Result<(), StorageError> {
            Err(disk_full())
        }

        fn load_accounts(&self) -> Result<BTreeMap<String, Account>, StorageError> {
            self.0.load_accounts()
        }

        fn save_accounts(&mut self, _: &BTreeMap<String, Account>) -> Result<(), StorageError> {
            Err(disk_full())
        }

        fn load_cart(&self, username: &str) -> Result<Vec<(ProductId, u32)>, StorageError> {
            self.0.load_cart(username)
        }

        fn save_cart(&mut self, _: &str, _: &Cart) -> Result<(), StorageError> {
            Err(disk_full())
        }

        fn load_history(&self, username: &str) -> Result<Vec<Order>, StorageError> {
            self.0.load_history(username)
        }

        fn save_history(&mut self, _: &str, _: &[Order]) -> Result<(), StorageError> {
            Err(disk_full())
        }
    }

    fn read_only_shop() -> Shop<ReadOnlyStorage> {
        let storage = ReadOnlyStorage(MemoryStorage::with_catalog(catalog()));
        let mut shop = Shop::open(storage, &ShopConfig::default());
        shop.register("diya", "secret12", profile()).unwrap();
        shop.login("diya", "secret12").unwrap();
        shop
    }

    #[test]
    fn test_failed_save_still_reports_reservation() {
        let mut shop = read_only_shop();
        let hoodie = ProductId::from("1");

        assert_eq!(shop.add_to_cart(&hoodie, 4).unwrap(), 4);
        assert_eq!(stock(&shop, 1), 6);

        // A second add reserves on top of the first, as the caller was told
        assert_eq!(shop.add_to_cart(&hoodie, 4).unwrap(), 8);
        assert_eq!(stock(&shop, 1), 2);

        assert!(shop.storage().0.load_cart("diya").unwrap().is_empty());
        assert_eq!(shop.storage().0.saves(), 0);
    }

    #[test]
    fn test_failed_saves_do_not_interrupt_checkout() {
        let mut shop = read_only_shop();
        let hoodie = ProductId::from("1");

        shop.add_to_cart(&hoodie, 4).unwrap();
        assert_eq!(shop.remove_from_cart(&hoodie, 1).unwrap(), 3);
        assert_eq!(shop.begin_checkout().unwrap(), Decimal::from(4500));

        let order = shop.confirm_checkout(true).unwrap().unwrap();
        assert_eq!(order.total(), Decimal::from(4500));
        assert_eq!(stock(&shop, 1), 7);

        shop.add_to_cart(&ProductId::from("2"), 2).unwrap();
        assert_eq!(shop.clear_cart().unwrap(), 2);
        assert_eq!(stock(&shop, 2), 5);

        assert_eq!(shop.logout().unwrap(), "diya");
        assert_eq!(shop.account("diya").unwrap().history().len(), 1);
    }

    #[test]
    fn test_failed_save_reply_is_not_an_error() {
        let mut shop = read_only_shop();
        let mut buf = Vec::new();

        shop.respond("add 1 2".parse::<Input>(), &mut buf).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "Added product 1 (2 in cart)\n");
    }
}
