use crate::account::Profile;
use crate::engine::action::Action;
use crate::error::InputError;
use crate::product::ProductId;

use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  register <username> <password> <first_name> <last_name> <address...>
  login <username> <password>
  logout
  products                 list products and stock
  cart                     show your cart
  history                  show past orders
  whoami                   show the logged-in account
  add <product_id> [qty]   reserve items (qty defaults to 1)
  remove <product_id> [qty]
  clear                    empty the cart and return items to stock
  checkout                 start checkout, then answer yes or no
  help
  quit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Products,
    Cart,
    History,
    Whoami,
}

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Action(Action),
    Show(View),
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();

        let input = match command.as_str() {
            "register" => {
                let username = required(&mut words, "register", "username")?;
                let password = required(&mut words, "register", "password")?;
                let first_name = required(&mut words, "register", "first_name")?;
                let last_name = required(&mut words, "register", "last_name")?;
                let address = words.collect::<Vec<_>>().join(" ");
                if address.is_empty() {
                    return Err(InputError::MissingArgument {
                        command: "register",
                        argument: "address",
                    });
                }
                Input::Action(Action::register(
                    username,
                    password,
                    Profile::new(first_name, last_name, address),
                ))
            }
            "login" => {
                let username = required(&mut words, "login", "username")?;
                let password = required(&mut words, "login", "password")?;
                Input::Action(Action::login(username, password))
            }
            "logout" => Input::Action(Action::Logout),
            "add" => {
                let product = required(&mut words, "add", "product_id")?;
                Input::Action(Action::AddToCart {
                    product: ProductId::from(product),
                    quantity: quantity(words.next())?,
                })
            }
            "remove" => {
                let product = required(&mut words, "remove", "product_id")?;
                Input::Action(Action::RemoveFromCart {
                    product: ProductId::from(product),
                    quantity: quantity(words.next())?,
                })
            }
            "clear" => Input::Action(Action::ClearCart),
            "checkout" => Input::Action(Action::Checkout),
            "yes" | "y" => Input::Action(Action::Confirm(true)),
            "no" | "n" => Input::Action(Action::Confirm(false)),
            "products" => Input::Show(View::Products),
            "cart" => Input::Show(View::Cart),
            "history" => Input::Show(View::History),
            "whoami" => Input::Show(View::Whoami),
            "help" => Input::Help,
            "quit" | "exit" => Input::Quit,
            _ => return Err(InputError::UnknownCommand(command)),
        };

        Ok(input)
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, InputError> {
    words
        .next()
        .ok_or(InputError::MissingArgument { command, argument })
}

fn quantity(word: Option<&str>) -> Result<i64, InputError> {
    match word {
        None => Ok(1),
        Some(word) => word
            .parse()
            .map_err(|_| InputError::InvalidNumber(word.to_string())),
    }
}
