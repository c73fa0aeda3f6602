//! Command-line argument parsing.

use anyhow::{anyhow, bail, Result};

pub const USAGE: &str = "\
Usage: eventflix <command> [args]

Commands:
  login [email] [--remember]   Log in (prompts for the password)
  logout                       End the session on this device
  register                     Create an account
  status                       Show session and language
  locale [code] [--reload]     Show or change the display language (es, ca, en)
  events                       List upcoming events
  event <id>                   Show one event
  create-event                 Publish an event (organizers)
  buy <event-id> <quantity>    Buy tickets
  tickets                      List your tickets
  profile [--json]             Show your profile
  delete-account               Delete your account
  help                         Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String>, remember: bool },
    Logout,
    Register,
    Status,
    Locale { code: Option<String>, reload: bool },
    Events,
    Event { id: i64 },
    CreateEvent,
    Buy { event_id: i64, quantity: u32 },
    Tickets,
    Profile { json: bool },
    DeleteAccount,
    Help,
}

impl Command {
    /// Parse the arguments after the program name
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        let (flags, positional): (Vec<&str>, Vec<&str>) = rest
            .iter()
            .map(String::as_str)
            .partition(|arg| arg.starts_with("--"));

        let command = match name.as_str() {
            "login" => Command::Login {
                email: positional.first().map(|s| s.to_string()),
                remember: flags.contains(&"--remember"),
            },
            "logout" => Command::Logout,
            "register" => Command::Register,
            "status" => Command::Status,
            "locale" => Command::Locale {
                code: positional.first().map(|s| s.to_string()),
                reload: flags.contains(&"--reload"),
            },
            "events" => Command::Events,
            "event" => Command::Event {
                id: parse_id(positional.first(), "event id")?,
            },
            "create-event" => Command::CreateEvent,
            "buy" => {
                let event_id = parse_id(positional.first(), "event id")?;
                let quantity = match positional.get(1) {
                    Some(q) => q
                        .parse::<u32>()
                        .map_err(|_| anyhow!("Quantity must be a positive number, got '{}'", q))?,
                    None => 1,
                };
                if quantity == 0 {
                    bail!("Quantity must be at least 1");
                }
                Command::Buy { event_id, quantity }
            }
            "tickets" => Command::Tickets,
            "profile" => Command::Profile {
                json: flags.contains(&"--json"),
            },
            "delete-account" => Command::DeleteAccount,
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command '{}'", other),
        };

        let known_flags: &[&str] = match command {
            Command::Login { .. } => &["--remember"],
            Command::Locale { .. } => &["--reload"],
            Command::Profile { .. } => &["--json"],
            _ => &[],
        };
        if let Some(flag) = flags.iter().find(|f| !known_flags.contains(f)) {
            bail!("Unknown option '{}' for '{}'", flag, name);
        }

        Ok(command)
    }
}

fn parse_id(value: Option<&&str>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow!("Missing {}", what))?;
    value
        .parse::<i64>()
        .map_err(|_| anyhow!("Invalid {} '{}'", what, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        Command::parse(&args)
    }

    #[test]
    fn test_no_args_is_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_login_flags() {
        assert_eq!(
            parse(&["login", "ana@example.com", "--remember"]).unwrap(),
            Command::Login {
                email: Some("ana@example.com".to_string()),
                remember: true
            }
        );
        assert_eq!(
            parse(&["login"]).unwrap(),
            Command::Login {
                email: None,
                remember: false
            }
        );
    }

    #[test]
    fn test_locale() {
        assert_eq!(
            parse(&["locale", "--reload", "ca"]).unwrap(),
            Command::Locale {
                code: Some("ca".to_string()),
                reload: true
            }
        );
    }

    #[test]
    fn test_buy() {
        assert_eq!(
            parse(&["buy", "12", "3"]).unwrap(),
            Command::Buy {
                event_id: 12,
                quantity: 3
            }
        );
        assert_eq!(
            parse(&["buy", "12"]).unwrap(),
            Command::Buy {
                event_id: 12,
                quantity: 1
            }
        );
        assert!(parse(&["buy", "12", "0"]).is_err());
        assert!(parse(&["buy", "x"]).is_err());
        assert!(parse(&["buy"]).is_err());
    }

    #[test]
    fn test_account_and_organizer_commands() {
        assert_eq!(parse(&["register"]).unwrap(), Command::Register);
        assert_eq!(parse(&["create-event"]).unwrap(), Command::CreateEvent);
        assert!(parse(&["create-event", "--json"]).is_err());
    }

    #[test]
    fn test_rejects_unknown() {
        assert!(parse(&["dance"]).is_err());
        assert!(parse(&["logout", "--remember"]).is_err());
    }
}
