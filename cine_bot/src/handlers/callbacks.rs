use std::{fmt::Display, str::FromStr};

use crate::types::Plan;

/// What an inline keyboard button asks for, as carried in its callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// Picked a plan to pay for.
    Plan(Plan),
    Search,
    Profile,
    Renew,
    Help,
    Home,
    /// Page of the last search results, 0-based.
    Page(usize),
    /// Send this movie.
    Movie(i64),
}

impl FromStr for CallbackData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or("empty callback data")?;
        let argument = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments in {s:?}"));
        }

        let bad_argument = || format!("bad argument in {s:?}");

        Ok(match (command, argument) {
            ("plan", Some(plan)) => CallbackData::Plan(plan.parse().map_err(|_| bad_argument())?),
            ("page", Some(page)) => CallbackData::Page(page.parse().map_err(|_| bad_argument())?),
            ("movie", Some(id)) => CallbackData::Movie(id.parse().map_err(|_| bad_argument())?),
            ("search", None) => CallbackData::Search,
            ("profile", None) => CallbackData::Profile,
            ("renew", None) => CallbackData::Renew,
            ("help", None) => CallbackData::Help,
            ("home", None) => CallbackData::Home,
            _ => return Err(format!("unknown callback data {s:?}")),
        })
    }
}

impl Display for CallbackData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackData::Plan(plan) => write!(f, "plan {}", plan.as_str()),
            CallbackData::Search => f.write_str("search"),
            CallbackData::Profile => f.write_str("profile"),
            CallbackData::Renew => f.write_str("renew"),
            CallbackData::Help => f.write_str("help"),
            CallbackData::Home => f.write_str("home"),
            CallbackData::Page(page) => write!(f, "page {page}"),
            CallbackData::Movie(id) => write!(f, "movie {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_what_it_writes() {
        for data in [
            CallbackData::Plan(Plan::Classic),
            CallbackData::Plan(Plan::Premium),
            CallbackData::Search,
            CallbackData::Profile,
            CallbackData::Renew,
            CallbackData::Help,
            CallbackData::Home,
            CallbackData::Page(3),
            CallbackData::Movie(1234),
        ] {
            let text = data.to_string();
            // Telegram refuses callback data longer than this.
            assert!(text.len() <= 64);
            assert_eq!(text.parse::<CallbackData>().unwrap(), data);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<CallbackData>().is_err());
        assert!("plan gold".parse::<CallbackData>().is_err());
        assert!("page -1".parse::<CallbackData>().is_err());
        assert!("movie".parse::<CallbackData>().is_err());
        assert!("home now".parse::<CallbackData>().is_err());
        assert!("movie 1 2".parse::<CallbackData>().is_err());
        assert!("URL_SPAM".parse::<CallbackData>().is_err());
    }
}
