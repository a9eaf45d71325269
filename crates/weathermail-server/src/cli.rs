use clap::{Parser, Subcommand};
use weathermail_types::{City, UnknownCity};

#[derive(Debug, Parser)]
#[command(name = "weathermail", version, about = "Daily weather reports by email")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server and the daily report scheduler (default).
    Serve,

    /// Run the report pipeline once and exit.
    SendNow {
        /// Only report on this city, e.g. "London" or "new york" (any case).
        #[arg(long)]
        city: Option<String>,
    },

    /// Print subscription statistics and configuration status.
    Check,
}

/// Matches a `--city` argument against the allowed list, ignoring case.
pub fn parse_city_arg(raw: &str) -> Result<City, UnknownCity> {
    let wanted = raw.trim();
    City::all()
        .iter()
        .copied()
        .find(|city| city.as_str().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| UnknownCity(wanted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["weathermail"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn send_now_takes_optional_city() {
        let cli = Cli::try_parse_from(["weathermail", "send-now", "--city", "New York"]).unwrap();
        match cli.command {
            Some(Command::SendNow { city }) => assert_eq!(city.as_deref(), Some("New York")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn city_argument_ignores_case() {
        assert_eq!(parse_city_arg("london").unwrap(), City::London);
        assert_eq!(parse_city_arg("NEW YORK").unwrap(), City::NewYork);
        assert_eq!(parse_city_arg(" Karachi ").unwrap(), City::Karachi);
        assert!(parse_city_arg("paris").is_err());
    }
}
