use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The cities a user can subscribe to. Anything outside this list is
/// rejected before it reaches the database or the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum City {
    London,
    #[serde(rename = "New York")]
    NewYork,
    Tokyo,
    Lahore,
    Karachi,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("City \"{0}\" is not in the allowed list")]
pub struct UnknownCity(pub String);

impl City {
    pub const fn all() -> &'static [City] {
        &[
            City::London,
            City::NewYork,
            City::Tokyo,
            City::Lahore,
            City::Karachi,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            City::London => "London",
            City::NewYork => "New York",
            City::Tokyo => "Tokyo",
            City::Lahore => "Lahore",
            City::Karachi => "Karachi",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Matching is exact: "london" is not "London".
impl TryFrom<&str> for City {
    type Error = UnknownCity;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        City::all()
            .iter()
            .copied()
            .find(|city| city.as_str() == value)
            .ok_or_else(|| UnknownCity(value.to_string()))
    }
}

impl std::str::FromStr for City {
    type Err = UnknownCity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        City::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_parse_back() {
        for city in City::all() {
            assert_eq!(City::try_from(city.as_str()), Ok(*city));
        }
    }

    #[test]
    fn unknown_and_miscased_cities_are_rejected() {
        let err = City::try_from("Atlantis").unwrap_err();
        assert_eq!(err.to_string(), "City \"Atlantis\" is not in the allowed list");
        assert!(City::try_from("london").is_err());
        assert!(City::try_from("").is_err());
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&City::NewYork).unwrap();
        assert_eq!(json, "\"New York\"");
        let city: City = serde_json::from_str("\"Karachi\"").unwrap();
        assert_eq!(city, City::Karachi);
    }
}
