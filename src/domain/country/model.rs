use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The subset of country data the API forwards to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: CountryName,
    /// Keyed by ISO 4217 code.
    pub currencies: BTreeMap<String, Currency>,
    pub capital: Vec<String>,
    /// Keyed by ISO 639-3 code.
    pub languages: BTreeMap<String, String>,
    pub flags: Flags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryName {
    pub common: String,
    pub official: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub name: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    pub png: String,
    pub svg: String,
    pub alt: Option<String>,
}
