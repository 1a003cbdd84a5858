//! Country DTOs

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Country;

#[derive(Debug, Serialize, ToSchema)]
pub struct CountryNameDto {
    pub common: String,
    pub official: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrencyDto {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FlagsDto {
    pub png: String,
    pub svg: String,
    /// Empty when upstream has no description
    pub alt: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "name": {"common": "Peru", "official": "Republic of Peru"},
    "currencies": {"PEN": {"name": "Peruvian sol", "symbol": "S/ "}},
    "capital": ["Lima"],
    "languages": {"que": "Quechua", "spa": "Spanish"},
    "flags": {"png": "https://flagcdn.com/w320/pe.png", "svg": "https://flagcdn.com/pe.svg", "alt": ""}
}))]
pub struct CountryDto {
    pub name: CountryNameDto,
    pub currencies: BTreeMap<String, CurrencyDto>,
    pub capital: Vec<String>,
    pub languages: BTreeMap<String, String>,
    pub flags: FlagsDto,
}

impl From<Country> for CountryDto {
    fn from(country: Country) -> Self {
        Self {
            name: CountryNameDto {
                common: country.name.common,
                official: country.name.official,
            },
            currencies: country
                .currencies
                .into_iter()
                .map(|(code, c)| {
                    (
                        code,
                        CurrencyDto {
                            name: c.name,
                            symbol: c.symbol,
                        },
                    )
                })
                .collect(),
            capital: country.capital,
            languages: country.languages,
            flags: FlagsDto {
                png: country.flags.png,
                svg: country.flags.svg,
                alt: country.flags.alt.unwrap_or_default(),
            },
        }
    }
}

/// Lookup result: `{"success": true, "count": N, "data": [...]}`.
///
/// Unlike the other endpoints, `count` sits next to `data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountryListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<CountryDto>,
}

impl From<Vec<Country>> for CountryListResponse {
    fn from(countries: Vec<Country>) -> Self {
        Self {
            success: true,
            count: countries.len(),
            data: countries.into_iter().map(CountryDto::from).collect(),
        }
    }
}
