//! restcountries.com client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CountriesConfig;
use crate::domain::country::{CountryName, Currency, Flags};
use crate::domain::{Country, CountryDirectory, CountryLookupError};

pub struct RestCountriesClient {
    client: Client,
    base_url: Url,
}

impl RestCountriesClient {
    pub fn new(config: &CountriesConfig) -> Result<Self, CountryLookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CountryLookupError::Upstream(format!("HTTP client setup failed: {}", e)))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CountryLookupError::Upstream(format!("Invalid base URL: {}", e)))?;
        Ok(Self { client, base_url })
    }

    /// `{base}/name/{name}` with `name` percent-encoded as one path segment.
    fn name_url(&self, name: &str) -> Result<Url, CountryLookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CountryLookupError::Upstream("Base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push("name")
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl CountryDirectory for RestCountriesClient {
    async fn find_by_name(&self, name: &str) -> Result<Vec<Country>, CountryLookupError> {
        let url = self.name_url(name)?;
        debug!(%url, "Fetching country data");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CountryLookupError::Upstream(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(CountryLookupError::NotFound(name.to_string())),
            status if !status.is_success() => {
                warn!(%status, name, "Country upstream returned an error");
                return Err(CountryLookupError::Upstream(format!("upstream status {}", status)));
            }
            _ => {}
        }

        let raw: Vec<RawCountry> = response
            .json()
            .await
            .map_err(|e| CountryLookupError::Upstream(format!("invalid upstream body: {}", e)))?;

        Ok(raw.into_iter().map(Country::from).collect())
    }
}

// Upstream payload. Every field is optional there, so default everything.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCountry {
    name: RawName,
    currencies: BTreeMap<String, RawCurrency>,
    capital: Vec<String>,
    languages: BTreeMap<String, String>,
    flags: RawFlags,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawName {
    common: String,
    official: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCurrency {
    name: String,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFlags {
    png: String,
    svg: String,
    alt: Option<String>,
}

impl From<RawCountry> for Country {
    fn from(raw: RawCountry) -> Self {
        Country {
            name: CountryName {
                common: raw.name.common,
                official: raw.name.official,
            },
            currencies: raw
                .currencies
                .into_iter()
                .map(|(code, c)| {
                    (
                        code,
                        Currency {
                            name: c.name,
                            symbol: c.symbol,
                        },
                    )
                })
                .collect(),
            capital: raw.capital,
            languages: raw.languages,
            flags: Flags {
                png: raw.flags.png,
                svg: raw.flags.svg,
                alt: raw.flags.alt,
            },
        }
    }
}
