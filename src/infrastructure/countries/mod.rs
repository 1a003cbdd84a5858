//! Upstream country data sources

mod rest_countries;

pub use rest_countries::RestCountriesClient;
