//! Market-data collaborators: providers, rate-limit protection, canonicalization.

pub mod canonicalize;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod yahoo;

pub use canonicalize::{canonicalize, CanonicalizeReport};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::{Headline, YahooProvider};
