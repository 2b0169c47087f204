//! Core business logic abstractions

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod log;
pub mod provider;
pub mod resolver;

// Re-export main types for cleaner imports
pub use cache::RateCache;
pub use catalog::{CurrencyCatalog, CurrencyEntry};
pub use error::RateError;
pub use provider::RateProvider;
pub use resolver::{RateDifference, RateResolver, ResolvedPair};
