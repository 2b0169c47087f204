pub mod cbr_provider;
pub mod document;
pub mod util;

pub use cbr_provider::CbrProvider;
