//! Core business logic abstractions

pub mod allocation;
pub mod budget;
pub mod config;
pub mod error;
pub mod fund;
pub mod holding;
pub mod log;
pub mod metadata;
pub mod money;
pub mod price;
pub mod savings;

// Re-export main types for cleaner imports
pub use error::{FinanceError, Result};
pub use fund::{CapStyle, Fund, Market};
pub use metadata::{FundMetadata, MetadataProvider};
pub use price::{PriceProvider, PriceResult};
