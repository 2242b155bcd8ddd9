pub mod profile_provider;
pub mod util;
pub mod yahoo_finance;

pub use profile_provider::ProfileProvider;
pub use yahoo_finance::YahooFinanceProvider;
