pub mod loader;
pub mod types;

pub use loader::{sort_and_dedup, BarProvider, InMemoryBars, LoaderError, ParquetBarLoader, BAR_COLUMNS};
pub use types::{DateWindow, OptionType, PriceBar};
