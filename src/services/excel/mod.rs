pub mod analyzer;
pub mod cleaner;
pub mod header;
pub mod inference;
pub mod loader;
pub mod normalize;
pub mod render;
pub mod search;
pub mod types;
pub mod utils;
pub mod writer;

pub use analyzer::ExcelAnalyzer;
pub use loader::WorkbookLoader;
