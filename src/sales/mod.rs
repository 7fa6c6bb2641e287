//! Sales data source
//!
//! A small product table (built-in demo data or a CSV file) queried with
//! simple aggregations, plus the text report built from it.

pub mod report;
pub mod table;

pub use report::{render_report, render_report_on};
pub use table::{Product, SalesTable, DEFAULT_LOW_STOCK_THRESHOLD};
