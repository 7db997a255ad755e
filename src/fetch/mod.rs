//! Remote retrieval of the published spreadsheets.

pub mod urls;
pub mod xls;

pub use urls::{file_name, partition_url};
pub use xls::fetch_xls;
