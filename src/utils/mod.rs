pub mod error_logger;

pub use error_logger::ErrorLog;
