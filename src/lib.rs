pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod records;
pub mod ui;
pub mod utils;

pub use error::{AppError, Result};
