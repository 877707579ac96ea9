pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod history;
pub mod output;
pub mod page;
pub mod query;
pub mod summary;
pub mod table;
pub mod view;

pub use error::DashError;
