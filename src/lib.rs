pub mod config;
pub mod models;
pub mod error;
pub mod db;
pub mod settings;
pub mod store;
pub mod search;
pub mod capture;
pub mod library;

pub use library::PageLibrary;
