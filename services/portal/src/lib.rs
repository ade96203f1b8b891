pub mod adapters;
pub mod config;
pub mod error;
pub mod portal;
pub mod presenter;

pub use portal::{Page, PageLoad, Portal};
