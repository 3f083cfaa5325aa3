mod error;
pub use error::*;

pub mod accounts;
pub mod api;
pub mod crypto;
pub mod database;
pub mod models;
pub mod pages;
pub mod posts;
pub mod search;
pub mod settings;
pub(crate) mod time_utils;
pub mod ui;

#[cfg(test)]
mod test_util;
