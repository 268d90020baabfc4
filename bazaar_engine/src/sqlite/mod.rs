//! SQLite backend for the Bazaar engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
