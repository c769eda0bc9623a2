//! MathTutor Storage Layer
//!
//! SQLite-backed stand-in for the browser's cookie jar and local storage.
//! Every tab opened on the same database sees the same credentials.

mod cookies;
mod database;
mod error;
mod local_storage;
mod migrations;

pub use cookies::{delete_cookies, Cookie, CookieJar};
pub use database::Database;
pub use error::StorageError;
pub use local_storage::{delete_item, write_item, LocalStorage};

pub type Result<T> = std::result::Result<T, StorageError>;
