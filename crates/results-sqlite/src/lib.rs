mod error;
mod insert;
mod models;
mod open;
mod query;
mod schema;
mod store;

pub use open::Db;
