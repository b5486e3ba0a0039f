mod database;
mod transactions;

pub use database::DbMap;
pub use transactions::Transaction;
