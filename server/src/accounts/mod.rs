//! User accounts: signup, login and the rows behind them.

pub mod routes;
pub mod store;
pub mod validation;
