//! Integration tests for the dApp bridge.

mod utils;

mod connect;
mod methods;
mod transactions;
