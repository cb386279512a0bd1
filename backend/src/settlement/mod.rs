//! Settlement domain module
//!
//! Admin payout bookkeeping for delivered orders.

mod service;

pub use service::{Payee, SettlementService};
