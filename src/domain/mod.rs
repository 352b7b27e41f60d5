//! Domain module
//!
//! Core domain types and business rules.

pub mod msats;
pub mod transaction;

pub use msats::{Msats, MsatsError, MSATS_PER_BTC};
pub use transaction::{
    NewTransaction, Transaction, TransactionPatch, TransactionStatus, TransactionType,
};
