//! Owner-scoped license document store boundary.
//!
//! The store holds one document per owner whose only field of interest is the
//! list of licenses. Every committed write bumps the document version by one.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use r#trait::{AccountStore, AccountStoreError};
