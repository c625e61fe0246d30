pub mod account_gate;
pub mod error_handling;

pub use account_gate::RepositoryAccounts;
