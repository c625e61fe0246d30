pub mod account;
pub mod message;

pub use account::{Account, UserProfile};
pub use message::*;
