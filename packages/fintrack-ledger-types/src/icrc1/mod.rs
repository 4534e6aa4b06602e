pub mod account;
pub mod metadata;
pub mod transfer;
