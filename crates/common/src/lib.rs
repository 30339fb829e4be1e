pub mod constants;
pub mod env;
pub mod error;
pub mod sourcify;
