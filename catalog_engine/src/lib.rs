pub mod backend;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod geo;
pub mod query;

mod types;

pub use error::{AppError, DecodeError, GeoError, Result, TransportError};
pub use types::*;
