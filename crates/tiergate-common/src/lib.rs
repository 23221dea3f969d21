pub mod db;
pub mod entities;
pub mod error;
pub mod ids;
pub mod network;

pub use entities::*;
pub use error::TiergateError;
