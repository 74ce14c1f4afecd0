pub mod calculations;
pub mod db;
pub mod models;
pub mod proposal;
pub mod session;

pub use db::repository::{EstimateRepository, RepositoryError};
pub use models::*;
