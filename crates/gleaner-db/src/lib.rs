pub mod config;
pub mod config_repository;
pub mod database;
pub mod posting_repository;

pub use config::DatabaseConfig;
pub use config_repository::ConfigRepository;
pub use database::Database;
pub use posting_repository::JobPostingRepository;
