//! Database layer: connection management, migrations, and repositories

mod connection;
mod migrations;
mod repository;
mod settings_repository;
mod watermark_repository;

pub use connection::Database;
pub use repository::{ProductRepository, SqliteProductRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
pub use watermark_repository::{SqliteWatermarkRepository, WatermarkRepository};
