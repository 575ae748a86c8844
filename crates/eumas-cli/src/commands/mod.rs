pub mod config;
pub mod embed;
pub mod health;
pub mod memory;
pub mod schema;

pub use config::ConfigCommand;
pub use embed::EmbedCommand;
pub use health::HealthCommand;
pub use memory::MemoryCommand;
pub use schema::SchemaCommand;
