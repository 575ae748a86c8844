pub mod commands;
pub mod error;
pub mod output;

pub use commands::{ConfigCommand, EmbedCommand, HealthCommand, MemoryCommand, SchemaCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, print_json, results_table, truncate_string, value_cell};
