use clap::Parser;
use eumas::Connection;
use serde_json::json;

use crate::error::CliResult;
use crate::output::{OutputFormat, print_json};

#[derive(Parser)]
pub struct HealthCommand {}

impl HealthCommand {
    /// Probe the store. Exits with an error when it is not ready.
    pub async fn execute(&self, connection: &Connection, format: OutputFormat) -> CliResult<()> {
        let healthy = connection.is_healthy().await;

        match format {
            OutputFormat::Json => print_json(&json!({ "healthy": healthy }))?,
            OutputFormat::Table => {
                if healthy {
                    println!("Weaviate is ready.");
                }
            }
        }

        if healthy {
            Ok(())
        } else {
            Err("Weaviate is not ready".into())
        }
    }
}
