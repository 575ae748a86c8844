use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use eumas::Config;
use serde_json::{Value, json};

use crate::error::CliResult;
use crate::output::{OutputFormat, print_json, value_cell};

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    #[clap(about = "Show the effective configuration (secrets masked)")]
    Show,

    #[clap(about = "Check that required settings are present")]
    Validate,
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else if secret.chars().count() <= 8 {
        "********".to_string()
    } else {
        let tail: String = secret.chars().skip(secret.chars().count() - 4).collect();
        format!("****{tail}")
    }
}

fn summary(config: &Config) -> Value {
    json!({
        "embedding": {
            "api_key": mask(&config.embedding.api_key),
            "model": config.embedding.model,
            "api_url": config.embedding.api_url,
            "timeout_secs": config.embedding.timeout_secs,
        },
        "store": {
            "url": config.store.url,
            "headers": config.store.headers.keys().collect::<Vec<_>>(),
            "timeout_secs": config.store.timeout_secs,
        },
        "batch": {
            "batch_size": config.batch.batch_size,
            "timeout_retries": config.batch.timeout_retries,
        },
        "logging": {
            "level": config.logging.level,
            "format": config.logging.format,
            "environment": config.logging.environment,
        },
    })
}

impl ConfigCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(config, format),
            ConfigSubcommand::Validate => Self::validate(config, format),
        }
    }

    fn show(config: &Config, format: OutputFormat) -> CliResult<()> {
        let summary = summary(config);
        match format {
            OutputFormat::Json => print_json(&summary)?,
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_header(["Setting", "Value"]);
                if let Value::Object(sections) = &summary {
                    for (section, values) in sections {
                        if let Value::Object(values) = values {
                            for (key, value) in values {
                                table.add_row([format!("{section}.{key}"), value_cell(value)]);
                            }
                        }
                    }
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    fn validate(config: &Config, format: OutputFormat) -> CliResult<()> {
        let problem = config.validate();

        match format {
            OutputFormat::Json => print_json(&json!({ "valid": problem.is_none(), "error": problem }))?,
            OutputFormat::Table if problem.is_none() => println!("Configuration is valid."),
            OutputFormat::Table => {}
        }

        match problem {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "");
        assert_eq!(mask("short"), "********");
        assert_eq!(mask("sk-abcdefghijkl"), "****ijkl");
    }

    #[test]
    fn test_summary_masks_api_key() {
        let mut config = Config::default();
        config.embedding.api_key = "sk-secret-value-1234".to_string();
        let summary = summary(&config);
        assert_eq!(summary["embedding"]["api_key"], "****1234");
        assert_eq!(summary["batch"]["batch_size"], 100);
    }
}
