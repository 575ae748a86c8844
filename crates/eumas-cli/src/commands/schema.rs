use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use eumas::memory::schema::{ClassSchema, schema};
use eumas::{Config, Connection};
use serde_json::{Value, json};

use crate::error::CliResult;
use crate::output::{OutputFormat, print_json, truncate_string};

#[derive(Parser)]
pub struct SchemaCommand {
    #[clap(subcommand)]
    pub command: SchemaSubcommand,
}

#[derive(Subcommand)]
pub enum SchemaSubcommand {
    #[clap(about = "Create any missing classes")]
    Create,

    #[clap(about = "Delete both classes and all their objects")]
    Delete(ConfirmArgs),

    #[clap(about = "Delete and recreate both classes")]
    Reset(ConfirmArgs),

    #[clap(about = "Check live classes against the declarations")]
    Validate,

    #[clap(about = "Show which classes exist")]
    Status,

    #[clap(about = "Print the class declarations")]
    Show(ShowArgs),
}

#[derive(Parser)]
pub struct ConfirmArgs {
    #[clap(long, help = "Confirm deleting stored data")]
    pub yes: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(help = "Only show this class")]
    pub class: Option<String>,
}

impl SchemaCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        if let SchemaSubcommand::Show(args) = &self.command {
            return Self::show(args, format);
        }

        let connection = Connection::connect(config)?;
        match &self.command {
            SchemaSubcommand::Create => {
                connection.create_schema().await?;
                Self::report(format, "created", "Schema created.")
            }
            SchemaSubcommand::Delete(args) => {
                Self::confirm(args, "delete")?;
                connection.delete_schema().await?;
                Self::report(format, "deleted", "Schema deleted.")
            }
            SchemaSubcommand::Reset(args) => {
                Self::confirm(args, "reset")?;
                connection.reset_schema().await?;
                Self::report(format, "reset", "Schema reset.")
            }
            SchemaSubcommand::Validate => Self::validate(&connection, format).await,
            SchemaSubcommand::Status => Self::status(&connection, format).await,
            SchemaSubcommand::Show(_) => Ok(()),
        }
    }

    fn confirm(args: &ConfirmArgs, action: &str) -> CliResult<()> {
        if args.yes {
            Ok(())
        } else {
            Err(format!("Refusing to {action} the schema without --yes").into())
        }
    }

    fn report(format: OutputFormat, status: &str, message: &str) -> CliResult<()> {
        match format {
            OutputFormat::Json => print_json(&json!({ "status": status })),
            OutputFormat::Table => {
                println!("{message}");
                Ok(())
            }
        }
    }

    async fn validate(connection: &Connection, format: OutputFormat) -> CliResult<()> {
        let valid = connection.validate_schema().await;

        match format {
            OutputFormat::Json => print_json(&json!({ "valid": valid }))?,
            OutputFormat::Table if valid => println!("Schema is valid."),
            OutputFormat::Table => {}
        }

        if valid {
            Ok(())
        } else {
            Err("Schema does not match the declarations".into())
        }
    }

    async fn status(connection: &Connection, format: OutputFormat) -> CliResult<()> {
        let status = connection.get_schema_status().await;

        match format {
            OutputFormat::Json => {
                let output: serde_json::Map<String, Value> = status
                    .iter()
                    .map(|(class, exists)| (class.clone(), json!(exists)))
                    .collect();
                print_json(&Value::Object(output))?;
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_header(["Class", "Exists"]);
                for (class, exists) in &status {
                    table.add_row([class.as_str(), if *exists { "yes" } else { "no" }]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }

    fn show(args: &ShowArgs, format: OutputFormat) -> CliResult<()> {
        let classes: Vec<ClassSchema> = schema()
            .into_iter()
            .filter(|c| args.class.as_ref().is_none_or(|name| &c.class == name))
            .collect();

        if classes.is_empty() {
            let name = args.class.as_deref().unwrap_or_default();
            return Err(format!("Unknown class: {name}").into());
        }

        match format {
            OutputFormat::Json => print_json(&serde_json::to_value(&classes)?)?,
            OutputFormat::Table => {
                for class in &classes {
                    println!("{} - {}", class.class, class.description);

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL_CONDENSED)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(["Property", "Type", "Description"]);
                    for property in &class.properties {
                        table.add_row([
                            property.name.clone(),
                            property.data_type.join(", "),
                            truncate_string(&property.description, 60),
                        ]);
                    }
                    println!("{table}\n");
                }
            }
        }
        Ok(())
    }
}
