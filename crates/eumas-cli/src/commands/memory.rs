use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use eumas::MemoryOperations;
use eumas::memory::operations::{
    DEFAULT_NETWORK_DEPTH, DEFAULT_NETWORK_MIN_STRENGTH, DEFAULT_PERSPECTIVE_LIMIT,
    DEFAULT_RANGE_LIMIT, DEFAULT_SIGNIFICANT_LIMIT,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CliResult;
use crate::output::{OutputFormat, print_json, results_table};

const MEMORY_COLUMNS: [(&str, &str); 5] = [
    ("ID", "/_additional/id"),
    ("Prompt", "/userPrompt"),
    ("Tags", "/contextTags"),
    ("Priority", "/memoryPriority"),
    ("Timestamp", "/timestamp"),
];

const SIGNIFICANT_COLUMNS: [(&str, &str); 4] = [
    ("ID", "/_additional/id"),
    ("Prompt", "/userPrompt"),
    ("Tags", "/contextTags"),
    ("Timestamp", "/timestamp"),
];

const NETWORK_COLUMNS: [(&str, &str); 4] = [
    ("ID", "/_additional/id"),
    ("Prompt", "/userPrompt"),
    ("Incoming", "/incoming"),
    ("Outgoing", "/outgoing"),
];

const PERSPECTIVE_COLUMNS: [(&str, &str); 5] = [
    ("ID", "/_additional/id"),
    ("Type", "/relationshipType"),
    ("Strength", "/relationshipStrength"),
    ("Annotation", "/spokenAnnotation"),
    ("Evaluated", "/evaluatedMemory/0/userPrompt"),
];

#[derive(Parser)]
pub struct MemoryCommand {
    #[clap(subcommand)]
    pub command: MemorySubcommand,
}

#[derive(Subcommand)]
pub enum MemorySubcommand {
    #[clap(about = "Memories tagged with any of the given context tags")]
    Context(ContextArgs),

    #[clap(about = "Memories within a time range")]
    Timerange(TimerangeArgs),

    #[clap(about = "Memories ranked by relationship strength")]
    Significant(SignificantArgs),

    #[clap(about = "A memory and its direct relationships")]
    Network(NetworkArgs),

    #[clap(about = "Relations authored by one archetype")]
    Perspective(PerspectiveArgs),
}

#[derive(Parser)]
pub struct ContextArgs {
    #[clap(required = true, help = "Context tags to match")]
    pub tags: Vec<String>,

    #[clap(long, default_value = "0.0", help = "Minimum memory priority")]
    pub min_priority: f64,

    #[clap(long, short, default_value_t = DEFAULT_RANGE_LIMIT, help = "Maximum number of results")]
    pub limit: usize,
}

#[derive(Parser)]
pub struct TimerangeArgs {
    #[clap(help = "Start of the range (RFC 3339)")]
    pub start: String,

    #[clap(help = "End of the range (RFC 3339)")]
    pub end: String,

    #[clap(long, short, default_value_t = DEFAULT_RANGE_LIMIT, help = "Maximum number of results")]
    pub limit: usize,
}

#[derive(Parser)]
pub struct SignificantArgs {
    #[clap(long, short, default_value_t = DEFAULT_SIGNIFICANT_LIMIT, help = "Maximum number of results")]
    pub limit: usize,

    #[clap(long, default_value = "0.0", help = "Minimum relationship strength")]
    pub min_strength: f64,

    #[clap(long, short, help = "Only relations from this archetype (e.g. Ella-M)")]
    pub archetype: Option<String>,
}

#[derive(Parser)]
pub struct NetworkArgs {
    #[clap(help = "Memory ID (UUID format)")]
    pub id: String,

    #[clap(long, default_value_t = DEFAULT_NETWORK_DEPTH, help = "Traversal depth (currently one hop)")]
    pub max_depth: u32,

    #[clap(long, default_value_t = DEFAULT_NETWORK_MIN_STRENGTH, help = "Minimum edge strength (not applied)")]
    pub min_strength: f64,
}

#[derive(Parser)]
pub struct PerspectiveArgs {
    #[clap(help = "Archetype name (e.g. Ella-M)")]
    pub archetype: String,

    #[clap(long, short, help = "Only evaluated memories with this context tag")]
    pub tag: Option<String>,

    #[clap(long, short, default_value_t = DEFAULT_PERSPECTIVE_LIMIT, help = "Maximum number of results")]
    pub limit: usize,
}

fn parse_timestamp(value: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{value}': {e}").into())
}

impl MemoryCommand {
    pub async fn execute(&self, ops: &MemoryOperations, format: OutputFormat) -> CliResult<()> {
        let (results, columns): (Vec<Value>, &[(&str, &str)]) = match &self.command {
            MemorySubcommand::Context(args) => (
                ops.get_memories_by_context(&args.tags, args.min_priority, args.limit)
                    .await?,
                &MEMORY_COLUMNS[..],
            ),
            MemorySubcommand::Timerange(args) => {
                let start = parse_timestamp(&args.start)?;
                let end = parse_timestamp(&args.end)?;
                (
                    ops.get_memories_by_timerange(start, end, args.limit).await?,
                    &MEMORY_COLUMNS[..],
                )
            }
            MemorySubcommand::Significant(args) => (
                ops.get_significant_memories(
                    args.limit,
                    args.min_strength,
                    args.archetype.as_deref(),
                )
                .await?,
                &SIGNIFICANT_COLUMNS[..],
            ),
            MemorySubcommand::Network(args) => {
                let id =
                    Uuid::parse_str(&args.id).map_err(|e| format!("Invalid UUID format: {e}"))?;
                (
                    ops.get_memory_network(id, args.max_depth, args.min_strength)
                        .await?,
                    &NETWORK_COLUMNS[..],
                )
            }
            MemorySubcommand::Perspective(args) => (
                ops.get_archetype_perspective(&args.archetype, args.tag.as_deref(), args.limit)
                    .await?,
                &PERSPECTIVE_COLUMNS[..],
            ),
        };

        match format {
            OutputFormat::Json => print_json(&Value::Array(results))?,
            OutputFormat::Table => {
                if results.is_empty() {
                    println!("No results found.");
                    return Ok(());
                }
                println!("{}", results_table(&results, columns, 50));
                println!("\nTotal: {} results", results.len());
            }
        }
        Ok(())
    }
}
