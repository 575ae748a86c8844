use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use eumas::{EmbeddingClient, EmbeddingOutput};
use serde_json::json;

use crate::error::CliResult;
use crate::output::{OutputFormat, print_json, truncate_string};

#[derive(Parser)]
pub struct EmbedCommand {
    #[clap(required = true, help = "Texts to embed; more than one is sent as a batch")]
    pub texts: Vec<String>,
}

fn preview(vector: &[f32]) -> String {
    let head: Vec<String> = vector.iter().take(4).map(|v| format!("{v:.4}")).collect();
    if vector.len() > 4 {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}

impl EmbedCommand {
    pub async fn execute(&self, client: &EmbeddingClient, format: OutputFormat) -> CliResult<()> {
        let vectors = match self.texts.as_slice() {
            [text] => match client.generate(text.as_str()).await? {
                EmbeddingOutput::Single(vector) => vec![vector],
                EmbeddingOutput::Batch(vectors) => vectors,
            },
            texts => client.embed_batch(texts).await?,
        };

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = self
                    .texts
                    .iter()
                    .zip(&vectors)
                    .map(|(text, vector)| json!({ "text": text, "embedding": vector }))
                    .collect();
                print_json(&json!({ "model": client.model(), "embeddings": output }))?;
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Text", "Dimensions", "Preview"]);
                for (text, vector) in self.texts.iter().zip(&vectors) {
                    table.add_row([
                        truncate_string(text, 40),
                        vector.len().to_string(),
                        preview(vector),
                    ]);
                }
                println!("{table}");
                println!("\nModel: {}", client.model());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview(&[0.5, 0.25]), "[0.5000, 0.2500]");
        assert_eq!(
            preview(&[0.1, 0.2, 0.3, 0.4, 0.5]),
            "[0.1000, 0.2000, 0.3000, 0.4000, ...]"
        );
    }
}
