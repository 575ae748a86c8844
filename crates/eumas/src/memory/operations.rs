//! Memory storage and graph queries
//!
//! Translates domain requests into store writes and `Get` queries. Results
//! are returned exactly as the store produced them.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::archetype::Archetype;
use crate::memory::schema::{MEMORY_CLASS, RELATION_CLASS};
use crate::memory::types::{ArchetypeMemoryRelation, Memory};
use crate::storage::{Connection, GetQuery, StoreObject, WhereFilter};

pub const DEFAULT_SIGNIFICANT_LIMIT: usize = 5;
pub const DEFAULT_NETWORK_DEPTH: u32 = 2;
pub const DEFAULT_NETWORK_MIN_STRENGTH: f64 = 0.5;
pub const DEFAULT_PERSPECTIVE_LIMIT: usize = 10;
pub const DEFAULT_RANGE_LIMIT: usize = 100;

/// Selection of a Memory reached through a reference, as `... on Memory { }`
fn inline_memory(reference: &str, fields: &str) -> String {
    format!("{reference} {{ ... on {MEMORY_CLASS} {{ {fields} _additional {{ id }} }} }}")
}

fn relation_edges(direction: &str, target: Option<&str>) -> String {
    let target = target
        .map(|reference| format!(" {}", inline_memory(reference, "userPrompt")))
        .unwrap_or_default();
    format!(
        "{direction} {{ {RELATION_CLASS} {{ relationshipStrength archetype archetypePriority spokenAnnotation{target} }} }}"
    )
}

/// Storage and retrieval of memories and archetype relations
#[derive(Debug, Clone)]
pub struct MemoryOperations {
    connection: Connection,
}

impl MemoryOperations {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Store one memory and return its id.
    pub async fn store_memory(&self, memory: &Memory) -> Result<Uuid> {
        memory.validate()?;
        let id = self
            .connection
            .store()
            .create_object(&memory.to_store_object())
            .await?;
        debug!("Stored memory {}", id);
        Ok(id)
    }

    /// Store one relation and return its id.
    pub async fn store_memory_relation(&self, relation: &ArchetypeMemoryRelation) -> Result<Uuid> {
        relation.validate()?;
        let id = self
            .connection
            .store()
            .create_object(&relation.to_store_object())
            .await?;
        debug!("Stored {} relation {}", relation.archetype(), id);
        Ok(id)
    }

    /// Store memories in one batch; ids come back in input order.
    pub async fn store_memories_batch(&self, memories: &[Memory]) -> Result<Vec<Uuid>> {
        for memory in memories {
            memory.validate()?;
        }
        let objects = memories.iter().map(Memory::to_store_object).collect();
        let ids = self.store_batch(objects).await?;
        info!("Stored {} memories in batch", ids.len());
        Ok(ids)
    }

    /// Store relations in one batch; ids come back in input order.
    pub async fn store_relations_batch(
        &self,
        relations: &[ArchetypeMemoryRelation],
    ) -> Result<Vec<Uuid>> {
        for relation in relations {
            relation.validate()?;
        }
        let objects = relations
            .iter()
            .map(ArchetypeMemoryRelation::to_store_object)
            .collect();
        let ids = self.store_batch(objects).await?;
        info!("Stored {} relations in batch", ids.len());
        Ok(ids)
    }

    /// Add every object to one batch. The batch is flushed even when adding
    /// fails part way. The add error is returned and a flush error after it
    /// is logged.
    async fn store_batch(&self, objects: Vec<StoreObject>) -> Result<Vec<Uuid>> {
        let mut batch = self.connection.batch();

        let mut added = Ok(());
        for object in objects {
            if let Err(e) = batch.add(object).await {
                added = Err(e);
                break;
            }
        }

        let flushed = batch.flush().await;
        match (added, flushed) {
            (Err(e), Err(flush_err)) => {
                warn!("Closing the failed batch also failed: {}", flush_err);
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
            (Ok(()), flushed) => flushed,
        }
    }

    /// Memories ranked by their relationships, with incoming relation edges
    /// inlined. An unknown `archetype_filter` is rejected before querying.
    pub async fn get_significant_memories(
        &self,
        limit: usize,
        min_relationship_strength: f64,
        archetype_filter: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut filter =
            WhereFilter::greater_than(&["relationshipStrength"], min_relationship_strength)?;

        if let Some(archetype) = archetype_filter {
            let archetype: Archetype = archetype.parse()?;
            filter = filter.and(WhereFilter::equal_text(&["archetype"], archetype.as_str()));
        }

        let query = GetQuery::new(MEMORY_CLASS)
            .with_fields([
                "userPrompt".to_string(),
                "agentReply".to_string(),
                "contextTags".to_string(),
                "timestamp".to_string(),
                relation_edges("incoming", None),
            ])
            .with_where(filter)
            .with_limit(limit)
            .with_additional("id");

        self.connection.execute(&query).await
    }

    /// One memory with its direct incoming and outgoing relation edges and
    /// the id and prompt of each connected memory.
    ///
    /// `max_depth` and `min_strength` are accepted for interface stability
    /// but do not change the query: traversal is always one hop and no
    /// strength threshold is applied.
    pub async fn get_memory_network(
        &self,
        memory_id: Uuid,
        max_depth: u32,
        min_strength: f64,
    ) -> Result<Vec<Value>> {
        debug!(
            "Memory network for {} (max_depth {} and min_strength {} are not applied)",
            memory_id, max_depth, min_strength
        );

        let query = GetQuery::new(MEMORY_CLASS)
            .with_fields([
                "userPrompt".to_string(),
                "agentReply".to_string(),
                "contextTags".to_string(),
                relation_edges("incoming", Some("evaluatedMemory")),
                relation_edges("outgoing", Some("relatedMemory")),
            ])
            .with_id(memory_id)
            .with_additional("id");

        self.connection.execute(&query).await
    }

    /// Relations authored by one archetype, with both endpoint memories
    /// inlined, optionally restricted to evaluated memories carrying
    /// `context_tag`.
    pub async fn get_archetype_perspective(
        &self,
        archetype: &str,
        context_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let archetype: Archetype = archetype.parse()?;
        let summary = "userPrompt contextTags timestamp";

        let mut query = GetQuery::new(RELATION_CLASS)
            .with_fields([
                "relationshipStrength".to_string(),
                "relationshipType".to_string(),
                "spokenAnnotation".to_string(),
                "archetypePriority".to_string(),
                inline_memory("evaluatedMemory", summary),
                inline_memory("relatedMemory", summary),
            ])
            .with_where(WhereFilter::equal_text(&["archetype"], archetype.as_str()))
            .with_limit(limit)
            .with_additional("id");

        if let Some(tag) = context_tag {
            query = query.and_where(WhereFilter::contains_any(
                &["evaluatedMemory", MEMORY_CLASS, "contextTags"],
                vec![tag.to_string()],
            ));
        }

        self.connection.execute(&query).await
    }

    /// Memories with `start <= timestamp <= end`.
    pub async fn get_memories_by_timerange(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let query = Self::memory_summary_query()
            .with_where(
                WhereFilter::date_on_or_after(&["timestamp"], start)
                    .and(WhereFilter::date_on_or_before(&["timestamp"], end)),
            )
            .with_limit(limit);

        self.connection.execute(&query).await
    }

    /// Memories tagged with any of `context_tags` and priority at least
    /// `min_priority`, with the store's relevance score. A non-finite
    /// `min_priority` is a validation error.
    pub async fn get_memories_by_context(
        &self,
        context_tags: &[String],
        min_priority: f64,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let priority = WhereFilter::greater_than_equal(&["memoryPriority"], min_priority)?;
        let query = Self::memory_summary_query()
            .with_where(
                WhereFilter::contains_any(&["contextTags"], context_tags.to_vec()).and(priority),
            )
            .with_limit(limit)
            .with_additional("score");

        self.connection.execute(&query).await
    }

    fn memory_summary_query() -> GetQuery {
        GetQuery::new(MEMORY_CLASS)
            .with_fields([
                "userPrompt",
                "agentReply",
                "contextTags",
                "timestamp",
                "memoryPriority",
            ])
            .with_additional("id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_memory_selection() {
        assert_eq!(
            inline_memory("relatedMemory", "userPrompt"),
            "relatedMemory { ... on Memory { userPrompt _additional { id } } }"
        );
    }

    #[test]
    fn test_relation_edges_selection() {
        assert_eq!(
            relation_edges("incoming", None),
            "incoming { ArchetypeMemoryRelation { relationshipStrength archetype archetypePriority spokenAnnotation } }"
        );
        assert!(relation_edges("outgoing", Some("relatedMemory"))
            .contains("spokenAnnotation relatedMemory { ... on Memory"));
    }
}
