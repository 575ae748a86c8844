//! Memory types for the EUMAS system
//!
//! Defines the two record kinds stored in Weaviate: [`Memory`] interactions
//! and [`ArchetypeMemoryRelation`] evaluations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::{EumasError, Result};
use crate::memory::archetype::Archetype;
use crate::memory::schema::{MEMORY_CLASS, RELATION_CLASS};
use crate::storage::StoreObject;

pub const DEFAULT_MEMORY_PRIORITY: f64 = 0.5;

/// Properties written by the relation itself; metrics may not reuse them.
const RELATION_CORE_PROPERTIES: [&str; 7] = [
    "archetype",
    "spokenAnnotation",
    "archetypePriority",
    "evaluatedMemory",
    "relatedMemory",
    "relationshipType",
    "relationshipStrength",
];

/// Weaviate beacon pointing at a Memory object
pub fn memory_beacon(id: Uuid) -> String {
    format!("weaviate://localhost/{MEMORY_CLASS}/{id}")
}

/// A single stored interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// The user's input or query
    pub user_prompt: String,
    /// The system's response
    pub agent_reply: String,
    pub session_id: String,
    pub user_id: String,
    /// Free-text labels describing the interaction context
    pub context_tags: Vec<String>,
    /// Overall tone of the interaction
    pub tone: String,
    /// When the interaction happened
    pub timestamp: DateTime<Utc>,
    /// Interaction length in seconds
    pub duration: f64,
    /// Externally computed embedding
    pub embedding: Vec<f32>,
    /// Priority score, not clamped
    pub memory_priority: f64,
}

impl Memory {
    /// Create a memory stamped now, with no tags, empty tone, zero duration
    /// and the default priority.
    pub fn new(
        user_prompt: impl Into<String>,
        agent_reply: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            agent_reply: agent_reply.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            context_tags: Vec::new(),
            tone: String::new(),
            timestamp: Utc::now(),
            duration: 0.0,
            embedding,
            memory_priority: DEFAULT_MEMORY_PRIORITY,
        }
    }

    pub fn with_context_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.memory_priority = priority;
        self
    }

    /// Reject records the store would accept but that break the data model.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.is_empty() {
            return Err(EumasError::memory("Memory embedding vector is empty"));
        }
        if self.duration.is_nan() || self.duration < 0.0 {
            return Err(EumasError::memory(format!(
                "Memory duration must be non-negative seconds, got {}",
                self.duration
            )));
        }
        Ok(())
    }

    /// Object shape written to the `Memory` class
    pub fn to_store_object(&self) -> StoreObject {
        let properties = json!({
            "userPrompt": self.user_prompt,
            "agentReply": self.agent_reply,
            "sessionId": self.session_id,
            "userId": self.user_id,
            "contextTags": self.context_tags,
            "tone": self.tone,
            "timestamp": self.timestamp.to_rfc3339(),
            "duration": self.duration,
            "memoryPriority": self.memory_priority,
        });

        StoreObject {
            class: MEMORY_CLASS.to_string(),
            id: None,
            properties: as_object(properties),
            vector: Some(self.embedding.clone()),
        }
    }
}

/// Directed, typed edge from the evaluated memory to a second memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLink {
    pub related_memory_id: Uuid,
    pub relationship_type: String,
    /// Intended range is 0.0 to 1.0; not enforced
    pub relationship_strength: f64,
}

/// One archetype's evaluation of a memory, optionally linking it to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeMemoryRelation {
    archetype: Archetype,
    spoken_annotation: String,
    archetype_priority: f64,
    evaluated_memory_id: Uuid,
    link: Option<MemoryLink>,
    metrics: BTreeMap<String, f64>,
}

impl ArchetypeMemoryRelation {
    /// Create an evaluation. Fails with a validation error when `archetype`
    /// is not one of the known archetypes.
    pub fn new(
        archetype: &str,
        spoken_annotation: impl Into<String>,
        archetype_priority: f64,
        evaluated_memory_id: Uuid,
    ) -> Result<Self> {
        let archetype: Archetype = archetype.parse()?;
        Ok(Self::for_archetype(
            archetype,
            spoken_annotation,
            archetype_priority,
            evaluated_memory_id,
        ))
    }

    /// Create an evaluation from an already-validated archetype.
    pub fn for_archetype(
        archetype: Archetype,
        spoken_annotation: impl Into<String>,
        archetype_priority: f64,
        evaluated_memory_id: Uuid,
    ) -> Self {
        Self {
            archetype,
            spoken_annotation: spoken_annotation.into(),
            archetype_priority,
            evaluated_memory_id,
            link: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Also record an edge to `related_memory_id`.
    pub fn with_link(
        mut self,
        related_memory_id: Uuid,
        relationship_type: impl Into<String>,
        relationship_strength: f64,
    ) -> Self {
        self.link = Some(MemoryLink {
            related_memory_id,
            relationship_type: relationship_type.into(),
            relationship_strength,
        });
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.metrics
            .extend(metrics.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn spoken_annotation(&self) -> &str {
        &self.spoken_annotation
    }

    pub fn archetype_priority(&self) -> f64 {
        self.archetype_priority
    }

    pub fn evaluated_memory_id(&self) -> Uuid {
        self.evaluated_memory_id
    }

    pub fn link(&self) -> Option<&MemoryLink> {
        self.link.as_ref()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Metric names must not shadow the relation's own properties.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self
            .metrics
            .keys()
            .find(|name| RELATION_CORE_PROPERTIES.contains(&name.as_str()))
        {
            return Err(EumasError::archetype(format!(
                "Metric '{name}' reported by {} collides with a relation property",
                self.archetype
            )));
        }
        Ok(())
    }

    /// Object shape written to the `ArchetypeMemoryRelation` class
    pub fn to_store_object(&self) -> StoreObject {
        let mut properties = Map::new();
        for (name, value) in &self.metrics {
            properties.insert(name.clone(), json!(value));
        }

        properties.insert("archetype".to_string(), json!(self.archetype.as_str()));
        properties.insert("spokenAnnotation".to_string(), json!(self.spoken_annotation));
        properties.insert("archetypePriority".to_string(), json!(self.archetype_priority));
        properties.insert(
            "evaluatedMemory".to_string(),
            json!([{ "beacon": memory_beacon(self.evaluated_memory_id) }]),
        );

        if let Some(link) = &self.link {
            properties.insert(
                "relatedMemory".to_string(),
                json!([{ "beacon": memory_beacon(link.related_memory_id) }]),
            );
            properties.insert("relationshipType".to_string(), json!(link.relationship_type));
            properties.insert(
                "relationshipStrength".to_string(),
                json!(link.relationship_strength),
            );
        }

        StoreObject {
            class: RELATION_CLASS.to_string(),
            id: None,
            properties,
            vector: None,
        }
    }
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
