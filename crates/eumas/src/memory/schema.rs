//! Class declarations for the Weaviate schema
//!
//! Pure data: every function here builds the same declaration on every call
//! and never touches the network.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::memory::archetype::Archetype;

pub const MEMORY_CLASS: &str = "Memory";
pub const RELATION_CLASS: &str = "ArchetypeMemoryRelation";

/// A class declaration as accepted by `POST /v1/schema`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_index_config: Option<VectorIndexConfig>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ClassSchema {
    /// Names of all declared properties
    pub fn property_names(&self) -> BTreeSet<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }
}

/// HNSW settings for a class that stores vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorIndexConfig {
    pub distance: String,
    pub ef: i64,
    pub ef_construction: i64,
    pub max_connections: i64,
    pub vector_cache_max_objects: i64,
}

/// One property of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub data_type: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Property {
    fn new(name: &str, data_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: vec![data_type.to_string()],
            description: description.to_string(),
        }
    }
}

/// Declaration of the `Memory` class. Vectors are supplied by the caller.
pub fn memory_class_schema() -> ClassSchema {
    ClassSchema {
        class: MEMORY_CLASS.to_string(),
        description: "Base memory instance storing core interaction data".to_string(),
        vectorizer: Some("none".to_string()),
        vector_index_config: Some(VectorIndexConfig {
            distance: "cosine".to_string(),
            ef: 100,
            ef_construction: 128,
            max_connections: 64,
            vector_cache_max_objects: 500_000,
        }),
        properties: vec![
            Property::new("userPrompt", "text", "The user's input or query"),
            Property::new("agentReply", "text", "The system's response to the user's query"),
            Property::new("sessionId", "text", "Unique identifier for the session"),
            Property::new("userId", "text", "Unique identifier for the user"),
            Property::new("contextTags", "text[]", "Tags describing the interaction context"),
            Property::new("tone", "text", "Overall tone of the interaction"),
            Property::new("timestamp", "date", "Timestamp of the interaction"),
            Property::new("duration", "number", "Duration of the interaction in seconds"),
            Property::new("memoryPriority", "number", "Overall memory priority score"),
        ],
    }
}

/// Declaration of the `ArchetypeMemoryRelation` class, including the metric
/// properties of every archetype.
pub fn relation_class_schema() -> ClassSchema {
    let mut properties = vec![
        Property::new("archetype", "text", "The archetype making this evaluation"),
        Property::new("spokenAnnotation", "text", "Free-form annotation from the archetype"),
        Property::new("archetypePriority", "number", "This archetype's priority score"),
        Property::new("evaluatedMemory", MEMORY_CLASS, "Reference to the evaluated memory"),
        Property::new("relatedMemory", MEMORY_CLASS, "Reference to a related memory"),
        Property::new("relationshipType", "text", "Type of relationship between memories"),
        Property::new(
            "relationshipStrength",
            "number",
            "Strength of the relationship (0.0 to 1.0)",
        ),
    ];

    properties.extend(Archetype::ALL.iter().flat_map(|archetype| {
        archetype
            .metrics()
            .iter()
            .map(|m| Property::new(m.name, "number", m.description))
    }));

    ClassSchema {
        class: RELATION_CLASS.to_string(),
        description: "Archetype-specific memory evaluations and relationships".to_string(),
        vectorizer: Some("none".to_string()),
        vector_index_config: None,
        properties,
    }
}

/// Both class declarations, in creation order.
pub fn schema() -> Vec<ClassSchema> {
    vec![memory_class_schema(), relation_class_schema()]
}
