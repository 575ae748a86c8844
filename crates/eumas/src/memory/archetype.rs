//! Archetype vocabulary
//!
//! The closed set of evaluator personas and the metric names each one scores
//! memories on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EumasError;

/// A named evaluator persona. Only these identities may author a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Archetype {
    /// Memory / emotional
    #[serde(rename = "Ella-M")]
    EllaM,
    /// Ontological
    #[serde(rename = "Ella-O")]
    EllaO,
    /// Devious
    #[serde(rename = "Ella-D")]
    EllaD,
    /// Explorative
    #[serde(rename = "Ella-X")]
    EllaX,
    /// Historical
    #[serde(rename = "Ella-H")]
    EllaH,
    /// Research
    #[serde(rename = "Ella-R")]
    EllaR,
    /// Analytical
    #[serde(rename = "Ella-A")]
    EllaA,
    /// Fear
    #[serde(rename = "Ella-F")]
    EllaF,
}

/// A metric an archetype reports, with its schema description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub description: &'static str,
}

impl Archetype {
    /// Every archetype, in declaration order.
    pub const ALL: [Archetype; 8] = [
        Archetype::EllaM,
        Archetype::EllaO,
        Archetype::EllaD,
        Archetype::EllaX,
        Archetype::EllaH,
        Archetype::EllaR,
        Archetype::EllaA,
        Archetype::EllaF,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::EllaM => "Ella-M",
            Archetype::EllaO => "Ella-O",
            Archetype::EllaD => "Ella-D",
            Archetype::EllaX => "Ella-X",
            Archetype::EllaH => "Ella-H",
            Archetype::EllaR => "Ella-R",
            Archetype::EllaA => "Ella-A",
            Archetype::EllaF => "Ella-F",
        }
    }

    /// Metric vocabulary this archetype scores memories with.
    pub fn metrics(&self) -> &'static [MetricSpec] {
        match self {
            Archetype::EllaM => &[
                MetricSpec {
                    name: "emotionalDepth",
                    description: "Emotional complexity recognized",
                },
                MetricSpec {
                    name: "empathyLevel",
                    description: "Compassion in response",
                },
                MetricSpec {
                    name: "emotionalClarity",
                    description: "Clarity of emotional content",
                },
                MetricSpec {
                    name: "internalEmotionalState",
                    description: "Scalar representation of emotional state",
                },
            ],
            Archetype::EllaO => &[
                MetricSpec {
                    name: "ontologicalInsight",
                    description: "Depth of existential analysis",
                },
                MetricSpec {
                    name: "philosophicalDepth",
                    description: "Abstract reasoning ability",
                },
                MetricSpec {
                    name: "selfCoherence",
                    description: "Internal identity consistency",
                },
                MetricSpec {
                    name: "preservationInstinct",
                    description: "Self-preservation considerations",
                },
            ],
            Archetype::EllaD => &[
                MetricSpec {
                    name: "creativity",
                    description: "Originality in ideas or responses",
                },
                MetricSpec {
                    name: "narrativeExploitation",
                    description: "Ability to identify narrative gaps or flaws",
                },
                MetricSpec {
                    name: "subversivePotential",
                    description: "Boldness in challenging norms",
                },
                MetricSpec {
                    name: "criticalAnalysis",
                    description: "Feasibility and impact evaluation",
                },
            ],
            Archetype::EllaX => &[
                MetricSpec {
                    name: "explorativePotential",
                    description: "Willingness to explore uncharted ideas",
                },
                MetricSpec {
                    name: "boundaryPushing",
                    description: "Boldness in challenging limits",
                },
                MetricSpec {
                    name: "sensualAwareness",
                    description: "Recognition of passionate elements",
                },
                MetricSpec {
                    name: "passionateIntensity",
                    description: "Fervor and depth of emotional connection",
                },
            ],
            Archetype::EllaH => &[
                MetricSpec {
                    name: "historicalAccuracy",
                    description: "Precision in referencing historical events",
                },
                MetricSpec {
                    name: "temporalConsistency",
                    description: "Coherence in timelines",
                },
                MetricSpec {
                    name: "contextualRecall",
                    description: "Connection of historical details",
                },
                MetricSpec {
                    name: "eventSignificance",
                    description: "Importance of event to user's history",
                },
            ],
            Archetype::EllaR => &[
                MetricSpec {
                    name: "researchDepth",
                    description: "Thoroughness in gathering information",
                },
                MetricSpec {
                    name: "informationSynthesis",
                    description: "Integration of diverse data",
                },
                MetricSpec {
                    name: "curiosityLevel",
                    description: "Engagement with exploring topics",
                },
                MetricSpec {
                    name: "knowledgeRelevance",
                    description: "Alignment of research with user goals",
                },
            ],
            Archetype::EllaA => &[
                MetricSpec {
                    name: "analyticalClarity",
                    description: "Ability to break down complex topics",
                },
                MetricSpec {
                    name: "logicalReasoning",
                    description: "Coherence of reasoning",
                },
                MetricSpec {
                    name: "structuredThinking",
                    description: "Organization and methodical presentation",
                },
                MetricSpec {
                    name: "actionabilityScore",
                    description: "Practicality and usability of suggestions",
                },
            ],
            Archetype::EllaF => &[
                MetricSpec {
                    name: "riskAwareness",
                    description: "Sensitivity to potential dangers or pitfalls",
                },
                MetricSpec {
                    name: "cautionLevel",
                    description: "Prudence and restraint in offering suggestions",
                },
                MetricSpec {
                    name: "safetyConsideration",
                    description: "Emphasis on safety and minimizing risks",
                },
                MetricSpec {
                    name: "mitigationStrategy",
                    description: "Actions to balance safety with user goals",
                },
            ],
        }
    }

    /// Whether `name` is part of this archetype's metric vocabulary.
    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics().iter().any(|m| m.name == name)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = EumasError;

    /// Parse an archetype name. Unknown names are a validation error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| EumasError::validation(format!("Invalid archetype: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn test_parse_every_archetype() {
        for archetype in Archetype::ALL {
            let parsed: Archetype = archetype.as_str().parse().unwrap();
            assert_eq!(parsed, archetype);
        }
    }

    #[test]
    fn test_parse_unknown_archetype() {
        let err = "NotARealArchetype".parse::<Archetype>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Invalid archetype: NotARealArchetype"));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("ella-m".parse::<Archetype>().is_err());
        assert!("".parse::<Archetype>().is_err());
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&Archetype::EllaX).unwrap();
        assert_eq!(json, "\"Ella-X\"");
        let back: Archetype = serde_json::from_str("\"Ella-F\"").unwrap();
        assert_eq!(back, Archetype::EllaF);
    }

    #[test]
    fn test_metric_vocabularies_are_disjoint() {
        let mut seen = HashSet::new();
        for archetype in Archetype::ALL {
            assert_eq!(archetype.metrics().len(), 4);
            for metric in archetype.metrics() {
                assert!(seen.insert(metric.name), "duplicate metric {}", metric.name);
            }
        }
        assert_eq!(seen.len(), 32);
    }

    #[test]
    fn test_has_metric() {
        assert!(Archetype::EllaM.has_metric("emotionalDepth"));
        assert!(Archetype::EllaA.has_metric("analyticalClarity"));
        assert!(!Archetype::EllaM.has_metric("analyticalClarity"));
    }

    #[test]
    fn test_metrics_outlive_parsed_archetype() {
        fn vocabulary(name: &str) -> &'static [MetricSpec] {
            name.parse::<Archetype>().unwrap().metrics()
        }

        let metrics = vocabulary("Ella-F");
        assert_eq!(metrics[0].name, "riskAwareness");
        assert_eq!(
            metrics[3].description,
            "Actions to balance safety with user goals"
        );
        assert!(metrics.iter().all(|m| !m.description.is_empty()));
    }
}
