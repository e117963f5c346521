//! Coarse complexity scoring

use serde::{Deserialize, Serialize};

use crate::domain::document::{ConnectionGraph, NodeCategory, WorkflowDocument};

/// Upper bound (inclusive) of the simple band
const SIMPLE_MAX: u32 = 10;
/// Upper bound (inclusive) of the moderate band
const MODERATE_MAX: u32 = 25;
/// Lower bound of the band that earns a scoring bonus
const BALANCED_MIN: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityLevel {
    pub fn from_score(score: u32) -> Self {
        if score <= SIMPLE_MAX {
            Self::Simple
        } else if score <= MODERATE_MAX {
            Self::Moderate
        } else {
            Self::Complex
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: u32,
    pub level: ComplexityLevel,
    pub node_count: u32,
    pub conditional_count: u32,
    pub loop_count: u32,
    pub code_count: u32,
    pub edge_count: u32,
}

impl ComplexityReport {
    pub fn assess(document: &WorkflowDocument, graph: &ConnectionGraph) -> Self {
        let mut node_count = 0;
        let mut conditional_count = 0;
        let mut loop_count = 0;
        let mut code_count = 0;

        for node in document.nodes() {
            let Some(family) = node.family() else {
                node_count += 1;
                continue;
            };

            match family.category() {
                NodeCategory::Annotation => continue,
                NodeCategory::Conditional => conditional_count += 1,
                NodeCategory::Loop => loop_count += 1,
                NodeCategory::Code => code_count += 1,
                _ => {}
            }

            node_count += 1;
        }

        let edge_count = graph.edge_count() as u32;
        let score =
            node_count + 2 * conditional_count + 3 * loop_count + 2 * code_count + edge_count / 2;

        Self {
            score,
            level: ComplexityLevel::from_score(score),
            node_count,
            conditional_count,
            loop_count,
            code_count,
            edge_count,
        }
    }

    pub fn is_balanced(&self) -> bool {
        (BALANCED_MIN..=MODERATE_MAX).contains(&self.score)
    }
}
