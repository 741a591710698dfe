use serde::Serialize;

use crate::workflows::catalog::CatalogEntry;
use crate::workflows::documents::{AssembledDocument, DocumentKind};

/// Post-payment checklist: where to file each document and what to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionGuide {
    pub steps: Vec<GuideStep>,
    pub warnings: Vec<&'static str>,
    pub pathways: Vec<GuidePathway>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuideStep {
    pub order: usize,
    pub document: DocumentKind,
    pub label: &'static str,
    pub instructions: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuidePathway {
    pub name: &'static str,
    pub rationale: &'static str,
}

impl CompletionGuide {
    pub fn build(entry: &CatalogEntry, documents: &[AssembledDocument]) -> Self {
        let steps = documents
            .iter()
            .enumerate()
            .map(|(index, document)| GuideStep {
                order: index + 1,
                document: document.kind,
                label: document.kind.label(),
                instructions: document.kind.filing_instructions(),
            })
            .collect();
        let pathways = entry
            .pathways
            .iter()
            .map(|pathway| GuidePathway {
                name: pathway.name,
                rationale: pathway.rationale,
            })
            .collect();
        Self {
            steps,
            warnings: entry.warnings.to_vec(),
            pathways,
        }
    }
}
