//! Document assembly: turns a validated case and its document set into filled legal drafts.

mod templates;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::intake::CaseRecord;
use super::render::LineClass;

pub use templates::{default_demands, TemplateContext, FOOTER_DISCLAIMER, NOT_INFORMED};

/// Separator placed between documents when several are concatenated.
pub const BUNDLE_SEPARATOR: &str =
    "============================================================";

/// Lines shown unmasked at the top of a locked preview.
pub const PREVIEW_VISIBLE_LINES: usize = 12;

const PREVIEW_MASK: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    RegulatorContestation,
    PoliceReportDraft,
    InstitutionNotification,
    CentralBankComplaint,
    ConsumerAgencyComplaint,
}

impl DocumentKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::RegulatorContestation,
            Self::PoliceReportDraft,
            Self::InstitutionNotification,
            Self::CentralBankComplaint,
            Self::ConsumerAgencyComplaint,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RegulatorContestation => "Instant transfer contestation request",
            Self::PoliceReportDraft => "Police report draft",
            Self::InstitutionNotification => "Extrajudicial notice to the bank",
            Self::CentralBankComplaint => "Central Bank complaint",
            Self::ConsumerAgencyComplaint => "Consumer agency complaint",
        }
    }

    /// Uppercase title printed at the top of the document body.
    pub const fn title(self) -> &'static str {
        match self {
            Self::RegulatorContestation => "REQUEST FOR SPECIAL REFUND CONTESTATION (MED)",
            Self::PoliceReportDraft => "POLICE REPORT DRAFT",
            Self::InstitutionNotification => "EXTRAJUDICIAL NOTICE TO FINANCIAL INSTITUTION",
            Self::CentralBankComplaint => "COMPLAINT TO THE CENTRAL BANK OF BRAZIL",
            Self::ConsumerAgencyComplaint => "CONSUMER PROTECTION COMPLAINT",
        }
    }

    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::RegulatorContestation => "contestation-request",
            Self::PoliceReportDraft => "police-report-draft",
            Self::InstitutionNotification => "bank-notice",
            Self::CentralBankComplaint => "central-bank-complaint",
            Self::ConsumerAgencyComplaint => "consumer-complaint",
        }
    }

    /// Where the purchaser files this document once it is unlocked.
    pub const fn filing_instructions(self) -> &'static str {
        match self {
            Self::RegulatorContestation => {
                "Send it through your bank's fraud channel (app, branch, or phone) and ask for the MED protocol number."
            }
            Self::PoliceReportDraft => {
                "Register it at the online police station of your state or at the nearest police station."
            }
            Self::InstitutionNotification => {
                "Deliver it to your bank's customer service and ombudsman, keeping proof of delivery."
            }
            Self::CentralBankComplaint => {
                "Submit it on the Central Bank citizen complaint portal after the bank has had a chance to answer."
            }
            Self::ConsumerAgencyComplaint => {
                "File it on the federal consumer complaint platform or at your local consumer protection office."
            }
        }
    }
}

/// Ordered, never-empty list of the documents a case needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DocumentSet(Vec<DocumentKind>);

impl DocumentSet {
    /// Build from a catalog row. Duplicates are dropped; an empty row falls back to the
    /// police report draft so every case produces at least one document.
    pub fn from_catalog(kinds: &[DocumentKind]) -> Self {
        let mut unique: Vec<DocumentKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        if unique.is_empty() {
            unique.push(DocumentKind::PoliceReportDraft);
        }
        Self(unique)
    }

    pub fn kinds(&self) -> &[DocumentKind] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, kind: DocumentKind) -> bool {
        self.0.contains(&kind)
    }
}

/// One filled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub body: String,
}

impl AssembledDocument {
    pub fn redacted(&self) -> AssembledDocument {
        AssembledDocument {
            kind: self.kind,
            title: self.title.clone(),
            body: redacted_preview(&self.body, PREVIEW_VISIBLE_LINES),
        }
    }
}

/// Kind-specific inputs that do not belong on the case record.
///
/// Demands negotiated for one document (usually the notice to the bank) leave the
/// defaults of every other kind untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyExtras {
    #[serde(default)]
    pub demands: HashMap<DocumentKind, Vec<String>>,
}

impl AssemblyExtras {
    pub fn with_demands(mut self, kind: DocumentKind, demands: Vec<String>) -> Self {
        self.demands.insert(kind, demands);
        self
    }

    /// Caller demands for `kind` with blanks dropped; `None` when nothing usable remains.
    pub fn demands_for(&self, kind: DocumentKind) -> Option<Vec<String>> {
        let demands: Vec<String> = self
            .demands
            .get(&kind)?
            .iter()
            .map(|demand| demand.trim().to_string())
            .filter(|demand| !demand.is_empty())
            .collect();
        (!demands.is_empty()).then_some(demands)
    }
}

/// Fills templates for every kind in a [`DocumentSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble_one(
        &self,
        kind: DocumentKind,
        case: &CaseRecord,
        extras: &AssemblyExtras,
        generated_on: NaiveDate,
    ) -> AssembledDocument {
        let demands = extras
            .demands_for(kind)
            .unwrap_or_else(|| default_demands(kind, case));
        let context = TemplateContext {
            case,
            generated_on,
            demands: &demands,
        };
        AssembledDocument {
            kind,
            title: kind.title().to_string(),
            body: templates::render(kind, &context),
        }
    }

    /// Assemble with default demands for every kind.
    pub fn assemble(
        &self,
        case: &CaseRecord,
        set: &DocumentSet,
        generated_on: NaiveDate,
    ) -> Vec<AssembledDocument> {
        self.assemble_with(case, set, &AssemblyExtras::default(), generated_on)
    }

    pub fn assemble_with(
        &self,
        case: &CaseRecord,
        set: &DocumentSet,
        extras: &AssemblyExtras,
        generated_on: NaiveDate,
    ) -> Vec<AssembledDocument> {
        set.kinds()
            .iter()
            .map(|kind| self.assemble_one(*kind, case, extras, generated_on))
            .collect()
    }
}

/// Concatenate document bodies with [`BUNDLE_SEPARATOR`].
pub fn bundle(documents: &[AssembledDocument]) -> String {
    let joiner = format!("\n\n{BUNDLE_SEPARATOR}\n\n");
    documents
        .iter()
        .map(|document| document.body.as_str())
        .collect::<Vec<_>>()
        .join(&joiner)
}

/// Inverse of [`bundle`].
pub fn split_bundle(bundled: &str) -> Vec<String> {
    if bundled.is_empty() {
        return Vec::new();
    }
    let joiner = format!("\n\n{BUNDLE_SEPARATOR}\n\n");
    bundled.split(&joiner).map(str::to_string).collect()
}

/// Keep the first `visible_lines` lines and mask letters and digits after that.
///
/// Structure (headings, blank lines, rules, field labels) stays readable so the buyer
/// can see what the document contains without being able to use it.
pub fn redacted_preview(body: &str, visible_lines: usize) -> String {
    body.lines()
        .enumerate()
        .map(|(index, line)| {
            if index < visible_lines {
                return line.to_string();
            }
            match LineClass::classify(line) {
                LineClass::Rule | LineClass::Blank | LineClass::Heading => line.to_string(),
                LineClass::Label => match line.split_once(": ") {
                    Some((label, value)) => format!("{label}: {}", mask(value)),
                    None => mask(line),
                },
                LineClass::Body => mask(line),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn mask(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { PREVIEW_MASK } else { c })
        .collect()
}
