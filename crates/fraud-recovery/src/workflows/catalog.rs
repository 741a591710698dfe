//! Static per-incident configuration: base rates, document sets, warnings, and pathways.
//!
//! Adding or tuning an incident type is a change to the tables below; no code path
//! branches on the incident type outside of this module.

use serde::Serialize;

use super::diagnostic::deadline::{
    StatutoryWindow, CHARGEBACK_WINDOW, CONTESTATION_HARD_CUTOFF, CONTESTATION_WINDOW,
};
use super::documents::{DocumentKind, DocumentSet};
use super::intake::IncidentType;

/// Named route through which money may come back, with an approximate success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryPathway {
    pub key: &'static str,
    pub name: &'static str,
    pub approximate_success: u8,
    pub rationale: &'static str,
    /// Window after which the pathway is closed, when one applies.
    pub window: Option<StatutoryWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub incident_type: IncidentType,
    pub base_rate: u8,
    pub documents: &'static [DocumentKind],
    pub warnings: &'static [&'static str],
    pub pathways: &'static [RecoveryPathway],
    pub windows: &'static [StatutoryWindow],
}

impl CatalogEntry {
    pub fn label(&self) -> &'static str {
        self.incident_type.label()
    }

    pub fn document_set(&self) -> DocumentSet {
        DocumentSet::from_catalog(self.documents)
    }
}

/// Read-only lookup from incident type to its [`CatalogEntry`].
#[derive(Debug, Clone, Copy)]
pub struct IncidentCatalog {
    entries: &'static [CatalogEntry],
}

impl Default for IncidentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl IncidentCatalog {
    pub fn standard() -> Self {
        Self { entries: &ENTRIES }
    }

    /// Entry for `incident_type`, or the conservative fallback entry.
    pub fn entry(&self, incident_type: IncidentType) -> &'static CatalogEntry {
        self.entries
            .iter()
            .find(|entry| entry.incident_type == incident_type)
            .unwrap_or(&FALLBACK)
    }

    pub fn resolve_key(&self, key: &str) -> &'static CatalogEntry {
        self.entry(IncidentType::from_key(key))
    }

    pub fn document_set(&self, incident_type: IncidentType) -> DocumentSet {
        self.entry(incident_type).document_set()
    }

    pub fn entries(&self) -> &'static [CatalogEntry] {
        self.entries
    }
}

const INSTANT_REFUND: RecoveryPathway = RecoveryPathway {
    key: "instant_refund_mechanism",
    name: "Special refund mechanism (MED)",
    approximate_success: 70,
    rationale: "The receiving bank can freeze and return an instant transfer when the payer's bank files a fraud contestation before the money is moved on.",
    window: Some(CONTESTATION_HARD_CUTOFF),
};

const INSTITUTION_RESTITUTION: RecoveryPathway = RecoveryPathway {
    key: "institution_restitution",
    name: "Administrative restitution by the bank",
    approximate_success: 45,
    rationale: "Banks answer formal notices and often reimburse when the transaction was atypical for the customer's profile or a security failure is shown.",
    window: None,
};

const CARD_DISPUTE: RecoveryPathway = RecoveryPathway {
    key: "card_dispute",
    name: "Card dispute (chargeback)",
    approximate_success: 80,
    rationale: "Card networks reverse unauthorized charges when the dispute is opened inside the network deadline.",
    window: Some(CHARGEBACK_WINDOW),
};

const CONSUMER_MEDIATION: RecoveryPathway = RecoveryPathway {
    key: "consumer_mediation",
    name: "Consumer agency mediation",
    approximate_success: 35,
    rationale: "Companies registered on the consumer complaint platform must answer within ten days and frequently settle to protect their rating.",
    window: None,
};

const CENTRAL_BANK_COMPLAINT: RecoveryPathway = RecoveryPathway {
    key: "central_bank_complaint",
    name: "Central Bank complaint",
    approximate_success: 30,
    rationale: "A regulator complaint forces a formal written answer from the institution and weighs on its supervision record.",
    window: None,
};

const SMALL_CLAIMS: RecoveryPathway = RecoveryPathway {
    key: "small_claims_court",
    name: "Small claims court",
    approximate_success: 40,
    rationale: "Consumer law places the risk of fraud on the service provider; small claims courts accept cases without a lawyer up to 20 minimum wages.",
    window: None,
};

const CRIMINAL_INVESTIGATION: RecoveryPathway = RecoveryPathway {
    key: "criminal_investigation",
    name: "Police investigation",
    approximate_success: 15,
    rationale: "Money returns only if the perpetrator is identified, but the police report is a prerequisite for every other pathway.",
    window: None,
};

const PLATFORM_PROTECTION: RecoveryPathway = RecoveryPathway {
    key: "platform_protection",
    name: "Marketplace buyer protection",
    approximate_success: 50,
    rationale: "Marketplaces refund buyers when the purchase was paid inside the platform and reported before the protection period ends.",
    window: None,
};

const INSURANCE_CLAIM: RecoveryPathway = RecoveryPathway {
    key: "insurance_claim",
    name: "Insurance claim",
    approximate_success: 35,
    rationale: "Device or card protection insurance pays out on theft when a police report is attached to the claim.",
    window: None,
};

const INSTANT_WINDOWS: &[StatutoryWindow] = &[CONTESTATION_WINDOW, CONTESTATION_HARD_CUTOFF];

const ANTI_RECOVERY_SCAM: &str =
    "Never pay a 'recovery agent' who promises to get your money back: this is a second scam.";

const OTHER: CatalogEntry = CatalogEntry {
    incident_type: IncidentType::Other,
    base_rate: 30,
    documents: &[DocumentKind::PoliceReportDraft],
    warnings: &[
        "Keep every receipt, screenshot, and message related to the incident.",
        ANTI_RECOVERY_SCAM,
    ],
    pathways: &[CRIMINAL_INVESTIGATION, SMALL_CLAIMS],
    windows: &[],
};

static FALLBACK: CatalogEntry = OTHER;

static ENTRIES: [CatalogEntry; 10] = [
    CatalogEntry {
        incident_type: IncidentType::RealTimePayment,
        base_rate: 65,
        documents: &[
            DocumentKind::RegulatorContestation,
            DocumentKind::PoliceReportDraft,
            DocumentKind::InstitutionNotification,
            DocumentKind::CentralBankComplaint,
            DocumentKind::ConsumerAgencyComplaint,
        ],
        warnings: &[
            "Ask your bank to open a refund contestation (MED) within 72 hours of the transfer.",
            "Record the protocol number of every call with your bank.",
            ANTI_RECOVERY_SCAM,
        ],
        pathways: &[
            INSTANT_REFUND,
            INSTITUTION_RESTITUTION,
            SMALL_CLAIMS,
            CENTRAL_BANK_COMPLAINT,
        ],
        windows: INSTANT_WINDOWS,
    },
    CatalogEntry {
        incident_type: IncidentType::FraudulentBill,
        base_rate: 40,
        documents: &[
            DocumentKind::PoliceReportDraft,
            DocumentKind::InstitutionNotification,
            DocumentKind::ConsumerAgencyComplaint,
        ],
        warnings: &[
            "Compare the beneficiary printed on the slip with the company you meant to pay.",
            ANTI_RECOVERY_SCAM,
        ],
        pathways: &[INSTITUTION_RESTITUTION, CONSUMER_MEDIATION, SMALL_CLAIMS],
        windows: &[],
    },
    CatalogEntry {
        incident_type: IncidentType::CardFraud,
        base_rate: 75,
        documents: &[
            DocumentKind::InstitutionNotification,
            DocumentKind::PoliceReportDraft,
            DocumentKind::ConsumerAgencyComplaint,
            DocumentKind::CentralBankComplaint,
        ],
        warnings: &[
            "Block the card in the bank app immediately and request a new number.",
            "Dispute each unrecognized charge individually before the statement due date.",
        ],
        pathways: &[CARD_DISPUTE, INSTITUTION_RESTITUTION, SMALL_CLAIMS],
        windows: &[CHARGEBACK_WINDOW],
    },
    CatalogEntry {
        incident_type: IncidentType::BankImpersonation,
        base_rate: 50,
        documents: &[
            DocumentKind::RegulatorContestation,
            DocumentKind::PoliceReportDraft,
            DocumentKind::InstitutionNotification,
            DocumentKind::CentralBankComplaint,
        ],
        warnings: &[
            "Banks never ask you to transfer money to a 'safe account': report the call number.",
            "Ask your bank to open a refund contestation (MED) within 72 hours of the transfer.",
            ANTI_RECOVERY_SCAM,
        ],
        pathways: &[INSTANT_REFUND, INSTITUTION_RESTITUTION, SMALL_CLAIMS],
        windows: INSTANT_WINDOWS,
    },
    CatalogEntry {
        incident_type: IncidentType::MessagingImpersonation,
        base_rate: 55,
        documents: &[
            DocumentKind::RegulatorContestation,
            DocumentKind::PoliceReportDraft,
            DocumentKind::InstitutionNotification,
        ],
        warnings: &[
            "Warn your contacts that someone is impersonating you or your relative.",
            "Report the impostor's account inside the messaging app.",
        ],
        pathways: &[INSTANT_REFUND, CRIMINAL_INVESTIGATION],
        windows: INSTANT_WINDOWS,
    },
    CatalogEntry {
        incident_type: IncidentType::InvestmentScam,
        base_rate: 20,
        documents: &[
            DocumentKind::PoliceReportDraft,
            DocumentKind::CentralBankComplaint,
            DocumentKind::ConsumerAgencyComplaint,
        ],
        warnings: &[
            "Stop any further deposits, even if the platform demands 'release fees'.",
            ANTI_RECOVERY_SCAM,
        ],
        pathways: &[CRIMINAL_INVESTIGATION, SMALL_CLAIMS, CENTRAL_BANK_COMPLAINT],
        windows: &[],
    },
    CatalogEntry {
        incident_type: IncidentType::OnlinePurchase,
        base_rate: 55,
        documents: &[
            DocumentKind::PoliceReportDraft,
            DocumentKind::ConsumerAgencyComplaint,
            DocumentKind::InstitutionNotification,
        ],
        warnings: &["Open the marketplace dispute before the buyer protection period ends."],
        pathways: &[PLATFORM_PROTECTION, CONSUMER_MEDIATION, SMALL_CLAIMS],
        windows: &[],
    },
    CatalogEntry {
        incident_type: IncidentType::AccountTakeover,
        base_rate: 45,
        documents: &[
            DocumentKind::PoliceReportDraft,
            DocumentKind::InstitutionNotification,
            DocumentKind::CentralBankComplaint,
        ],
        warnings: &[
            "Change your banking and email passwords from a device you trust.",
            "Ask your bank to open a refund contestation (MED) for transfers made by the intruder.",
        ],
        pathways: &[INSTITUTION_RESTITUTION, INSTANT_REFUND, SMALL_CLAIMS],
        windows: INSTANT_WINDOWS,
    },
    CatalogEntry {
        incident_type: IncidentType::DeviceTheft,
        base_rate: 30,
        documents: &[DocumentKind::PoliceReportDraft],
        warnings: &[
            "Ask your carrier to block the line and the device IMEI.",
            "Change banking passwords from another device and block cards registered on the phone.",
        ],
        pathways: &[INSURANCE_CLAIM, INSTITUTION_RESTITUTION],
        windows: &[],
    },
    OTHER,
];
