use chrono::NaiveDate;

use super::DocumentKind;
use crate::workflows::intake::{CaseRecord, InstitutionDetails};

/// Marker written wherever the case has no value for a field.
pub const NOT_INFORMED: &str = "[NOT INFORMED]";

pub const FOOTER_DISCLAIMER: &str = "Draft template prepared from information supplied by the claimant. It is not legal advice; review every statement before filing.";

const FOOTER_RULE: &str = "------------------------------------------------------------";
const SIGNATURE_LINE: &str = "Signature: ______________________________";

const LIABILITY_GROUNDS: &str = "Under article 14 of the Consumer Protection Code and Superior Court of Justice precedent 479, financial institutions are strictly liable for damages caused by fraud committed by third parties in banking operations.";

/// Everything a template may read. Templates are pure functions of this value.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub case: &'a CaseRecord,
    pub generated_on: NaiveDate,
    pub demands: &'a [String],
}

pub(super) fn render(kind: DocumentKind, context: &TemplateContext<'_>) -> String {
    match kind {
        DocumentKind::RegulatorContestation => regulator_contestation(context),
        DocumentKind::PoliceReportDraft => police_report_draft(context),
        DocumentKind::InstitutionNotification => institution_notification(context),
        DocumentKind::CentralBankComplaint => central_bank_complaint(context),
        DocumentKind::ConsumerAgencyComplaint => consumer_agency_complaint(context),
    }
}

/// Demands used when the caller does not supply its own list.
pub fn default_demands(kind: DocumentKind, case: &CaseRecord) -> Vec<String> {
    let amount = case
        .incident
        .loss_amount
        .map(|amount| amount.to_string())
        .unwrap_or_else(|| "the full amount lost".to_string());
    match kind {
        DocumentKind::RegulatorContestation => vec![
            "Open a special refund (MED) contestation for the transaction described above.".into(),
            "Block any balance still available in the receiving account.".into(),
            format!("Return {amount} to my account."),
            "Send me the protocol number and the outcome of the analysis in writing.".into(),
        ],
        DocumentKind::PoliceReportDraft => vec![
            "Register this report and open an investigation into the facts described.".into(),
            "Request from the institutions involved the identification of the holder of the receiving account.".into(),
            "Provide a copy of this report for submission to my bank.".into(),
        ],
        DocumentKind::InstitutionNotification => vec![
            format!("Refund {amount} debited from my account, with monetary correction."),
            "Provide a copy of the security logs for the disputed transaction.".into(),
            "Answer this notice in writing within 10 (ten) days.".into(),
        ],
        DocumentKind::CentralBankComplaint => vec![
            "Record this complaint against the institution named above.".into(),
            "Require the institution to provide a formal written answer.".into(),
            "Verify the institution's compliance with the instant payment refund rules.".into(),
        ],
        DocumentKind::ConsumerAgencyComplaint => vec![
            "Notify the company to answer this complaint.".into(),
            format!("Refund of {amount}."),
            "Compensation for damages as provided in the Consumer Protection Code.".into(),
        ],
    }
}

fn regulator_contestation(context: &TemplateContext<'_>) -> String {
    let case = context.case;
    let mut sheet = Sheet::new(DocumentKind::RegulatorContestation);
    sheet.field(
        "To",
        Some(
            format!(
                "Fraud and disputes department, {}",
                institution_name(case.institution.as_ref())
            )
            .as_str(),
        ),
    );
    claimant(&mut sheet, case);
    account(&mut sheet, "ACCOUNT DEBITED", case.institution.as_ref());
    transaction(&mut sheet, case);
    counterpart(&mut sheet, "RECEIVING ACCOUNT", case);
    facts(&mut sheet, case);
    sheet.heading("REQUESTS");
    sheet.numbered(context.demands);
    sheet.finish(context.generated_on)
}

fn police_report_draft(context: &TemplateContext<'_>) -> String {
    let case = context.case;
    let mut sheet = Sheet::new(DocumentKind::PoliceReportDraft);
    sheet.field("To", Some("Civil Police, online police station"));
    sheet.field("Nature of the incident", Some(case.incident.incident_type.label()));
    claimant(&mut sheet, case);
    transaction(&mut sheet, case);
    counterpart(&mut sheet, "SUSPECT", case);
    account(&mut sheet, "FINANCIAL INSTITUTION", case.institution.as_ref());
    sheet.field(
        "Institution protocol",
        case.progress.institution_protocol.as_deref(),
    );
    facts(&mut sheet, case);
    sheet.heading("REQUESTS");
    sheet.numbered(context.demands);
    sheet.blank();
    sheet.paragraph("I declare, under the penalties of the law, that the information above is true.");
    sheet.finish(context.generated_on)
}

fn institution_notification(context: &TemplateContext<'_>) -> String {
    let case = context.case;
    let mut sheet = Sheet::new(DocumentKind::InstitutionNotification);
    sheet.field("To", Some(institution_name(case.institution.as_ref())));
    claimant(&mut sheet, case);
    account(&mut sheet, "ACCOUNT", case.institution.as_ref());
    transaction(&mut sheet, case);
    counterpart(&mut sheet, "DESTINATION OF THE FUNDS", case);
    facts(&mut sheet, case);
    sheet.heading("LEGAL GROUNDS");
    sheet.paragraph(LIABILITY_GROUNDS);
    sheet.heading("DEMANDS");
    sheet.numbered(context.demands);
    sheet.finish(context.generated_on)
}

fn central_bank_complaint(context: &TemplateContext<'_>) -> String {
    let case = context.case;
    let mut sheet = Sheet::new(DocumentKind::CentralBankComplaint);
    sheet.field("To", Some("Central Bank of Brazil, citizen complaint service"));
    claimant(&mut sheet, case);
    account(&mut sheet, "INSTITUTION COMPLAINED ABOUT", case.institution.as_ref());
    transaction(&mut sheet, case);
    sheet.heading("PRIOR CONTACT");
    sheet.field(
        "Institution protocol",
        case.progress.institution_protocol.as_deref(),
    );
    sheet.field(
        "Police report number",
        case.progress.police_report_number.as_deref(),
    );
    facts(&mut sheet, case);
    sheet.heading("REQUESTS");
    sheet.numbered(context.demands);
    sheet.finish(context.generated_on)
}

fn consumer_agency_complaint(context: &TemplateContext<'_>) -> String {
    let case = context.case;
    let mut sheet = Sheet::new(DocumentKind::ConsumerAgencyComplaint);
    sheet.field("To", Some("Consumer protection agency"));
    claimant(&mut sheet, case);
    account(&mut sheet, "COMPANY", case.institution.as_ref());
    transaction(&mut sheet, case);
    facts(&mut sheet, case);
    sheet.heading("LEGAL GROUNDS");
    sheet.paragraph(LIABILITY_GROUNDS);
    sheet.heading("REQUESTS");
    sheet.numbered(context.demands);
    sheet.finish(context.generated_on)
}

fn claimant(sheet: &mut Sheet, case: &CaseRecord) {
    let person = &case.person;
    sheet.heading("CLAIMANT");
    sheet.field("Name", Some(person.full_name.as_str()));
    sheet.field("National ID (CPF)", Some(person.national_id.as_str()));
    sheet.field("Address", person.address.as_deref());
    sheet.field("Phone", person.phone.as_deref());
    sheet.field("Email", Some(person.email.as_str()));
}

fn account(sheet: &mut Sheet, heading: &str, institution: Option<&InstitutionDetails>) {
    sheet.heading(heading);
    sheet.field("Institution", institution.map(|details| details.name.as_str()));
    sheet.field(
        "Branch",
        institution.and_then(|details| details.branch.as_deref()),
    );
    sheet.field(
        "Account",
        institution.and_then(|details| details.account.as_deref()),
    );
}

fn transaction(sheet: &mut Sheet, case: &CaseRecord) {
    let incident = &case.incident;
    sheet.heading("TRANSACTION");
    sheet.field(
        "Date",
        incident
            .occurred_on
            .map(|date| date.format("%d/%m/%Y").to_string())
            .as_deref(),
    );
    sheet.field(
        "Time",
        incident
            .occurred_at
            .map(|time| time.format("%H:%M").to_string())
            .as_deref(),
    );
    sheet.field(
        "Amount",
        incident
            .loss_amount
            .map(|amount| amount.to_string())
            .as_deref(),
    );
    let references = incident.reference_numbers.join(", ");
    sheet.field(
        "Reference numbers",
        Some(references.as_str()).filter(|value| !value.is_empty()),
    );
}

fn counterpart(sheet: &mut Sheet, heading: &str, case: &CaseRecord) {
    let counterpart = &case.incident.counterpart;
    sheet.heading(heading);
    sheet.field("Name", counterpart.name.as_deref());
    sheet.field("Payment key or code", counterpart.payment_key.as_deref());
    sheet.field("Institution", counterpart.institution.as_deref());
    sheet.field("Account", counterpart.account.as_deref());
}

fn facts(sheet: &mut Sheet, case: &CaseRecord) {
    sheet.heading("FACTS");
    sheet.narrative(&case.incident.description);
}

fn institution_name(institution: Option<&InstitutionDetails>) -> &str {
    institution
        .map(|details| details.name.as_str())
        .unwrap_or(NOT_INFORMED)
}

/// Line accumulator shared by the templates.
struct Sheet {
    lines: Vec<String>,
}

impl Sheet {
    fn new(kind: DocumentKind) -> Self {
        Self {
            lines: vec![kind.title().to_string(), String::new()],
        }
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| !line.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn heading(&mut self, text: &str) {
        self.blank();
        self.lines.push(text.to_string());
    }

    fn field(&mut self, label: &str, value: Option<&str>) {
        let value = value
            .map(inline)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| NOT_INFORMED.to_string());
        self.lines.push(format!("{label}: {value}"));
    }

    fn paragraph(&mut self, text: &str) {
        self.lines.push(inline(text));
    }

    /// Free text keeps its line structure; decorative `=` rules are dropped so a
    /// narrative can never be mistaken for a bundle separator.
    fn narrative(&mut self, text: &str) {
        let mut pushed = false;
        for line in text.lines() {
            let line = line.trim_end();
            if line.len() >= 3 && line.chars().all(|c| c == '=') {
                continue;
            }
            self.lines.push(line.to_string());
            pushed = true;
        }
        if !pushed {
            self.lines.push(NOT_INFORMED.to_string());
        }
    }

    fn numbered(&mut self, items: &[String]) {
        for (index, item) in items.iter().enumerate() {
            self.lines.push(format!("{}. {}", index + 1, inline(item)));
        }
    }

    fn finish(mut self, generated_on: NaiveDate) -> String {
        self.blank();
        self.lines.push(SIGNATURE_LINE.to_string());
        self.lines.push(String::new());
        self.lines.push(FOOTER_RULE.to_string());
        self.lines.push(format!(
            "Generated on {}.",
            generated_on.format("%d/%m/%Y")
        ));
        self.lines.push(FOOTER_DISCLAIMER.to_string());
        self.lines.join("\n")
    }
}

fn inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::{
        CaseProgress, CounterpartDetails, IncidentDetails, IncidentType, NationalId,
        PersonDetails,
    };

    fn device_theft_case() -> CaseRecord {
        CaseRecord {
            person: PersonDetails {
                full_name: "João   Lima".to_string(),
                national_id: NationalId::parse("111.444.777-35").expect("valid cpf"),
                address: None,
                phone: None,
                email: "joao@example.com".to_string(),
            },
            incident: IncidentDetails {
                incident_type: IncidentType::DeviceTheft,
                occurred_on: None,
                occurred_at: None,
                description: "My phone was stolen on the bus.\n====\nThe thief tried to open my bank app.".to_string(),
                loss_amount: None,
                counterpart: CounterpartDetails::default(),
                reference_numbers: Vec::new(),
            },
            institution: None,
            progress: CaseProgress::default(),
        }
    }

    fn context<'a>(case: &'a CaseRecord, demands: &'a [String]) -> TemplateContext<'a> {
        TemplateContext {
            case,
            generated_on: NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date"),
            demands,
        }
    }

    #[test]
    fn missing_fields_render_not_informed() {
        let case = device_theft_case();
        let demands = default_demands(DocumentKind::PoliceReportDraft, &case);
        let body = police_report_draft(&context(&case, &demands));
        assert!(body.contains("Name: João Lima"));
        assert!(body.contains(&format!("Institution: {NOT_INFORMED}")));
        assert!(body.contains(&format!("Account: {NOT_INFORMED}")));
        assert!(body.contains(&format!("Date: {NOT_INFORMED}")));
        assert!(body.contains(&format!("Amount: {NOT_INFORMED}")));
    }

    #[test]
    fn narrative_drops_separator_like_lines() {
        let case = device_theft_case();
        let body = police_report_draft(&context(&case, &[]));
        assert!(body.contains("My phone was stolen on the bus.\nThe thief tried"));
        assert!(!body.contains("===="));
    }

    #[test]
    fn default_demands_mention_the_loss_when_known() {
        let mut case = device_theft_case();
        let generic = default_demands(DocumentKind::InstitutionNotification, &case);
        assert!(generic[0].contains("the full amount lost"));
        case.incident.loss_amount =
            Some(crate::workflows::intake::MoneyAmount::from_reais(1500));
        let specific = default_demands(DocumentKind::InstitutionNotification, &case);
        assert!(specific[0].contains("R$ 1.500,00"));
    }

    #[test]
    fn every_template_ends_with_the_canonical_footer() {
        let case = device_theft_case();
        for kind in DocumentKind::ordered() {
            let demands = default_demands(kind, &case);
            let body = render(kind, &context(&case, &demands));
            assert!(body.starts_with(kind.title()));
            assert!(body.ends_with(&format!(
                "{FOOTER_RULE}\nGenerated on 11/03/2025.\n{FOOTER_DISCLAIMER}"
            )));
            assert!(!body.contains('{') && !body.contains('}'));
        }
    }
}
