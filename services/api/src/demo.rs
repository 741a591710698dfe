use crate::infra::{ConfiguredGateway, InMemorySessionRepository, LoggingMailer, SandboxGateway};
use chrono::{Local, NaiveDateTime};
use clap::Args;
use fraud_recovery::error::AppError;
use fraud_recovery::workflows::delivery::{
    DeliverySettings, DeliveryView, DeliveryWorkflow, ExportFormat, PaymentWatcher, PollOutcome,
};
use fraud_recovery::workflows::diagnostic::{DiagnosticEngine, DiagnosticResult};
use fraud_recovery::workflows::intake::{
    CaseIntakeGuard, CaseProgress, CaseSubmission, CounterpartDetails, IncidentSubmission,
    InstitutionSubmission, MoneyAmount, PersonSubmission,
};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DiagnoseArgs {
    /// JSON case file in the intake form layout
    #[arg(long = "case")]
    pub(crate) case_file: PathBuf,
    /// Evaluate as of this instant (YYYY-MM-DDTHH:MM). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_datetime)]
    pub(crate) now: Option<NaiveDateTime>,
    /// Print the raw JSON result instead of the summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Write the unlocked documents here; `.html` gives the printable layout, anything else plain text
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Poll cadence for the sandbox settlement check, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub(crate) poll_ms: u64,
}

pub(crate) fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let DiagnoseArgs {
        case_file,
        now,
        json,
    } = args;

    let raw = std::fs::read_to_string(&case_file)?;
    let submission: CaseSubmission = serde_json::from_str(&raw).map_err(IoError::from)?;
    let now = now.unwrap_or_else(|| Local::now().naive_local());
    let case = CaseIntakeGuard::default().validate(submission, now)?;
    let result = DiagnosticEngine::default().diagnose(&case, now);

    if json {
        let rendered = serde_json::to_string_pretty(&result).map_err(IoError::from)?;
        println!("{rendered}");
    } else {
        render_diagnostic(&result);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { output, poll_ms } = args;
    let now = Local::now().naive_local();

    println!("Fraud recovery demo (sandbox processor)");
    let mailer = Arc::new(LoggingMailer::default());
    let workflow = Arc::new(DeliveryWorkflow::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(ConfiguredGateway::Sandbox(SandboxGateway::new(
            chrono::Duration::seconds(1),
        ))),
        Arc::clone(&mailer),
        DeliverySettings {
            brand: "Fraud Recovery Kit".to_string(),
            product_code: "fraud-kit-complete".to_string(),
            price: MoneyAmount::from_cents(4990),
        },
    ));

    let submission = demo_submission(now);
    let case = CaseIntakeGuard::default().validate(submission.clone(), now)?;
    render_diagnostic(&DiagnosticEngine::default().diagnose(&case, now));

    let session = workflow.draft(submission, now)?;
    println!("\nDrafted session {} ({} documents)", session.id, session.documents.len());
    render_view(&workflow.view_of(&session));

    let session = workflow.request_payment(&session.id, now).await?;
    let view = workflow.view_of(&session);
    if let Some(payment) = &view.payment {
        println!(
            "\nPayment requested: {} due, reference {}",
            view.amount_due_display, payment.reference
        );
        println!("  Scan: {}", payment.qr_code_payload);
        println!("  Copy and paste: {}", payment.copy_paste_code);
    }

    let watcher = PaymentWatcher::spawn(
        Arc::clone(&workflow),
        session.id.clone(),
        Duration::from_millis(poll_ms.max(1)),
        || Local::now().naive_local(),
    );
    let mut outcome = watcher.subscribe();
    let settled = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if let Some(result) = *outcome.borrow_and_update() {
                if result != PollOutcome::Pending {
                    return Some(result);
                }
            }
            if outcome.changed().await.is_err() {
                return None;
            }
        }
    })
    .await
    .ok()
    .flatten();

    match settled {
        Some(PollOutcome::Settled { state }) => println!("Payment settled, session {state}"),
        Some(other) => {
            println!("Payment did not settle: {other:?}");
            return Ok(());
        }
        None => {
            println!("Payment did not settle within 30 seconds");
            return Ok(());
        }
    }

    let view = workflow.view(&session.id)?;
    render_view(&view);
    println!("E-mails queued: {}", mailer.sent().len());

    match output {
        Some(path) => {
            let format = export_format_for(&path);
            let export = workflow.export(&session.id, format)?;
            std::fs::write(&path, export.body)?;
            println!(
                "Wrote {} ({}) to {}",
                export.file_name,
                export.content_type,
                path.display()
            );
        }
        None => {
            let export = workflow.export(&session.id, ExportFormat::Clipboard)?;
            println!("\n{}", export.body);
        }
    }

    Ok(())
}

fn export_format_for(path: &Path) -> ExportFormat {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.essence_str() == "text/html" => ExportFormat::Html,
        _ => ExportFormat::Text,
    }
}

fn demo_submission(now: NaiveDateTime) -> CaseSubmission {
    let occurred = now - chrono::Duration::hours(6);
    CaseSubmission {
        person: PersonSubmission {
            full_name: "Maria Aparecida Souza".to_string(),
            national_id: "529.982.247-25".to_string(),
            address: Some("Rua das Flores, 120, Campinas/SP".to_string()),
            phone: Some("(19) 99876-5432".to_string()),
            email: "maria.souza@example.com".to_string(),
        },
        incident: IncidentSubmission {
            incident_type: "real_time_payment".to_string(),
            occurred_on: Some(occurred.format("%Y-%m-%d").to_string()),
            occurred_at: Some(occurred.format("%H:%M").to_string()),
            description: "A caller posing as my bank's security desk told me my account was compromised and had me send my savings by Pix to a 'safe account'.".to_string(),
            loss_amount: Some(3000.0),
            counterpart: CounterpartDetails {
                name: Some("J. Silva Servicos".to_string()),
                payment_key: Some("silva.servicos@pix.example".to_string()),
                account: None,
                institution: Some("Banco Destino".to_string()),
            },
            reference_numbers: Vec::new(),
        },
        institution: Some(InstitutionSubmission {
            name: "Banco Exemplo S.A.".to_string(),
            branch: Some("0001".to_string()),
            account: Some("12345-6".to_string()),
        }),
        progress: CaseProgress::default(),
    }
}

pub(crate) fn render_diagnostic(result: &DiagnosticResult) {
    println!("\nDiagnostic: {}", result.incident_label);
    println!(
        "Estimated recovery: {}% ({})",
        result.probability, result.category_label
    );
    println!("Deadline: {}", result.deadline_description);

    println!("\nScore components");
    for component in &result.components {
        println!("- {:+} {}", component.score, component.notes);
    }

    println!("\nRecovery pathways");
    for pathway in &result.pathways {
        let availability = if pathway.available { "open" } else { "closed" };
        println!(
            "- {} ({}%, {}): {}",
            pathway.name, pathway.probability, availability, pathway.rationale
        );
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings");
        for warning in &result.warnings {
            println!("- {}", warning);
        }
    }
    println!("\n{}", result.disclaimer);
}

fn render_view(view: &DeliveryView) {
    println!(
        "State: {} | {} | documents {}",
        view.state_label,
        if view.locked { "locked" } else { "unlocked" },
        view.documents.len()
    );
    for document in &view.documents {
        println!("  - {}", document.title);
    }
    if let Some(guide) = &view.guide {
        println!("Filing guide");
        for step in &guide.steps {
            println!("  {}. {}: {}", step.order, step.label, step.instructions);
        }
    }
}
