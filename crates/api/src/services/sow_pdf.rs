//! Statement of Work rendering.
//!
//! Letter-size document with a header and five numbered sections: client
//! information, selected modules, timeline, terms, signatures. Layout is a
//! simple top-down cursor that starts a new page when it runs out of room.

use chrono::{Duration, NaiveDate};
use onboard_core::status::{ModuleType, ProjectStatus};
use onboard_core::types::DbId;
use onboard_db::models::company::Company;
use onboard_db::models::contact::Contact;
use onboard_db::models::module::ProjectModules;
use onboard_db::models::project::Project;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};

use crate::error::{AppError, AppResult};
use crate::services::tenant::{require_project_access, TenantContext};
use crate::state::AppState;

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 20.0;
const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 13.0;
const TITLE_SIZE: f32 = 20.0;
/// Millimetres per point.
const PT_TO_MM: f32 = 0.3528;

const TERMS: &[&str] = &[
    "Scope. The provider will configure and deploy the modules listed in Section 2 according \
     to the requirements captured during onboarding. Work outside that scope requires a \
     written change request.",
    "Client responsibilities. The client will supply timely access to subject matter experts, \
     sample data, and the documents requested in the onboarding checklist.",
    "Timeline. Dates in Section 3 are estimates and move with the completion of checklist \
     items and the availability of client resources.",
    "Acceptance. Each module is accepted when it operates as described in its requirements \
     in the client's production environment, or ten business days after go-live without a \
     reported defect.",
    "Confidentiality. Both parties will treat information exchanged under this SOW as \
     confidential and use it only to perform this engagement.",
];

/// Everything printed on the SOW.
#[derive(Debug, Clone)]
pub struct SowData {
    pub project: Project,
    pub company: Company,
    pub primary_contact: Option<Contact>,
    pub modules: ProjectModules,
    pub provider_name: String,
}

/// Builtin fonts only cover Latin-1; anything else prints as `?`.
fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Greedy word wrap by an average glyph width.
fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * 0.5 * PT_TO_MM)) as usize).max(10);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct Cursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Cursor {
    fn new(title: &str) -> Result<Self, printpdf::Error> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "page 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("page {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.45
    }

    fn text_at(&mut self, x: f32, text: &str, size: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(pdf_text(text), size, Mm(MARGIN + x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        self.y -= height;
        self.text_at(0.0, text, size, bold);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, BODY_SIZE, PAGE_WIDTH - 2.0 * MARGIN) {
            self.line(&line, BODY_SIZE, false);
        }
        self.gap(2.0);
    }

    fn field(&mut self, label: &str, value: &str) {
        let height = Self::line_height(BODY_SIZE);
        self.ensure_space(height);
        self.y -= height;
        self.text_at(0.0, label, BODY_SIZE, true);
        self.text_at(45.0, value, BODY_SIZE, false);
    }

    /// One table row; `columns` are `(x offset, text)`.
    fn row(&mut self, columns: &[(f32, &str)], bold: bool) {
        let height = Self::line_height(BODY_SIZE);
        self.ensure_space(height);
        self.y -= height;
        for (x, text) in columns {
            self.text_at(*x, text, BODY_SIZE, bold);
        }
    }

    fn rule(&mut self) {
        self.gap(1.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(line);
        self.gap(1.5);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(Self::line_height(HEADING_SIZE) + 3.0 * Self::line_height(BODY_SIZE));
        self.gap(4.0);
        self.line(text, HEADING_SIZE, true);
        self.rule();
    }

    fn finish(self) -> Result<Vec<u8>, printpdf::Error> {
        self.doc.save_to_bytes()
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

fn address(company: &Company) -> String {
    [
        company.address_line1.as_deref(),
        company.address_line2.as_deref(),
        company.city.as_deref(),
        company.state.as_deref(),
        company.postal_code.as_deref(),
        company.country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

fn module_summary(modules: &ProjectModules, module: ModuleType) -> String {
    let volume = |v: Option<i32>| v.map(|n| n.to_string()).unwrap_or_else(|| "n/a".into());
    match module {
        ModuleType::Core => modules.core.as_ref().map(|c| {
            format!(
                "{} claims/month, {} users, current system: {}, data migration: {}",
                volume(c.monthly_claim_volume),
                volume(c.user_count),
                or_dash(c.current_system.as_deref()),
                if c.requires_data_migration { "yes" } else { "no" }
            )
        }),
        ModuleType::Comms => modules.comms.as_ref().map(|c| {
            format!(
                "channels: {}, {} messages/month, two-way SMS: {}",
                if c.channels.is_empty() { "-".to_string() } else { c.channels.join(", ") },
                volume(c.monthly_message_volume),
                if c.requires_two_way_sms { "yes" } else { "no" }
            )
        }),
        ModuleType::Fnol => modules.fnol.as_ref().map(|c| {
            format!(
                "intake: {}, {} FNOLs/month, photo upload: {}, after hours: {}",
                if c.intake_channels.is_empty() { "-".to_string() } else { c.intake_channels.join(", ") },
                volume(c.monthly_fnol_volume),
                if c.requires_photo_upload { "yes" } else { "no" },
                if c.after_hours_coverage { "yes" } else { "no" }
            )
        }),
    }
    .unwrap_or_else(|| "Requirements to be confirmed".into())
}

/// `(phase, status it corresponds to, target date)` rows.
fn timeline(project: &Project) -> Vec<(&'static str, ProjectStatus, String)> {
    let start: NaiveDate = project.created_at.date_naive();
    let week = |n: i64| (start + Duration::weeks(n)).format("%b %d, %Y").to_string();
    let go_live = project
        .target_go_live_date
        .map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "To be agreed".into());
    vec![
        ("Discovery", ProjectStatus::DiscoveryInProgress, week(2)),
        ("Statement of Work", ProjectStatus::SowPending, week(3)),
        ("Contract", ProjectStatus::ContractSigned, week(4)),
        ("Configuration & onboarding", ProjectStatus::Onboarding, week(10)),
        ("Go-live", ProjectStatus::Live, go_live),
    ]
}

/// Render the SOW to PDF bytes.
pub fn render(data: &SowData) -> Result<Vec<u8>, printpdf::Error> {
    let project = &data.project;
    let company = &data.company;
    let mut pdf = Cursor::new(&format!("Statement of Work - {}", company.legal_name))?;

    pdf.line("Statement of Work", TITLE_SIZE, true);
    pdf.line(&data.provider_name, BODY_SIZE, false);
    pdf.line(
        &format!(
            "Project #{} | Prepared {} | Status: {}",
            project.id,
            project.created_at.format("%B %d, %Y"),
            project.status.label()
        ),
        BODY_SIZE,
        false,
    );
    pdf.rule();

    pdf.heading("1. Client Information");
    pdf.field("Legal name", &company.legal_name);
    pdf.field("Trade name", or_dash(company.trade_name.as_deref()));
    pdf.field("Address", or_dash(Some(&address(company))));
    pdf.field("Company size", company.size.as_str());
    pdf.field(
        "Lines of business",
        or_dash(Some(&company.lines_of_business.join(", "))),
    );
    pdf.field("Website", or_dash(company.website.as_deref()));
    match &data.primary_contact {
        Some(contact) => {
            pdf.field("Primary contact", &contact.full_name());
            pdf.field("Email", &contact.email);
            pdf.field("Phone", or_dash(contact.phone.as_deref()));
        }
        None => pdf.field("Primary contact", "-"),
    }

    pdf.heading("2. Selected Modules");
    let selected = data.modules.selected();
    if selected.is_empty() {
        pdf.paragraph("No modules selected.");
    }
    for module in selected {
        pdf.line(module.label(), BODY_SIZE, true);
        pdf.paragraph(&module_summary(&data.modules, module));
    }

    pdf.heading("3. Timeline");
    pdf.row(&[(0.0, "Phase"), (75.0, "Target"), (125.0, "Progress")], true);
    for (phase, status, target) in timeline(project) {
        let progress = if project.status == status {
            "Current"
        } else if project.status != ProjectStatus::Churned
            && ProjectStatus::ALL.iter().position(|s| *s == status)
                < ProjectStatus::ALL.iter().position(|s| *s == project.status)
        {
            "Done"
        } else {
            ""
        };
        pdf.row(&[(0.0, phase), (75.0, target.as_str()), (125.0, progress)], false);
    }

    pdf.heading("4. Terms");
    for (index, term) in TERMS.iter().enumerate() {
        pdf.paragraph(&format!("4.{} {term}", index + 1));
    }

    pdf.heading("5. Signatures");
    let client_signature = match project.sow_signed_at {
        Some(at) => format!("Approved electronically on {}", at.format("%B %d, %Y %H:%M UTC")),
        None => "Signature: ______________________________".to_string(),
    };
    pdf.line(&format!("Client: {}", company.legal_name), BODY_SIZE, true);
    pdf.line(&client_signature, BODY_SIZE, false);
    pdf.line("Date: ____________________", BODY_SIZE, false);
    pdf.gap(6.0);
    pdf.line(&format!("Provider: {}", data.provider_name), BODY_SIZE, true);
    pdf.line("Signature: ______________________________", BODY_SIZE, false);
    pdf.line("Date: ____________________", BODY_SIZE, false);

    pdf.finish()
}

/// Gather the project's data and render its SOW. Returns the suggested file
/// name and the PDF bytes.
pub async fn render_for_project(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<(String, Vec<u8>)> {
    let project = require_project_access(&state.repos, context, project_id).await?;
    let company = state
        .repos
        .companies
        .find_by_id(project.company_id)
        .await?
        .ok_or(AppError::Core(onboard_core::error::CoreError::NotFound {
            entity: "Company",
            id: project.company_id,
        }))?;
    let primary_contact = state.repos.contacts.find_primary(company.id).await?;
    let modules = state.repos.modules.get_for_project(project_id).await?;

    let data = SowData {
        project,
        company,
        primary_contact,
        modules,
        provider_name: state.config.app_name.clone(),
    };
    let bytes = render(&data).map_err(|e| AppError::InternalError(format!("SOW rendering failed: {e}")))?;
    let file_name = format!(
        "sow-{}-{}.pdf",
        onboard_core::uploads::sanitize_file_name(&data.company.legal_name).to_lowercase(),
        project_id
    );
    Ok((file_name, bytes))
}
