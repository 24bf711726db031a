//! PDF audit report renderer.
//!
//! Draws the assembled report bundle into an A4 document with a fixed
//! section sequence: cover, audit context, regulatory profile, executive
//! summary, charts, detailed results, findings, action plan, evidence
//! index, conclusion. Charts that failed to render upstream appear as
//! textual placeholders.

use std::io::Cursor;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex,
};

use conforma_application::{AuditReport, ReportRenderer, ReportRow};
use conforma_core::{AppError, AppResult};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 14.0;
const TITLE_SIZE: f32 = 22.0;
const LINE_HEIGHT: f32 = 5.2;
const CHART_HEIGHT_MM: f32 = 56.0;
const WRAP_COLUMNS: usize = 96;

/// printpdf-backed implementation of the report renderer port.
#[derive(Clone, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    /// Creates a new renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct PageWriter {
    doc: PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn create(title: &str) -> AppResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "body");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|error| AppError::Internal(format!("failed to load font: {error}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|error| AppError::Internal(format!("failed to load font: {error}")))?;

        Ok(Self {
            doc,
            page,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc.get_page(self.page).get_layer(self.layer)
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "body");
            self.page = page;
            self.layer = layer;
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text_line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room(LINE_HEIGHT + size / 4.0);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer()
            .use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= LINE_HEIGHT + size / 4.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(LINE_HEIGHT * 3.0);
        self.y -= LINE_HEIGHT;
        self.text_line(text, HEADING_SIZE, true);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, WRAP_COLUMNS) {
            self.text_line(&line, BODY_SIZE, false);
        }
    }

    fn labelled(&mut self, label: &str, value: &str) {
        self.paragraph(&format!("{label}: {value}"));
    }

    fn blank_line(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn png_image(&mut self, bytes: &[u8]) -> AppResult<()> {
        self.ensure_room(CHART_HEIGHT_MM + LINE_HEIGHT);

        let decoder = PngDecoder::new(Cursor::new(bytes))
            .map_err(|error| AppError::Internal(format!("failed to decode chart PNG: {error}")))?;
        let image = Image::try_from(decoder)
            .map_err(|error| AppError::Internal(format!("failed to embed chart PNG: {error}")))?;

        self.y -= CHART_HEIGHT_MM;
        image.add_to_layer(
            self.layer(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(240.0),
                ..ImageTransform::default()
            },
        );
        self.y -= LINE_HEIGHT;
        Ok(())
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|error| AppError::Internal(format!("failed to serialize PDF: {error}")))
    }
}

fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > columns {
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
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn response_label(row: &ReportRow) -> &'static str {
    match row.response.as_ref().map(|response| response.value) {
        Some(value) => value.as_str(),
        None => "unanswered",
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &AuditReport) -> AppResult<Vec<u8>> {
        let mut writer = PageWriter::create("Audit report")?;

        // Cover.
        writer.y -= 40.0;
        writer.text_line("Regulatory audit report", TITLE_SIZE, true);
        writer.blank_line();
        writer.text_line(report.audit.audit.title(), HEADING_SIZE, false);
        writer.blank_line();
        writer.labelled("Prepared for", &report.requested_by);
        writer.labelled(
            "Generated",
            &report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );

        // Audit context.
        writer.heading("Audit context");
        writer.labelled("Status", report.audit.audit.status().as_str());
        if let Some(site) = &report.site {
            let location = [site.city.as_deref(), site.country.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ");
            writer.labelled("Site", &site.name);
            if !location.is_empty() {
                writer.labelled("Location", &location);
            }
        }
        if let Some(role) = report.audit.audit.economic_role() {
            writer.labelled("Economic role", role);
        }
        if report.role_filter_relaxed {
            writer.paragraph(
                "Note: no questions matched the declared economic role; the questionnaire \
                 covers all roles for the selected scope.",
            );
        }

        // Regulatory profile.
        writer.heading("Regulatory profile");
        if report.referentials.is_empty() {
            writer.paragraph("All referentials in the catalog are in scope.");
        } else {
            for referential in &report.referentials {
                writer.paragraph(&format!("{} - {}", referential.code(), referential.name()));
            }
        }

        // Executive summary.
        let metrics = &report.metrics;
        writer.heading("Executive summary");
        writer.labelled("Applicable questions", &metrics.total_questions.to_string());
        writer.labelled("Answered", &metrics.answered.to_string());
        writer.labelled(
            "Conformity rate",
            &format!("{:.0}%", metrics.conformity_rate * 100.0),
        );
        writer.labelled("Non-compliant", &metrics.non_compliant.to_string());
        writer.labelled("Partially compliant", &metrics.partial.to_string());
        writer.labelled("Overdue actions", &metrics.overdue_actions.to_string());

        // Charts.
        writer.heading("Overview charts");
        for chart in &report.charts {
            match &chart.image_png {
                Some(bytes) => writer.png_image(bytes)?,
                None => {
                    writer.paragraph(&format!("[chart unavailable: {}]", chart.title));
                }
            }
        }

        // Detailed results.
        writer.heading("Detailed results");
        for row in &report.rows {
            let clause = row.question.clause().unwrap_or("-");
            writer.text_line(
                &format!("[{}] {}", clause, response_label(row)),
                BODY_SIZE,
                true,
            );
            writer.paragraph(row.question.text());
            if let Some(comment) = row
                .response
                .as_ref()
                .and_then(|response| response.comment.as_deref())
            {
                writer.paragraph(&format!("Comment: {comment}"));
            }
            writer.blank_line();
        }

        // Findings.
        writer.heading("Findings");
        if report.findings.is_empty() {
            writer.paragraph("No findings were raised during this audit.");
        }
        for finding in &report.findings {
            writer.text_line(
                &format!(
                    "{} [{} / {}]",
                    finding.title,
                    finding.severity.as_str(),
                    finding.status.as_str()
                ),
                BODY_SIZE,
                true,
            );
            if let Some(description) = &finding.description {
                writer.paragraph(description);
            }
            if let Some(clause) = &finding.clause {
                writer.labelled("Clause", clause);
            }
            writer.blank_line();
        }

        // Action plan.
        writer.heading("Action plan");
        if report.actions.is_empty() {
            writer.paragraph("No remediation actions have been planned.");
        }
        for action in &report.actions {
            writer.text_line(
                &format!("{} [{}]", action.description, action.status.as_str()),
                BODY_SIZE,
                false,
            );
            let owner = action.owner.as_deref().unwrap_or("unassigned");
            let due = action
                .due_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "no due date".to_owned());
            writer.paragraph(&format!("Owner: {owner} - due: {due}"));
        }

        // Evidence index.
        writer.heading("Evidence index");
        if report.evidence.is_empty() {
            writer.paragraph("No evidence files were attached.");
        }
        for reference in &report.evidence {
            writer.paragraph(reference);
        }

        // Conclusion.
        writer.heading("Conclusion");
        writer.paragraph(&format!(
            "Out of {} applicable questions, {} were answered with a conformity rate of {:.0}%. \
             {} finding(s) were raised and {} action(s) are overdue.",
            metrics.total_questions,
            metrics.answered,
            metrics.conformity_rate * 100.0,
            report.findings.len(),
            metrics.overdue_actions,
        ));

        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_splits_long_text_and_keeps_short_text() {
        assert_eq!(wrap("short line", 96), vec!["short line".to_owned()]);

        let long = "word ".repeat(60);
        let lines = wrap(&long, 30);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.chars().count() <= 30));
    }

    #[test]
    fn wrap_of_empty_text_yields_one_blank_line() {
        assert_eq!(wrap("", 96), vec![String::new()]);
    }
}
