//! Paginated rendering of assembled documents into a printable artifact.

mod export;
mod layout;

use chrono::NaiveDate;
use serde::Serialize;

use super::documents::{AssembledDocument, DocumentKind};

pub use layout::{wrap_exact, LineClass, PageLayout};

/// One laid-out row. Rows sharing a `source_line` concatenate back to that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub class: LineClass,
    pub text: String,
    pub source_line: usize,
    pub continuation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    pub number: usize,
    pub document: DocumentKind,
    pub header: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedArtifact {
    pub title: String,
    pub layout: PageLayout,
    pub pages: Vec<RenderedPage>,
}

impl RenderedArtifact {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages belonging to one document, in order.
    pub fn pages_for(&self, kind: DocumentKind) -> impl Iterator<Item = &RenderedPage> + '_ {
        self.pages.iter().filter(move |page| page.document == kind)
    }
}

/// Lays documents out on pages with running headers and numbered footers.
#[derive(Debug, Clone)]
pub struct PaginatedRenderer {
    layout: PageLayout,
    brand: String,
}

impl PaginatedRenderer {
    pub fn new(brand: impl Into<String>) -> Self {
        Self::with_layout(brand, PageLayout::a4())
    }

    pub fn with_layout(brand: impl Into<String>, layout: PageLayout) -> Self {
        Self {
            layout,
            brand: brand.into(),
        }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn render(
        &self,
        documents: &[AssembledDocument],
        generated_on: NaiveDate,
    ) -> RenderedArtifact {
        let brand_line = format!(
            "{} | generated on {}",
            self.brand,
            generated_on.format("%d/%m/%Y")
        );
        let mut pages = Vec::new();
        for document in documents {
            self.paginate(document, &brand_line, &mut pages);
        }

        let total = pages.len();
        for (index, page) in pages.iter_mut().enumerate() {
            page.number = index + 1;
            page.footer = format!("Page {} of {}", index + 1, total);
        }

        RenderedArtifact {
            title: self.brand.clone(),
            layout: self.layout,
            pages,
        }
    }

    fn paginate(
        &self,
        document: &AssembledDocument,
        brand_line: &str,
        pages: &mut Vec<RenderedPage>,
    ) {
        let capacity = self.layout.body_height();
        let new_page = || RenderedPage {
            number: 0,
            document: document.kind,
            header: vec![brand_line.to_string(), document.title.clone()],
            rows: Vec::new(),
            footer: String::new(),
        };

        let rows = self.layout_rows(&document.body);
        let mut page = new_page();
        let mut used = 0.0_f32;

        for (index, row) in rows.iter().enumerate() {
            let mut needed = self.layout.row_height(row.class);
            // Keep a heading together with the row that follows it.
            if row.class == LineClass::Heading {
                if let Some(next) = rows.get(index + 1) {
                    needed += self.layout.row_height(next.class);
                }
            }
            if !page.rows.is_empty() && used + needed > capacity {
                pages.push(std::mem::replace(&mut page, new_page()));
                used = 0.0;
            }
            used += self.layout.row_height(row.class);
            page.rows.push(row.clone());
        }
        pages.push(page);
    }

    fn layout_rows(&self, body: &str) -> Vec<RenderedRow> {
        let mut rows = Vec::new();
        for (source_line, line) in body.split('\n').enumerate() {
            let class = LineClass::classify(line);
            let width = self.layout.chars_per_line(class);
            for (chunk_index, text) in wrap_exact(line, width).into_iter().enumerate() {
                rows.push(RenderedRow {
                    class,
                    text,
                    source_line,
                    continuation: chunk_index > 0,
                });
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(kind: DocumentKind, body: String) -> AssembledDocument {
        AssembledDocument {
            kind,
            title: kind.title().to_string(),
            body,
        }
    }

    fn generated_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date")
    }

    fn long_body() -> String {
        let mut lines = vec!["POLICE REPORT DRAFT".to_string(), String::new()];
        for index in 0..120 {
            lines.push(format!(
                "Line {index}: the transfer was made under pressure from a caller who claimed to work for the bank's security team."
            ));
        }
        lines.push("FACTS".to_string());
        lines.push("Short closing line.".to_string());
        lines.join("\n")
    }

    #[test]
    fn rendering_never_loses_content() {
        let body = long_body();
        let renderer = PaginatedRenderer::new("Fraud Recovery Kit");
        let artifact = renderer.render(
            &[document(DocumentKind::PoliceReportDraft, body.clone())],
            generated_on(),
        );
        assert!(artifact.page_count() > 1);

        let source: Vec<&str> = body.split('\n').collect();
        let mut rebuilt = vec![String::new(); source.len()];
        for page in &artifact.pages {
            for row in &page.rows {
                rebuilt[row.source_line].push_str(&row.text);
            }
        }
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn each_document_starts_on_a_fresh_page_with_numbered_footers() {
        let renderer = PaginatedRenderer::new("Fraud Recovery Kit");
        let artifact = renderer.render(
            &[
                document(DocumentKind::PoliceReportDraft, long_body()),
                document(
                    DocumentKind::InstitutionNotification,
                    "EXTRAJUDICIAL NOTICE\n\nTo: Bank".to_string(),
                ),
            ],
            generated_on(),
        );
        let total = artifact.page_count();
        let last = artifact.pages.last().expect("at least one page");
        assert_eq!(last.document, DocumentKind::InstitutionNotification);
        assert_eq!(last.rows[0].text, "EXTRAJUDICIAL NOTICE");
        assert_eq!(last.footer, format!("Page {total} of {total}"));
        assert_eq!(
            last.header,
            vec![
                "Fraud Recovery Kit | generated on 11/03/2025".to_string(),
                DocumentKind::InstitutionNotification.title().to_string()
            ]
        );
        for (index, page) in artifact.pages.iter().enumerate() {
            assert_eq!(page.number, index + 1);
        }
        assert_eq!(
            artifact
                .pages_for(DocumentKind::PoliceReportDraft)
                .count(),
            total - 1
        );
    }

    #[test]
    fn headings_are_not_stranded_at_the_bottom_of_a_page() {
        let renderer = PaginatedRenderer::new("Fraud Recovery Kit");
        let artifact = renderer.render(
            &[document(DocumentKind::PoliceReportDraft, long_body())],
            generated_on(),
        );
        for page in &artifact.pages {
            if let Some(last) = page.rows.last() {
                let is_final_page = page.number == artifact.page_count();
                assert!(last.class != LineClass::Heading || is_final_page);
            }
        }
    }

    #[test]
    fn tiny_pages_still_place_every_row() {
        let layout = PageLayout {
            page_height: 10.0,
            ..PageLayout::a4()
        };
        let renderer = PaginatedRenderer::with_layout("Kit", layout);
        let artifact = renderer.render(
            &[document(
                DocumentKind::PoliceReportDraft,
                "A\nB\nC".to_string(),
            )],
            generated_on(),
        );
        assert_eq!(artifact.page_count(), 3);
    }
}
