use super::{LineClass, RenderedArtifact, RenderedPage, RenderedRow};

const PAGE_BREAK: &str = "\u{000C}";

impl RenderedArtifact {
    /// Plain-text rendition: header, rows and footer per page, pages split by form feed.
    pub fn to_plain_text(&self) -> String {
        self.pages
            .iter()
            .map(plain_page)
            .collect::<Vec<_>>()
            .join(&format!("\n{PAGE_BREAK}"))
    }

    /// Self-contained printable HTML with one block per page.
    pub fn to_html(&self) -> String {
        let layout = &self.layout;
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        html.push_str("<style>\n");
        html.push_str(&format!(
            "@page {{ size: {:.2}pt {:.2}pt; margin: 0; }}\n",
            layout.page_width, layout.page_height
        ));
        html.push_str(&format!(
            ".page {{ box-sizing: border-box; width: {:.2}pt; min-height: {:.2}pt; padding: {:.2}pt {:.2}pt {:.2}pt {:.2}pt; page-break-after: always; break-after: page; font-family: serif; font-size: {:.1}pt; }}\n",
            layout.page_width,
            layout.page_height,
            layout.margin_top,
            layout.margin_right,
            layout.margin_bottom,
            layout.margin_left,
            layout.body_font
        ));
        html.push_str(".page:last-child { page-break-after: auto; break-after: auto; }\n");
        html.push_str(&format!(
            "header, footer {{ font-size: {:.1}pt; color: #555; }}\n",
            layout.header_font
        ));
        html.push_str(&format!(
            "h2 {{ font-size: {:.1}pt; margin: 0.6em 0 0.2em; }}\n",
            layout.heading_font
        ));
        html.push_str("p { margin: 0; white-space: pre-wrap; }\nfooter { text-align: center; }\n");
        html.push_str("</style>\n</head>\n<body>\n");

        for page in &self.pages {
            html.push_str(&html_page(page));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn plain_page(page: &RenderedPage) -> String {
    let mut lines: Vec<&str> = page.header.iter().map(String::as_str).collect();
    lines.push("");
    lines.extend(page.rows.iter().map(|row| row.text.as_str()));
    lines.push("");
    lines.push(&page.footer);
    lines.join("\n")
}

fn html_page(page: &RenderedPage) -> String {
    let mut html = format!(
        "<section class=\"page\" data-page=\"{}\">\n<header>\n",
        page.number
    );
    for line in &page.header {
        html.push_str(&format!("<div>{}</div>\n", escape_html(line)));
    }
    html.push_str("</header>\n<main>\n");
    for row in &page.rows {
        html.push_str(&html_row(row));
        html.push('\n');
    }
    html.push_str(&format!(
        "</main>\n<footer>{}</footer>\n</section>\n",
        escape_html(&page.footer)
    ));
    html
}

fn html_row(row: &RenderedRow) -> String {
    match row.class {
        LineClass::Rule => "<hr>".to_string(),
        LineClass::Blank => "<p>&nbsp;</p>".to_string(),
        LineClass::Heading => format!("<h2>{}</h2>", escape_html(&row.text)),
        LineClass::Label if !row.continuation => match row.text.split_once(':') {
            Some((label, value)) => format!(
                "<p><strong>{}:</strong>{}</p>",
                escape_html(label),
                escape_html(value)
            ),
            None => format!("<p>{}</p>", escape_html(&row.text)),
        },
        LineClass::Label | LineClass::Body => format!("<p>{}</p>", escape_html(&row.text)),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
