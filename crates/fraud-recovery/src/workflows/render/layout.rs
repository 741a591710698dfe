use serde::Serialize;

const MAX_HEADING_CHARS: usize = 60;
const MAX_LABEL_CHARS: usize = 40;

/// Visual class of a source line. Classification only affects styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineClass {
    Rule,
    Blank,
    Heading,
    Label,
    Body,
}

impl LineClass {
    pub fn classify(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Blank;
        }
        if is_rule(trimmed) {
            return Self::Rule;
        }
        if is_heading(trimmed) {
            return Self::Heading;
        }
        if is_label(trimmed) {
            return Self::Label;
        }
        Self::Body
    }
}

fn is_rule(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) if matches!(first, '-' | '=' | '_' | '*') => {
            trimmed.chars().count() >= 3 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

fn is_heading(trimmed: &str) -> bool {
    if trimmed.chars().count() > MAX_HEADING_CHARS || trimmed.starts_with("R$") {
        return false;
    }
    if !trimmed.chars().next().is_some_and(char::is_alphabetic) {
        return false;
    }
    !trimmed.chars().any(char::is_lowercase)
}

fn is_label(trimmed: &str) -> bool {
    let Some((label, rest)) = trimmed.split_once(':') else {
        return false;
    };
    let label_chars = label.chars().count();
    (1..=MAX_LABEL_CHARS).contains(&label_chars)
        && label.chars().next().is_some_and(char::is_alphabetic)
        && (rest.is_empty() || rest.starts_with(' '))
}

/// Page geometry in points plus per-class font sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub body_font: f32,
    pub heading_font: f32,
    pub header_font: f32,
    pub line_spacing: f32,
    /// Space between the running header/footer and the content area.
    pub band_gap: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageLayout {
    pub fn a4() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin_top: 56.69,
            margin_bottom: 56.69,
            margin_left: 56.69,
            margin_right: 56.69,
            body_font: 11.0,
            heading_font: 13.0,
            header_font: 9.0,
            line_spacing: 1.35,
            band_gap: 12.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margin_left - self.margin_right).max(0.0)
    }

    pub fn font_size(&self, class: LineClass) -> f32 {
        match class {
            LineClass::Heading => self.heading_font,
            _ => self.body_font,
        }
    }

    /// Characters that fit on one row, estimating glyph width as half the font size.
    pub fn chars_per_line(&self, class: LineClass) -> usize {
        let glyph = (self.font_size(class) * 0.5).max(0.1);
        ((self.content_width() / glyph).floor() as usize).max(1)
    }

    pub fn row_height(&self, class: LineClass) -> f32 {
        self.font_size(class) * self.line_spacing
    }

    fn header_height(&self) -> f32 {
        2.0 * self.header_font * self.line_spacing + self.band_gap
    }

    fn footer_height(&self) -> f32 {
        self.header_font * self.line_spacing + self.band_gap
    }

    /// Vertical space available for content rows on one page.
    pub fn body_height(&self) -> f32 {
        self.page_height
            - self.margin_top
            - self.margin_bottom
            - self.header_height()
            - self.footer_height()
    }
}

/// Split `line` into chunks of at most `width` characters, preferring to break after a
/// space. Concatenating the chunks yields `line` exactly; words longer than `width` are
/// hard-split.
pub fn wrap_exact(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= width {
        return vec![line.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while chars.len() - start > width {
        let window = &chars[start..start + width];
        let cut = match window.iter().rposition(|c| *c == ' ') {
            Some(space) if space > 0 => space + 1,
            _ => width,
        };
        chunks.push(chars[start..start + cut].iter().collect());
        start += cut;
    }
    chunks.push(chars[start..].iter().collect());
    chunks
}
