//! Plain-text tables for terminal output.

use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct TextTable {
    title: Option<String>,
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Columns default to left alignment.
    pub fn new<I, H>(headers: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect::<Vec<_>>();
        let aligns = vec![Align::Left; headers.len()];
        Self {
            title: None,
            headers,
            aligns,
            rows: Vec::new(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Right-aligns the given column indexes.
    pub fn right(mut self, columns: &[usize]) -> Self {
        for &idx in columns {
            if let Some(align) = self.aligns.get_mut(idx) {
                *align = Align::Right;
            }
        }
        self
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let column_count = self.headers.len();
        let mut widths = self
            .headers
            .iter()
            .map(|h| display_width(h))
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate().take(column_count) {
                widths[idx] = widths[idx].max(display_width(&sanitize_cell(cell)));
            }
        }
        for width in &mut widths {
            *width = (*width).max(3);
        }

        let mut output = String::new();
        if let Some(title) = &self.title {
            let _ = writeln!(output, "{title}");
        }
        let _ = writeln!(output, "{}", self.format_row(&self.headers, &widths));
        let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", self.format_row(&separator, &widths));
        for row in &self.rows {
            let _ = writeln!(output, "{}", self.format_row(row, &widths));
        }
        output
    }

    fn format_row(&self, values: &[String], widths: &[usize]) -> String {
        let mut cells = Vec::with_capacity(values.len());
        for (idx, value) in values.iter().enumerate().take(widths.len()) {
            let sanitized = sanitize_cell(value);
            let padding = widths[idx].saturating_sub(display_width(&sanitized));
            let cell = match self.aligns.get(idx).copied().unwrap_or(Align::Left) {
                Align::Left => format!("{sanitized}{}", " ".repeat(padding)),
                Align::Right => format!("{}{sanitized}", " ".repeat(padding)),
            };
            cells.push(cell);
        }
        let mut line = cells.join("  ");
        while line.ends_with(' ') {
            line.pop();
        }
        line
    }
}

pub fn print_table(table: &TextTable) {
    print!("{}", table.render());
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // Skip ANSI escape sequence (e.g. \x1b[31m)
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_aligned_columns_pad_on_the_left() {
        let mut table = TextTable::new(["name", "revenue"]).right(&[1]);
        table.push(vec!["Sales".to_string(), "300.00".to_string()]);
        table.push(vec!["Ops".to_string(), "5.00".to_string()]);
        let rendered = table.render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "name   revenue");
        assert_eq!(lines[2], "Sales   300.00");
        assert_eq!(lines[3], "Ops       5.00");
    }

    #[test]
    fn ansi_sequences_do_not_count_toward_width() {
        assert_eq!(display_width("\u{1b}[38;2;1;2;3m██\u{1b}[0m"), 2);
    }

    #[test]
    fn title_and_control_characters() {
        let mut table = TextTable::new(["note"]).titled("Notes");
        table.push(vec!["a\tb".to_string()]);
        let rendered = table.render();
        assert!(rendered.starts_with("Notes\n"));
        assert!(rendered.contains("a b"));
    }
}
