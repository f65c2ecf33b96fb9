//! Plain-text tables for mapping previews and row-count summaries.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let align = vec![Align::Left; headers.len()];
        Self {
            headers,
            align,
            rows: Vec::new(),
        }
    }

    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.align.get_mut(column) {
            *slot = align;
        }
        self
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| cell_width(h)).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell_width(cell));
            }
        }

        let mut output = String::new();
        let _ = writeln!(output, "{}", self.format_line(&self.headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", self.format_line(&rule, &widths));
        for row in &self.rows {
            let _ = writeln!(output, "{}", self.format_line(row, &widths));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn format_line(&self, cells: &[String], widths: &[usize]) -> String {
        let mut parts = Vec::with_capacity(widths.len());
        for (idx, width) in widths.iter().enumerate() {
            let cell = cells.get(idx).map(|c| flatten(c)).unwrap_or_default();
            let pad = " ".repeat(width.saturating_sub(cell_width(&cell)));
            match self.align[idx] {
                Align::Left => parts.push(format!("{cell}{pad}")),
                Align::Right => parts.push(format!("{pad}{cell}")),
            }
        }
        parts.join("  ").trim_end().to_string()
    }
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

// Line breaks and tabs would tear the grid apart.
fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}
