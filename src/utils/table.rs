/// Column alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Plain-text table rendered inside a Discord code block
pub struct Table {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl Table {
    /// Create a table with left-aligned columns
    pub fn new(headers: &[&str]) -> Self {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            aligns: vec![Align::Left; headers.len()],
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.chars().count()).collect(),
        }
    }

    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.aligns.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Add a row; cells past the header count are dropped
    pub fn add_row<S: AsRef<str>>(&mut self, row: &[S]) {
        let row: Vec<String> = row
            .iter()
            .take(self.headers.len())
            .map(|s| s.as_ref().to_string())
            .collect();

        for (i, cell) in row.iter().enumerate() {
            self.col_widths[i] = self.col_widths[i].max(cell.chars().count());
        }

        self.rows.push(row);
    }

    /// Render wrapped in a code block
    pub fn render(&self) -> String {
        let mut output = String::from("```\n");
        output.push_str(&self.render_plain());
        output.push_str("```");
        output
    }

    /// Render without the code block fences, one line per row
    pub fn render_plain(&self) -> String {
        let mut output = self.render_row(&self.headers);
        output.push('\n');
        output.push_str(&self.render_separator());
        output.push('\n');

        for row in &self.rows {
            output.push_str(&self.render_row(row));
            output.push('\n');
        }
        output
    }

    fn render_row(&self, row: &[String]) -> String {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = self.col_widths[i];
                match self.aligns[i] {
                    Align::Left => format!("{:<width$}", cell, width = width),
                    Align::Right => format!("{:>width$}", cell, width = width),
                }
            })
            .collect();
        cells.join(" | ").trim_end().to_string()
    }

    fn render_separator(&self) -> String {
        self.col_widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_table() {
        let mut table = Table::new(&["Coin", "Price"]).align(1, Align::Right);
        table.add_row(&["BTC", "64123.45"]);
        table.add_row(&["ETH", "3100.1"]);

        let rendered = table.render();
        assert!(rendered.starts_with("```\n"));
        assert!(rendered.ends_with("```"));
        assert!(rendered.contains("Coin |    Price"));
        assert!(rendered.contains("BTC  | 64123.45"));
        assert!(rendered.contains("ETH  |   3100.1"));
        assert!(rendered.contains("-----+-"));
    }

    #[test]
    fn test_extra_cells_dropped() {
        let mut table = Table::new(&["Check"]);
        table.add_row(&["database", "ignored"]);

        assert!(!table.render_plain().contains("ignored"));
        assert!(table.render_plain().contains("database"));
    }
}
