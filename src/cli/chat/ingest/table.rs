/// Rows of cells under named columns, as read from a CSV file or a worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

const COLUMN_GAP: &str = "  ";

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Short rows are padded with blank cells; extra cells are dropped.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as an aligned text dump: a zero-based index column followed by
    /// one right-aligned column per header.
    ///
    /// ```text
    ///     SKU  Qty
    /// 0   A-1    5
    /// 1  B-22   12
    /// ```
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!("Empty table\nColumns: [{}]", self.columns.join(", "));
        }

        let index_width = (self.rows.len() - 1).to_string().len();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| flatten(cell)).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, header)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(cells.len() + 1);

        let mut header = " ".repeat(index_width);
        for (name, width) in self.columns.iter().zip(&widths) {
            header.push_str(COLUMN_GAP);
            header.push_str(&format!("{:>width$}", flatten(name), width = *width));
        }
        lines.push(header);

        for (index, row) in cells.iter().enumerate() {
            let mut line = format!("{:<width$}", index, width = index_width);
            for (cell, width) in row.iter().zip(&widths) {
                line.push_str(COLUMN_GAP);
                line.push_str(&format!("{:>width$}", cell, width = *width));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

fn flatten(cell: &str) -> String {
    cell.replace(['\r', '\n'], " ")
}
