use crate::ROWS_PER_TABLE;
use crate::cell::Cell;
use crate::cell::MIN_NUMBER_WIDTH;
use crate::cell::MIN_TEXT_WIDTH;
use crate::cell::format_text;
use crate::error::RenderError;
use crate::error::Result;

/// Horizontal alignment of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
}

/// Column layout of a table
#[derive(Debug, Clone)]
pub struct Layout {
    /// Column widths in chars, borders excluded. Zero means auto-size.
    pub widths: Vec<usize>,
    pub align: Vec<Align>,
    /// Reserve one space next to the border for left/right aligned columns
    pub add_spaces: Vec<bool>,
    pub rows_per_table: usize,
}

impl Layout {
    /// Left aligned, space padded columns with the given widths
    pub fn new(widths: Vec<usize>) -> Self {
        let columns = widths.len();
        Self { widths, align: vec![Align::Left; columns], add_spaces: vec![true; columns], rows_per_table: ROWS_PER_TABLE }
    }

    /// Auto-sized columns
    pub fn auto(columns: usize) -> Self {
        Self::new(vec![0; columns])
    }

    pub fn with_align(mut self, align: Vec<Align>) -> Self {
        self.align = align;
        self
    }

    pub fn with_add_spaces(mut self, add_spaces: Vec<bool>) -> Self {
        self.add_spaces = add_spaces;
        self
    }

    pub fn with_rows_per_table(mut self, rows: usize) -> Self {
        self.rows_per_table = rows.max(1);
        self
    }
}

struct Column {
    width: usize,
    align: Align,
    add_spaces: bool,
}

impl Column {
    /// Chars available to the value itself
    fn budget(&self) -> usize {
        match self.align {
            Align::Left | Align::Right if self.add_spaces => self.width - 1,
            _ => self.width,
        }
    }

    fn place(&self, value: &str) -> String {
        let fill = self.width.saturating_sub(value.chars().count());
        match (self.align, self.add_spaces) {
            (Align::Left, true) => format!(" {value}{}", " ".repeat(fill - 1)),
            (Align::Left, false) => format!("{value}{}", " ".repeat(fill)),
            (Align::Right, true) => format!("{}{value} ", " ".repeat(fill - 1)),
            (Align::Right, false) => format!("{}{value}", " ".repeat(fill)),
            (Align::Center, _) => {
                let before = fill / 2;
                format!("{}{value}{}", " ".repeat(before), " ".repeat(fill - before))
            }
        }
    }
}

/// Render a bordered fixed-width table.
///
/// `columns` holds the data column by column; shorter columns are padded with empty cells. The data
/// is split into several tables of at most `layout.rows_per_table` rows, each repeating the header.
/// Every line of every table has the same width.
pub fn tabularize(headers: &[&str], columns: &[Vec<Cell>], layout: &Layout) -> Result<Vec<String>> {
    let count = layout.widths.len();
    for len in [headers.len(), columns.len(), layout.align.len(), layout.add_spaces.len()] {
        if len != count {
            return Err(RenderError::ColumnMismatch { layout: count, data: len });
        }
    }

    let resolved = resolve_columns(headers, columns, layout)?;
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);

    let top = border(&resolved, '┌', '┬', '┐');
    let separator = border(&resolved, '├', '┼', '┤');
    let bottom = border(&resolved, '└', '┴', '┘');
    let header = line(resolved.iter().zip(headers).map(|(column, title)| column.place(&format_text(title, column.budget()))));

    let starts: Vec<usize> = if rows == 0 { vec![0] } else { (0..rows).step_by(layout.rows_per_table.max(1)).collect() };
    let tables = starts
        .into_iter()
        .map(|start| {
            let end = (start + layout.rows_per_table.max(1)).min(rows);
            let mut table = String::new();
            for text in [&top, &header, &separator] {
                table.push_str(text);
                table.push('\n');
            }
            for row in start..end {
                let cells = resolved.iter().zip(columns).map(|(column, data)| {
                    let cell = data.get(row).unwrap_or(&Cell::Empty);
                    column.place(&cell.render(column.budget()))
                });
                table.push_str(&line(cells));
                table.push('\n');
            }
            table.push_str(&bottom);
            table.push('\n');
            table
        })
        .collect();

    Ok(tables)
}

fn resolve_columns(headers: &[&str], columns: &[Vec<Cell>], layout: &Layout) -> Result<Vec<Column>> {
    let mut resolved = Vec::with_capacity(layout.widths.len());
    for (index, &requested) in layout.widths.iter().enumerate() {
        let data = &columns[index];
        let min = if data.iter().any(Cell::is_number) { MIN_NUMBER_WIDTH } else { MIN_TEXT_WIDTH };
        let width = if requested == 0 {
            let longest = data.iter().map(Cell::natural_width).chain(std::iter::once(headers[index].chars().count())).max().unwrap_or(0);
            (longest + 2).max(min)
        } else if requested < min {
            return Err(RenderError::WidthTooSmall { column: index, width: requested, min });
        } else {
            requested
        };
        resolved.push(Column { width, align: layout.align[index], add_spaces: layout.add_spaces[index] });
    }
    Ok(resolved)
}

fn border(columns: &[Column], left: char, joint: char, right: char) -> String {
    let mut out = String::new();
    out.push(left);
    for (index, column) in columns.iter().enumerate() {
        if index > 0 {
            out.push(joint);
        }
        out.extend(std::iter::repeat_n('─', column.width));
    }
    out.push(right);
    out
}

fn line(cells: impl Iterator<Item = String>) -> String {
    let mut out = String::from("│");
    for cell in cells {
        out.push_str(&cell);
        out.push('│');
    }
    out
}
