/// Maximum number of decimal places printed for a number in fixed notation
const MAX_DECIMALS: usize = 8;

/// Budget used when measuring the natural (unconstrained) width of a number
const NATURAL_BUDGET: usize = 24;

/// Minimum column width for text columns
pub const MIN_TEXT_WIDTH: usize = 4;

/// Minimum column width for numeric columns
pub const MIN_NUMBER_WIDTH: usize = 8;

const ELLIPSIS: char = '…';

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Missing value (nullable column), rendered blank
    Empty,
}

impl Cell {
    /// Render the cell so that it occupies at most `budget` chars
    pub fn render(&self, budget: usize) -> String {
        match self {
            Cell::Text(text) => format_text(text, budget),
            Cell::Number(value) => format_number(*value, budget),
            Cell::Empty => String::new(),
        }
    }

    /// Width of the cell when no budget applies
    pub fn natural_width(&self) -> usize {
        match self {
            Cell::Text(text) => text.chars().count(),
            Cell::Number(value) => format_number(*value, NATURAL_BUDGET).chars().count(),
            Cell::Empty => 0,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, Into::into)
    }
}

/// Format a number into at most `budget` chars.
///
/// Fixed notation is used while it fits, with trailing zeros and a trailing point trimmed. Falls back
/// to scientific notation filling the budget when the integer part alone is too wide, when rounding
/// carries past the budget, or when the rounded value would read as zero although it is not.
pub fn format_number(value: f64, budget: usize) -> String {
    if !value.is_finite() {
        return format_text(&value.to_string(), budget);
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let int_len = format!("{:.0}", value.trunc()).len();
    if int_len <= budget {
        let mut decimals = budget.saturating_sub(int_len + 1).min(MAX_DECIMALS);
        loop {
            let text = format!("{value:.decimals$}");
            if text.len() <= budget {
                let trimmed = trim_insignificant(&text);
                if reads_as_zero(trimmed) {
                    break;
                }
                return trimmed.to_string();
            }
            if decimals == 0 {
                break;
            }
            decimals -= 1;
        }
    }

    scientific(value, budget)
}

/// Cut text to `budget` chars, marking the cut with an ellipsis
pub fn format_text(text: &str, budget: usize) -> String {
    let len = text.chars().count();
    if len <= budget {
        return text.to_string();
    }
    if budget == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(budget - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn scientific(value: f64, budget: usize) -> String {
    for precision in (0..=budget).rev() {
        let text = format!("{value:.precision$e}");
        if text.len() <= budget {
            return text;
        }
    }
    format!("{value:.0e}")
}

fn trim_insignificant(text: &str) -> &str {
    if text.contains('.') { text.trim_end_matches('0').trim_end_matches('.') } else { text }
}

fn reads_as_zero(text: &str) -> bool {
    text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.')
}
