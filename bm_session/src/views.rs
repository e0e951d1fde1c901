//! Turn query results into reply fragments.
//!
//! Every function here returns fragments already escaped for HTML parse mode: tables and file
//! contents wrapped in `<pre>` blocks, paragraphs with their parameters escaped. Each fragment fits
//! a single message on its own.

use bm_render::Align;
use bm_render::Cell;
use bm_render::Layout;
use bm_render::MAX_MESSAGE_LENGTH;
use bm_render::PRE_HEAD;
use bm_render::PRE_TAIL;
use bm_render::escape_html;
use bm_render::format_number;
use bm_render::tabularize;
use bm_store::BalanceRow;
use bm_store::ProgressRow;
use bm_store::TradeRow;

use crate::ratio::RatioLine;
use crate::ratio::RatioPolicy;
use crate::services::Strings;

/// Candidates listed by the next-coin view
pub const NEXT_COIN_COUNT: usize = 3;

/// Width used for totals printed in paragraphs
const TOTAL_WIDTH: usize = 14;

/// One paragraph from the string table, parameters escaped
pub fn text(strings: &dyn Strings, key: &str, params: &[(&str, String)]) -> String {
    let escaped: Vec<(&str, String)> = params.iter().map(|(name, value)| (*name, escape_html(value))).collect();
    let mut paragraph = strings.lookup(key, &escaped);
    paragraph.push('\n');
    paragraph
}

pub fn current_value(strings: &dyn Strings, balances: &[BalanceRow]) -> bm_render::Result<Vec<String>> {
    if balances.is_empty() {
        return Ok(vec![text(strings, "value.empty", &[])]);
    }

    let na = || Cell::Text(strings.lookup("table.na", &[]));
    let or_na = |value: Option<f64>| value.map_or_else(na, Cell::Number);
    let columns = vec![
        balances.iter().map(|row| Cell::from(row.coin.as_str())).collect(),
        balances.iter().map(|row| Cell::Number(row.balance)).collect(),
        balances.iter().map(|row| or_na(row.usd_value())).collect(),
        balances.iter().map(|row| or_na(row.btc_value())).collect(),
    ];
    let headers = headers(strings, &["table.coin", "table.balance", "table.usd", "table.btc"]);

    let snapshot = balances.iter().map(|row| row.datetime.as_str()).max().unwrap_or_default();
    let mut fragments = vec![text(strings, "value.header", &[("time", short_time(snapshot).to_string())])];
    fragments.extend(tables(&headers, &columns, numeric_layout(4, 1))?);
    fragments.push(text(strings, "value.total", &[
        ("usd", total(balances.iter().map(BalanceRow::usd_value), strings)),
        ("btc", total(balances.iter().map(BalanceRow::btc_value), strings)),
    ]));
    Ok(fragments)
}

pub fn progress(strings: &dyn Strings, rows: &[ProgressRow]) -> bm_render::Result<Vec<String>> {
    if rows.is_empty() {
        return Ok(vec![text(strings, "progress.empty", &[])]);
    }

    let columns = vec![
        rows.iter().map(|row| Cell::from(row.coin.as_str())).collect(),
        rows.iter().map(|row| Cell::Number(row.amount)).collect(),
        rows.iter().map(|row| row.change_pct.map_or_else(|| Cell::Text(strings.lookup("table.na", &[])), Cell::Number)).collect(),
        rows.iter().map(|row| Cell::from(short_time(&row.datetime))).collect(),
    ];
    let headers = headers(strings, &["table.coin", "table.amount", "table.change", "table.date"]);
    let layout = Layout::auto(4).with_align(vec![Align::Left, Align::Right, Align::Right, Align::Left]);

    let mut fragments = vec![text(strings, "progress.header", &[("count", rows.len().to_string())])];
    fragments.extend(tables(&headers, &columns, layout)?);
    Ok(fragments)
}

pub fn ratios(strings: &dyn Strings, coin: &str, policy: &RatioPolicy, lines: &[RatioLine]) -> bm_render::Result<Vec<String>> {
    let mut fragments = vec![text(strings, "ratios.header", &[("coin", coin.to_string()), ("policy", policy.name().to_string())])];
    if lines.is_empty() {
        fragments.push(text(strings, "ratios.empty", &[("coin", coin.to_string())]));
        return Ok(fragments);
    }

    let columns = vec![
        lines.iter().map(|line| Cell::from(line.coin.as_str())).collect(),
        lines.iter().map(|line| Cell::from(line.current)).collect(),
        lines.iter().map(|line| Cell::from(line.target)).collect(),
        lines.iter().map(|line| Cell::from(line.delta)).collect(),
    ];
    let headers = headers(strings, &["table.coin", "table.current", "table.target", "table.difference"]);
    fragments.extend(tables(&headers, &columns, numeric_layout(4, 1))?);
    Ok(fragments)
}

/// The pairs closest to triggering a jump
pub fn next_coin(strings: &dyn Strings, coin: &str, lines: &[RatioLine]) -> bm_render::Result<Vec<String>> {
    let candidates: Vec<&RatioLine> = lines.iter().filter(|line| line.delta.is_some()).take(NEXT_COIN_COUNT).collect();
    if candidates.is_empty() {
        return Ok(vec![text(strings, "next.empty", &[("coin", coin.to_string())])]);
    }

    let columns = vec![
        candidates.iter().map(|line| Cell::from(line.coin.as_str())).collect(),
        candidates.iter().map(|line| Cell::from(line.delta)).collect(),
    ];
    let headers = headers(strings, &["table.coin", "table.difference"]);

    let mut fragments = vec![text(strings, "next.header", &[("coin", coin.to_string())])];
    fragments.extend(tables(&headers, &columns, numeric_layout(2, 1))?);
    Ok(fragments)
}

pub fn trade_history(strings: &dyn Strings, trades: &[TradeRow]) -> bm_render::Result<Vec<String>> {
    if trades.is_empty() {
        return Ok(vec![text(strings, "history.empty", &[])]);
    }

    let side = |trade: &TradeRow| strings.lookup(if trade.selling { "history.sell" } else { "history.buy" }, &[]);
    let columns = vec![
        trades.iter().map(|trade| Cell::from(side(trade))).collect(),
        trades.iter().map(|trade| Cell::from(format!("{}/{}", trade.alt_coin, trade.crypto_coin))).collect(),
        trades.iter().map(|trade| Cell::from(trade.alt_amount)).collect(),
        trades.iter().map(|trade| Cell::from(trade.crypto_amount)).collect(),
        trades.iter().map(|trade| Cell::from(trade.state.as_str())).collect(),
        trades.iter().map(|trade| Cell::from(short_time(&trade.datetime))).collect(),
    ];
    let headers = headers(strings, &["table.side", "table.pair", "table.amount", "table.value", "table.state", "table.date"]);
    let layout = Layout::auto(6).with_align(vec![Align::Left, Align::Left, Align::Right, Align::Right, Align::Left, Align::Left]);

    let mut fragments = vec![text(strings, "history.header", &[("count", trades.len().to_string())])];
    fragments.extend(tables(&headers, &columns, layout)?);
    Ok(fragments)
}

/// Whole file shown as monospace blocks, split on line boundaries where possible
pub fn file_contents(strings: &dyn Strings, name: &str, contents: &str) -> Vec<String> {
    let mut fragments = vec![text(strings, "edit.current", &[("file", name.to_string())])];
    if contents.trim().is_empty() {
        fragments.push(text(strings, "edit.empty", &[]));
        return fragments;
    }
    let budget = MAX_MESSAGE_LENGTH - PRE_HEAD.chars().count() - PRE_TAIL.chars().count() - 1;
    fragments.extend(chunk_escaped(contents, budget).into_iter().map(|chunk| format!("{PRE_HEAD}{chunk}{PRE_TAIL}\n")));
    fragments
}

fn headers(strings: &dyn Strings, keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| strings.lookup(key, &[])).collect()
}

/// First column left aligned text, the rest right aligned numbers
fn numeric_layout(columns: usize, text_columns: usize) -> Layout {
    let align = (0..columns).map(|index| if index < text_columns { Align::Left } else { Align::Right }).collect();
    Layout::auto(columns).with_align(align)
}

fn tables(headers: &[String], columns: &[Vec<Cell>], layout: Layout) -> bm_render::Result<Vec<String>> {
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    let tables = tabularize(&headers, columns, &layout)?;
    Ok(tables.into_iter().map(|table| format!("{PRE_HEAD}{}{PRE_TAIL}\n", escape_html(table.trim_end()))).collect())
}

fn total(values: impl Iterator<Item = Option<f64>>, strings: &dyn Strings) -> String {
    let known: Vec<f64> = values.flatten().collect();
    if known.is_empty() {
        return strings.lookup("table.na", &[]);
    }
    format_number(known.iter().sum(), TOTAL_WIDTH)
}

/// `2024-01-02 00:01:00.123456` → `2024-01-02 00:01`
fn short_time(datetime: &str) -> &str {
    match datetime.char_indices().nth(16) {
        Some((index, _)) => &datetime[..index],
        None => datetime,
    }
}

/// Split text into escaped chunks of at most `budget` chars, breaking between lines where possible
fn chunk_escaped(contents: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for line in contents.split_inclusive('\n') {
        let escaped = escape_html(line);
        let line_len = escaped.chars().count();
        if len > 0 && len + line_len > budget {
            chunks.push(std::mem::take(&mut current));
            len = 0;
        }
        if line_len <= budget {
            current.push_str(&escaped);
            len += line_len;
            continue;
        }
        for ch in line.chars() {
            let piece = escape_html(ch.encode_utf8(&mut [0; 4]));
            let piece_len = piece.chars().count();
            if len + piece_len > budget {
                chunks.push(std::mem::take(&mut current));
                len = 0;
            }
            current.push_str(&piece);
            len += piece_len;
        }
    }
    if len > 0 {
        chunks.push(current);
    }
    chunks
}
