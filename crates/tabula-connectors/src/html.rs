//! HTML document → tables.
//!
//! Every `<table>` element becomes one [`Table`]. Header rows come from
//! `<thead>`, or failing that from leading rows made only of `<th>` cells.
//! `colspan` and `rowspan` are expanded by repeating the cell text.

use scraper::{ElementRef, Html, Selector};
use tabula_core::Table;
use tracing::debug;

use crate::error::FetchError;
use crate::infer::infer_column;

/// Upper bound on a single `colspan`/`rowspan`.
const MAX_SPAN: usize = 1000;

#[derive(Debug, Clone)]
struct RawCell {
    text: String,
    header: bool,
    colspan: usize,
    rowspan: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct GridCell {
    text: String,
    header: bool,
}

impl GridCell {
    fn empty() -> Self {
        Self {
            text: String::new(),
            header: false,
        }
    }
}

fn element_children<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn span_attr(el: &ElementRef<'_>, name: &str) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map(|n| n.min(MAX_SPAN))
        .unwrap_or(1)
}

fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_row(tr: ElementRef<'_>) -> Vec<RawCell> {
    element_children(tr)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(|c| RawCell {
            text: cell_text(&c),
            header: c.value().name() == "th",
            colspan: span_attr(&c, "colspan"),
            rowspan: span_attr(&c, "rowspan"),
        })
        .collect()
}

fn read_section(section: ElementRef<'_>) -> Vec<Vec<RawCell>> {
    element_children(section)
        .filter(|c| c.value().name() == "tr")
        .map(read_row)
        .collect()
}

/// Lay spanned cells out on a rectangular-ish grid.
fn expand_spans(rows: Vec<Vec<RawCell>>) -> Vec<Vec<GridCell>> {
    // Per column: rows still to fill from a rowspan above, and the cell to repeat.
    let mut carry: Vec<Option<(usize, GridCell)>> = Vec::new();
    let mut grid = Vec::with_capacity(rows.len());

    for row in rows {
        let mut out = Vec::new();
        let mut cells = row.into_iter();
        let mut col = 0;
        loop {
            let pending = carry.get_mut(col).and_then(Option::take);
            if let Some((left, cell)) = pending {
                if left > 1 {
                    carry[col] = Some((left - 1, cell.clone()));
                }
                out.push(cell);
                col += 1;
                continue;
            }
            match cells.next() {
                Some(raw) => {
                    let cell = GridCell {
                        text: raw.text,
                        header: raw.header,
                    };
                    for _ in 0..raw.colspan {
                        if carry.len() <= col {
                            carry.resize(col + 1, None);
                        }
                        if raw.rowspan > 1 {
                            carry[col] = Some((raw.rowspan - 1, cell.clone()));
                        }
                        out.push(cell.clone());
                        col += 1;
                    }
                }
                None if carry.iter().skip(col).any(Option::is_some) => {
                    out.push(GridCell::empty());
                    col += 1;
                }
                None => break,
            }
        }
        grid.push(out);
    }
    grid
}

fn header_names(header_rows: &[Vec<GridCell>], width: usize) -> Vec<String> {
    if header_rows.is_empty() {
        return (0..width).map(|i| i.to_string()).collect();
    }
    (0..width)
        .map(|i| {
            let mut parts: Vec<&str> = Vec::new();
            for row in header_rows {
                if let Some(cell) = row.get(i) {
                    if !cell.text.is_empty() && parts.last() != Some(&cell.text.as_str()) {
                        parts.push(&cell.text);
                    }
                }
            }
            if parts.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                parts.join(" ")
            }
        })
        .collect()
}

/// Suffix repeated names with `.1`, `.2`, ... so every column is addressable.
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

fn build_table(table: ElementRef<'_>, position: usize) -> Result<Option<Table>, FetchError> {
    let mut head = Vec::new();
    let mut body = Vec::new();
    let mut foot = Vec::new();
    for child in element_children(table) {
        match child.value().name() {
            "thead" => head.extend(read_section(child)),
            "tbody" => body.extend(read_section(child)),
            "tfoot" => foot.extend(read_section(child)),
            "tr" => body.push(read_row(child)),
            _ => {}
        }
    }

    let head_len = head.len();
    let mut rows = head;
    rows.extend(body);
    rows.extend(foot);
    let mut grid = expand_spans(rows);

    let header_count = if head_len > 0 {
        head_len
    } else {
        grid.iter()
            .take_while(|r| !r.is_empty() && r.iter().all(|c| c.header))
            .count()
    };
    let body_rows = grid.split_off(header_count);
    let header_rows = grid;

    let width = header_rows
        .iter()
        .chain(body_rows.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    if width == 0 {
        debug!("Skipping empty table #{}", position);
        return Ok(None);
    }

    let names = dedupe_names(header_names(&header_rows, width));
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let cells = body_rows
                .iter()
                .map(|row| row.get(i).map(|c| c.text.clone()))
                .collect();
            infer_column(name, cells)
        })
        .collect();

    Table::try_new(columns)
        .map(Some)
        .map_err(|e| FetchError::Parse(format!("table #{}: {}", position, e)))
}

/// Parse every table in `html`, in document order.
///
/// Returns an empty vector when the document has no non-empty tables; the
/// caller decides whether that is an error.
pub fn parse_tables(html: &str) -> Result<Vec<Table>, FetchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("table")
        .map_err(|e| FetchError::Parse(format!("invalid selector: {:?}", e)))?;

    let mut tables = Vec::new();
    for (position, element) in document.select(&selector).enumerate() {
        if let Some(table) = build_table(element, position)? {
            tables.push(table);
        }
    }
    Ok(tables)
}
