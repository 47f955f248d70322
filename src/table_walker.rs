//! Table traversal shared by both extractors.
//!
//! Rows and cells are taken from the table's own structure only (direct `tr`
//! children, or rows of its direct `thead`/`tbody`/`tfoot`), so a table nested
//! inside a cell never leaks its rows or cells into the outer walk.

use anyhow::anyhow;
use scraper::{ElementRef, Html, Selector, node::Element};

use crate::text_manipulators::{extract_text, normalize_whitespace};

pub fn selector(css: &'static str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

/// First `table` in document order whose element satisfies `predicate`.
pub fn find_table<'a, P>(
    document: &'a Html,
    table_selector: &Selector,
    predicate: P,
) -> Option<ElementRef<'a>>
where
    P: Fn(&Element) -> bool,
{
    document
        .select(table_selector)
        .find(|table| predicate(table.value()))
}

pub fn has_attr(element: &Element, name: &str, expected: &str) -> bool {
    element
        .attr(name)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
}

/// Every row that belongs to `table` itself, header included.
pub fn rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Rows of `table` with the first (header) row skipped.
pub fn body_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    rows(table).into_iter().skip(1)
}

/// The `td`/`th` cells directly under `row`.
pub fn row_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

pub fn cell_text(cell: ElementRef) -> String {
    normalize_whitespace(&extract_text(cell))
}

/// Walks a row's cells two at a time: even-indexed cells are labels, the
/// following odd-indexed cell is the value. A trailing unpaired cell is dropped.
pub fn label_value_pairs<'a>(row: ElementRef<'a>) -> Vec<(String, ElementRef<'a>)> {
    row_cells(row)
        .chunks_exact(2)
        .map(|pair| (cell_text(pair[0]).replace(':', "").trim().to_string(), pair[1]))
        .collect()
}
