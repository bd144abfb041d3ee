//! Order-independent comparison keys for result sets.
//!
//! Two result sets with the same column set and the same multiset of rows
//! produce the same key, whatever their column or row order.

use std::ops::Range;

use serde::Serialize;

use super::types::{ResultSet, Row};

#[derive(Serialize)]
struct Canonical<'a> {
    columns: Vec<&'a str>,
    rows: Vec<Row>,
}

/// Upper bound on arrangements tried across groups of interchangeable columns.
const MAX_TIE_ARRANGEMENTS: usize = 40_320;

/// Builds the canonical comparison key for a result set.
///
/// Columns are sorted by name and then by their sorted cell contents. Columns
/// that tie on both are interchangeable by those measures, so every
/// arrangement of each tied group is tried and the one with the smallest
/// sorted row serialization wins. Rows are permuted to match and sorted by
/// their serialized form.
pub fn normalize(result: &ResultSet) -> String {
    let order = canonical_order(result);
    let rows = sorted_rows(result, &order)
        .into_iter()
        .map(|(_, row)| row)
        .collect();

    let canonical = Canonical {
        columns: order.iter().map(|&i| result.columns[i].as_str()).collect(),
        rows,
    };

    serde_json::to_string(&canonical).unwrap_or_default()
}

fn canonical_order(result: &ResultSet) -> Vec<usize> {
    let width = result.columns.len();

    let column_keys: Vec<(&str, String)> = (0..width)
        .map(|i| {
            let mut cells: Vec<String> = result
                .rows
                .iter()
                .map(|row| serde_json::to_string(&row.get(i)).unwrap_or_default())
                .collect();
            cells.sort();
            (result.columns[i].as_str(), cells.join(","))
        })
        .collect();

    let mut order: Vec<usize> = (0..width).collect();
    order.sort_by(|&a, &b| column_keys[a].cmp(&column_keys[b]));

    let groups = tied_groups(&order, &column_keys);
    let arrangements = groups
        .iter()
        .map(|group| (1..=group.len()).product::<usize>())
        .try_fold(1usize, |acc, n| acc.checked_mul(n));
    match arrangements {
        Some(n) if n > 1 && n <= MAX_TIE_ARRANGEMENTS => {}
        _ => return order,
    }

    let mut best_rows = row_keys(result, &order);
    let mut best = order.clone();
    let mut candidate = order;
    while next_arrangement(&mut candidate, &groups) {
        let rows = row_keys(result, &candidate);
        if rows < best_rows {
            best_rows = rows;
            best.clone_from(&candidate);
        }
    }
    best
}

/// Index ranges of `order` whose columns share a key. Single columns are skipped.
fn tied_groups(order: &[usize], keys: &[(&str, String)]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=order.len() {
        if end == order.len() || keys[order[end]] != keys[order[start]] {
            if end - start > 1 {
                groups.push(start..end);
            }
            start = end;
        }
    }
    groups
}

/// Steps to the next arrangement, odometer style across groups.
///
/// Returns false once every combination has been visited.
fn next_arrangement(order: &mut [usize], groups: &[Range<usize>]) -> bool {
    groups
        .iter()
        .any(|group| next_permutation(&mut order[group.clone()]))
}

/// Lexicographic next permutation. On the last one, resets to ascending
/// order and returns false.
fn next_permutation(items: &mut [usize]) -> bool {
    let Some(pivot) = items.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        items.reverse();
        return false;
    };
    let successor = items
        .iter()
        .rposition(|&item| item > items[pivot])
        .unwrap_or(pivot + 1);
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

fn row_keys(result: &ResultSet, order: &[usize]) -> Vec<String> {
    sorted_rows(result, order)
        .into_iter()
        .map(|(key, _)| key)
        .collect()
}

fn sorted_rows(result: &ResultSet, order: &[usize]) -> Vec<(String, Row)> {
    let mut keyed_rows: Vec<(String, Row)> = result
        .rows
        .iter()
        .map(|row| {
            let permuted: Row = order
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect();
            (serde_json::to_string(&permuted).unwrap_or_default(), permuted)
        })
        .collect();
    keyed_rows.sort_by(|a, b| a.0.cmp(&b.0));
    keyed_rows
}

/// Returns true if both result sets normalize to the same key.
pub fn equivalent(a: &ResultSet, b: &ResultSet) -> bool {
    normalize(a) == normalize(b)
}
