//! Interval contribution estimator.
//!
//! Approximates each resource's fractional share of total page load time by
//! dividing every inter-event time slice evenly among the resources active
//! during it. O(n log n): one sort plus a binary search per resource.

use crate::types::TimingRecord;

/// A timestamp event: +1 at a resource start, -1 at its end. After the
/// sweep, `val` holds the apportioned time slice ending at `ts`.
#[derive(Debug, Clone, Copy)]
struct Cell {
    ts: f64,
    val: f64,
}

/// Leftmost binary search: index of the first cell with `ts >= x`, or
/// `cells.len()` if none.
fn search_sorted_first(cells: &[Cell], x: f64) -> usize {
    let mut min = -1isize;
    let mut max = cells.len() as isize;
    while min < max - 1 {
        let m = (min + max) / 2;
        if cells[m as usize].ts < x {
            min = m;
        } else {
            max = m;
        }
    }
    max as usize
}

/// Rightmost binary search: index of the last cell with `ts <= x`, or -1 if
/// none.
fn search_sorted_last(cells: &[Cell], x: f64) -> isize {
    let mut min = -1isize;
    let mut max = cells.len() as isize;
    while min < max - 1 {
        let m = (min + max) / 2;
        if x < cells[m as usize].ts {
            max = m;
        } else {
            min = m;
        }
    }
    min
}

/// Build the chronologically sorted event list, skipping resources with no
/// positive duration.
fn sorted_cells(records: &[TimingRecord]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(records.len() * 2);
    for record in records {
        if record.response_end <= record.start_time {
            continue;
        }
        cells.push(Cell {
            ts: record.start_time,
            val: 1.0,
        });
        cells.push(Cell {
            ts: record.response_end,
            val: -1.0,
        });
    }
    cells.sort_by(|a, b| a.ts.total_cmp(&b.ts));
    cells
}

/// Sweep the cells left to right, converting each one's value into the
/// inter-event gap divided by the number of concurrently active resources.
/// Cells sharing a timestamp are merged so no zero-width interval remains.
fn add_cell_contributions(cells: &mut Vec<Cell>) {
    let mut tot = 0.0f64;
    let mut current_ts = cells.first().map(|c| c.ts).unwrap_or(0.0);
    let mut keep: Vec<Cell> = Vec::with_capacity(cells.len());

    let mut i = 0;
    while i < cells.len() {
        let mut cell = cells[i];
        if i + 1 < cells.len() && cells[i + 1].ts == cell.ts {
            // merge into the next cell, drop this one
            cells[i + 1].val += cell.val;
            i += 1;
            continue;
        }

        let incr = cell.val;
        if tot > 0.0 {
            cell.val = (cell.ts - current_ts) / tot;
        }
        current_ts = cell.ts;
        tot += incr;
        keep.push(cell);
        i += 1;
    }

    *cells = keep;
}

/// Sum the apportioned slices covering `[start_time + 1, response_end]`.
fn sum_contributions(cells: &[Cell], record: &TimingRecord) -> f64 {
    let low = search_sorted_first(cells, record.start_time + 1.0);
    let up = search_sorted_last(cells, record.response_end);

    let mut tot = 0.0;
    let mut i = low as isize;
    while i <= up {
        tot += cells[i as usize].val;
        i += 1;
    }
    tot
}

/// Compute and store each resource's fractional contribution to total page
/// load time.
///
/// Records are left untouched when the interval set cannot be scored
/// meaningfully: fewer than two events, an event list that does not open
/// with a resource start, or a final timestamp at or before 0.
pub fn add_contribution(records: &mut [TimingRecord]) {
    if records.is_empty() {
        return;
    }

    let mut cells = sorted_cells(records);
    if cells.len() < 2 || cells[0].val < 1.0 || cells[cells.len() - 1].ts <= 0.0 {
        return;
    }

    add_cell_contributions(&mut cells);

    // total load time for this batch of resources
    let load_time = cells[cells.len() - 1].ts;

    for record in records.iter_mut() {
        record.contribution = Some(sum_contributions(&cells, record) / load_time);
    }
}
