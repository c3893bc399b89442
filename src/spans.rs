//! Self-collapsing set of half-open intervals.
//!
//! Used to remember which scanline ranges an operation already touched. Additions are cheap
//! appends; the set is sorted and merged lazily, either every [`MAX_ADDS_SINCE_SORT`]
//! additions or on the next query.

use std::cmp::Ordering;

/// Unsorted additions tolerated before the set is collapsed eagerly.
pub const MAX_ADDS_SINCE_SORT: usize = 256;

/// Half-open interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: f64) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Absorb `other` when it starts inside `self`. Returns whether it was absorbed.
    fn subsume(&mut self, other: &Span) -> bool {
        let absorbed = self.contains(other.start);
        if absorbed && other.end > self.end {
            self.end = other.end;
        }
        absorbed
    }
}

#[derive(Clone, Debug, Default)]
pub struct Spans {
    // `None` once an infinite span was added.
    spans: Option<Vec<Span>>,
    adds_since_sort: usize,
}

impl Spans {
    pub fn new() -> Self {
        Self {
            spans: Some(Vec::new()),
            adds_since_sort: 0,
        }
    }

    pub fn add(&mut self, start: f64, end: f64) {
        let Some(spans) = self.spans.as_mut() else {
            return;
        };
        spans.push(Span::new(start, end));
        self.adds_since_sort += 1;
        if self.adds_since_sort >= MAX_ADDS_SINCE_SORT {
            self.sort_and_collapse();
        }
    }

    /// Make the set cover everything. Later additions are ignored.
    pub fn add_infinite(&mut self) {
        self.spans = None;
        self.adds_since_sort = 0;
    }

    pub fn is_infinite(&self) -> bool {
        self.spans.is_none()
    }

    /// Return `true` if `[start, end)` overlaps any member.
    pub fn intersects(&mut self, start: f64, end: f64) -> bool {
        if self.adds_since_sort > 0 {
            self.sort_and_collapse();
        }
        let Some(spans) = self.spans.as_ref() else {
            return true;
        };
        spans
            .binary_search_by(|s| {
                if s.end <= start {
                    Ordering::Less
                } else if s.start >= end {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Current members, collapsed. `None` in infinite mode.
    pub fn spans(&mut self) -> Option<&[Span]> {
        if self.adds_since_sort > 0 {
            self.sort_and_collapse();
        }
        self.spans.as_deref()
    }

    fn sort_and_collapse(&mut self) {
        self.adds_since_sort = 0;
        let Some(spans) = self.spans.as_mut() else {
            return;
        };
        spans.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut kept = 0usize;
        for i in 1..spans.len() {
            let next = spans[i];
            if !spans[kept].subsume(&next) {
                kept += 1;
                spans[kept] = next;
            }
        }
        spans.truncate((kept + 1).min(spans.len()));
    }
}

#[cfg(test)]
#[path = "../tests/unit/spans.rs"]
mod tests;
