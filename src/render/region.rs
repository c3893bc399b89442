use crate::foundation::core::IntRect;
use smallvec::SmallVec;
use std::collections::BTreeMap;

type RowSpans = SmallVec<[(i32, i32); 4]>;

/// Device-space pixel set: a bounding rectangle, optionally refined into per-row spans.
///
/// Rectangular regions carry no rows. Row spans are sorted, disjoint and half-open.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Region {
    bounds: IntRect,
    // rows[i] covers y = bounds.y + i
    rows: Option<Vec<RowSpans>>,
}

impl Region {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rect(r: IntRect) -> Self {
        if r.is_empty() {
            return Self::empty();
        }
        Self {
            bounds: r,
            rows: None,
        }
    }

    /// Build from `(y, x0, x1)` spans in any order. Overlapping spans merge.
    pub fn from_spans(spans: impl IntoIterator<Item = (i32, i32, i32)>) -> Self {
        let mut by_row: BTreeMap<i32, RowSpans> = BTreeMap::new();
        for (y, x0, x1) in spans {
            if x1 > x0 {
                by_row.entry(y).or_default().push((x0, x1));
            }
        }
        let (Some(&y0), Some(&y1)) = (by_row.keys().next(), by_row.keys().next_back()) else {
            return Self::empty();
        };
        let mut rows = vec![RowSpans::new(); (y1 - y0 + 1) as usize];
        for (y, mut row) in by_row {
            row.sort_unstable();
            let mut merged = RowSpans::new();
            for (x0, x1) in row {
                match merged.last_mut() {
                    Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
                    _ => merged.push((x0, x1)),
                }
            }
            rows[(y - y0) as usize] = merged;
        }
        Self::from_rows(y0, rows)
    }

    fn from_rows(y0: i32, mut rows: Vec<RowSpans>) -> Self {
        let lead = rows.iter().take_while(|r| r.is_empty()).count();
        if lead == rows.len() {
            return Self::empty();
        }
        let trail = rows.iter().rev().take_while(|r| r.is_empty()).count();
        rows.truncate(rows.len() - trail);
        rows.drain(..lead);
        let y0 = y0 + lead as i32;

        let mut x0 = i32::MAX;
        let mut x1 = i32::MIN;
        for row in &rows {
            if let (Some(first), Some(last)) = (row.first(), row.last()) {
                x0 = x0.min(first.0);
                x1 = x1.max(last.1);
            }
        }
        let bounds = IntRect::from_corners(x0, y0, x1, y0 + rows.len() as i32);
        let rectangular = rows
            .iter()
            .all(|r| r.len() == 1 && r[0] == (x0, x1));
        Self {
            bounds,
            rows: (!rectangular).then_some(rows),
        }
    }

    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn is_rectangular(&self) -> bool {
        self.rows.is_none()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        match &self.rows {
            None => true,
            Some(rows) => rows[(y - self.bounds.y) as usize]
                .iter()
                .any(|&(x0, x1)| x >= x0 && x < x1),
        }
    }

    /// Visit every span as `(y, x0, x1)`, top to bottom.
    pub fn for_each_span(&self, mut f: impl FnMut(i32, i32, i32)) {
        if self.is_empty() {
            return;
        }
        let b = self.bounds;
        match &self.rows {
            None => (b.y..b.y2()).for_each(|y| f(y, b.x, b.x2())),
            Some(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    for &(x0, x1) in row {
                        f(b.y + i as i32, x0, x1);
                    }
                }
            }
        }
    }

    pub fn span_count(&self) -> usize {
        let mut n = 0;
        self.for_each_span(|_, _, _| n += 1);
        n
    }

    pub fn intersect_rect(&self, r: IntRect) -> Self {
        let clipped = self.bounds.intersect(r);
        if clipped.is_empty() {
            return Self::empty();
        }
        let Some(rows) = &self.rows else {
            return Self::rect(clipped);
        };
        let start = (clipped.y - self.bounds.y) as usize;
        let out = rows[start..start + clipped.height as usize]
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|&(x0, x1)| {
                        let (a, b) = (x0.max(clipped.x), x1.min(clipped.x2()));
                        (b > a).then_some((a, b))
                    })
                    .collect()
            })
            .collect();
        Self::from_rows(clipped.y, out)
    }

    pub fn intersect(&self, other: &Region) -> Self {
        if other.is_rectangular() {
            return self.intersect_rect(other.bounds);
        }
        if self.is_rectangular() {
            return other.intersect_rect(self.bounds);
        }
        let b = self.bounds.intersect(other.bounds);
        if b.is_empty() {
            return Self::empty();
        }
        let rows = (b.y..b.y2())
            .map(|y| intersect_rows(self.row(y), other.row(y)))
            .collect();
        Self::from_rows(b.y, rows)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        let mut out = self.clone();
        out.bounds = out.bounds.translate(dx, dy);
        if let Some(rows) = out.rows.as_mut() {
            for row in rows {
                for span in row.iter_mut() {
                    span.0 += dx;
                    span.1 += dx;
                }
            }
        }
        out
    }

    fn row(&self, y: i32) -> &[(i32, i32)] {
        match &self.rows {
            Some(rows) if y >= self.bounds.y && y < self.bounds.y2() => {
                &rows[(y - self.bounds.y) as usize]
            }
            _ => &[],
        }
    }
}

fn intersect_rows(a: &[(i32, i32)], b: &[(i32, i32)]) -> RowSpans {
    let mut out = RowSpans::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let lo = a[i].0.max(b[j].0);
        let hi = a[i].1.min(b[j].1);
        if hi > lo {
            out.push((lo, hi));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/region.rs"]
mod tests;
