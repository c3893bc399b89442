use crate::foundation::config::PoolConfig;
use crate::foundation::core::{BezPath, IntRect, Point, Rect, clip_round};
use crate::pool::{ReentrantContext, ReentrantContextPool};
use crate::render::region::Region;
use kurbo::{PathEl, Shape};
use std::collections::BTreeMap;
use std::fmt;

/// Converts device-space outlines into pixel regions (nonzero winding, pixel-center sampling).
pub trait ClipRasterizer: Send + Sync + fmt::Debug {
    /// Pixels of `path` inside `area`.
    fn rasterize(&self, path: &BezPath, area: &Region) -> Region;
}

#[derive(Debug, Default)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    winding: i32,
}

/// Per-use scratch buffers for [`ScanlineRasterizer`].
#[derive(Debug, Default)]
pub struct ScanlineScratch {
    edges: Vec<Edge>,
    crossings: Vec<(f64, i32)>,
    spans: Vec<(i32, i32, i32)>,
}

impl ReentrantContext for ScanlineScratch {
    fn reset(&mut self) {
        self.edges.clear();
        self.crossings.clear();
        self.spans.clear();
    }
}

/// Reference scanline rasterizer. Scratch buffers come from a reentrant pool so nested
/// rasterizations on one thread never share them.
pub struct ScanlineRasterizer {
    tolerance: f64,
    scratch: ReentrantContextPool<ScanlineScratch>,
}

impl fmt::Debug for ScanlineRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanlineRasterizer")
            .field("tolerance", &self.tolerance)
            .field("scratch", &self.scratch)
            .finish()
    }
}

impl ScanlineRasterizer {
    pub fn new(pool: PoolConfig) -> Self {
        Self {
            tolerance: 0.1,
            scratch: ReentrantContextPool::new(
                pool.strategy,
                pool.strength,
                ScanlineScratch::default,
            ),
        }
    }

    pub fn scratch_pool(&self) -> &ReentrantContextPool<ScanlineScratch> {
        &self.scratch
    }
}

impl Default for ScanlineRasterizer {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl ClipRasterizer for ScanlineRasterizer {
    fn rasterize(&self, path: &BezPath, area: &Region) -> Region {
        let mut guard = self.scratch.acquire();
        let s = &mut *guard;
        collect_edges(path, self.tolerance, &mut s.edges);
        if s.edges.is_empty() || area.is_empty() {
            return Region::empty();
        }

        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for e in &s.edges {
            ymin = ymin.min(e.y0);
            ymax = ymax.max(e.y1);
        }
        let rows = IntRect::covering(Rect::new(0.0, ymin, 0.0, ymax));
        let b = area.bounds();
        let y_start = rows.y.max(b.y);
        let y_end = rows.y2().min(b.y2());

        for y in y_start..y_end {
            let yc = y as f64 + 0.5;
            s.crossings.clear();
            for e in &s.edges {
                if yc >= e.y0 && yc < e.y1 {
                    let t = (yc - e.y0) / (e.y1 - e.y0);
                    s.crossings.push((e.x0 + t * (e.x1 - e.x0), e.winding));
                }
            }
            s.crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            let mut start = 0.0;
            for &(x, w) in &s.crossings {
                let was_inside = winding != 0;
                winding += w;
                let inside = winding != 0;
                if !was_inside && inside {
                    start = x;
                } else if was_inside && !inside {
                    let (x0, x1) = (clip_round(start), clip_round(x));
                    if x1 > x0 {
                        s.spans.push((y, x0, x1));
                    }
                }
            }
        }
        Region::from_spans(s.spans.drain(..)).intersect(area)
    }
}

/// Subsamples per pixel along each axis for [`coverage_levels`].
pub const SUBSAMPLES: i32 = 4;

/// Antialiased coverage of `path` within `limit`, grouped into one region per coverage
/// level. Coverage is the fraction of a 4x4 subsample grid inside the path (nonzero
/// winding), scaled to `0..=255`.
pub fn coverage_levels(path: &BezPath, limit: IntRect) -> Vec<(u8, Region)> {
    let bbox = path.bounding_box();
    let area = IntRect::from_corners(
        bbox.x0.floor() as i32,
        bbox.y0.floor() as i32,
        bbox.x1.ceil() as i32,
        bbox.y1.ceil() as i32,
    )
    .intersect(limit);
    if area.is_empty() {
        return Vec::new();
    }
    let mut edges = Vec::new();
    collect_edges(path, 0.1, &mut edges);

    let ss = SUBSAMPLES;
    let w = area.width as usize;
    let cols = w as i64 * ss as i64;
    let mut counts = vec![0u8; w * area.height as usize];
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for row in 0..area.height {
        for sy in 0..ss {
            let yc = (area.y + row) as f64 + (sy as f64 + 0.5) / ss as f64;
            crossings.clear();
            for e in &edges {
                if yc >= e.y0 && yc < e.y1 {
                    let t = (yc - e.y0) / (e.y1 - e.y0);
                    crossings.push((e.x0 + t * (e.x1 - e.x0), e.winding));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            // subsample column k is centered at area.x + (k + 0.5) / ss
            let column = |x: f64| {
                (((x - area.x as f64) * ss as f64 - 0.5).ceil() as i64).clamp(0, cols)
            };
            let mut winding = 0;
            let mut start = 0.0;
            for &(x, dir) in &crossings {
                let was_inside = winding != 0;
                winding += dir;
                if !was_inside && winding != 0 {
                    start = x;
                } else if was_inside && winding == 0 {
                    for k in column(start)..column(x) {
                        let i = row as usize * w + (k / ss as i64) as usize;
                        counts[i] += 1;
                    }
                }
            }
        }
    }

    let full = (ss * ss) as u32;
    let mut levels: BTreeMap<u8, Vec<(i32, i32, i32)>> = BTreeMap::new();
    for row in 0..area.height as usize {
        let y = area.y + row as i32;
        let line = &counts[row * w..(row + 1) * w];
        let mut x = 0;
        while x < w {
            let n = line[x];
            let run = line[x..].iter().take_while(|&&c| c == n).count();
            if n > 0 {
                let cov = (n as u32 * 255 / full) as u8;
                let x0 = area.x + x as i32;
                levels.entry(cov).or_default().push((y, x0, x0 + run as i32));
            }
            x += run;
        }
    }
    levels
        .into_iter()
        .map(|(cov, spans)| (cov, Region::from_spans(spans)))
        .collect()
}

fn collect_edges(path: &BezPath, tolerance: f64, edges: &mut Vec<Edge>) {
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;
    let push = |edges: &mut Vec<Edge>, a: Point, b: Point| {
        if a.y == b.y {
            return;
        }
        let (p, q, winding) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };
        edges.push(Edge {
            x0: p.x,
            y0: p.y,
            x1: q.x,
            y1: q.y,
            winding,
        });
    };
    kurbo::flatten(path.iter(), tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            if last != start {
                push(edges, last, start);
            }
            start = p;
            last = p;
        }
        PathEl::LineTo(p) => {
            push(edges, last, p);
            last = p;
        }
        PathEl::ClosePath => {
            push(edges, last, start);
            last = start;
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    if last != start {
        push(edges, last, start);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scanline.rs"]
mod tests;
