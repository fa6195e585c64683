//! Picks where the next commentary bubble goes.
//!
//! Anchors are tried in order: recognized text, the focused window's edges,
//! then a fixed grid on the active display. The engine remembers the last
//! anchor so consecutive bubbles don't land on the same spot.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::display::{clamp_origin, DisplayLayout};
use crate::geometry::{Point, Rect, Size};
use crate::models::TextRegion;

const TEXT_ANCHOR_CANDIDATES: usize = 5;
/// 200 points, squared.
const REPEAT_RADIUS_SQUARED: f64 = 40_000.0;
const FOCUS_EDGE_OFFSET: f64 = 72.0;
const DEFAULT_JITTER: f64 = 16.0;
const SCREEN_MARGIN: f64 = 20.0;
const FALLBACK_ORIGIN: Point = Point::new(60.0, 60.0);

const GRID_ANCHORS: [(f64, f64); 5] = [
    (0.25, 0.75),
    (0.75, 0.75),
    (0.5, 0.55),
    (0.25, 0.35),
    (0.75, 0.35),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementHints<'a> {
    pub cursor: Option<Point>,
    pub focus_bounds: Option<Rect>,
    pub text_regions: &'a [TextRegion],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    TextRegion,
    FocusBounds,
    FixedGrid(usize),
    /// No display information was available.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point,
    pub source: AnchorSource,
}

pub struct PlacementEngine {
    last_grid_index: Option<usize>,
    rotation: usize,
    last_center: Option<Point>,
    jitter: f64,
    rng: StdRng,
}

impl PlacementEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), DEFAULT_JITTER)
    }

    /// Deterministic engine for replay and tests. A `jitter` of zero places
    /// bubbles exactly on their anchors.
    pub fn with_rng(rng: StdRng, jitter: f64) -> Self {
        Self {
            last_grid_index: None,
            rotation: 0,
            last_center: None,
            jitter: jitter.abs(),
            rng,
        }
    }

    pub fn last_center(&self) -> Option<Point> {
        self.last_center
    }

    pub fn last_grid_index(&self) -> Option<usize> {
        self.last_grid_index
    }

    /// Origin (top/left corner) for a bubble of `bubble` size.
    pub fn place(&mut self, bubble: Size, hints: &PlacementHints<'_>, displays: &DisplayLayout) -> Point {
        self.place_detailed(bubble, hints, displays).origin
    }

    pub fn place_detailed(
        &mut self,
        bubble: Size,
        hints: &PlacementHints<'_>,
        displays: &DisplayLayout,
    ) -> Placement {
        const FALLBACK: Placement = Placement {
            origin: FALLBACK_ORIGIN,
            source: AnchorSource::Fallback,
        };

        // Without a display there is nothing to clamp against, whatever the anchor.
        if displays.is_empty() {
            return FALLBACK;
        }

        let (center, source) = if let Some(center) = self.text_region_anchor(hints.text_regions) {
            (center, AnchorSource::TextRegion)
        } else if let Some(focus) = hints.focus_bounds {
            (self.focus_anchor(&focus), AnchorSource::FocusBounds)
        } else {
            match self.grid_anchor(hints.cursor, displays) {
                Some((index, center)) => (center, AnchorSource::FixedGrid(index)),
                None => return FALLBACK,
            }
        };

        let Some(visible) = displays.resolve(Some(center)).map(|display| display.visible) else {
            return FALLBACK;
        };

        self.last_center = Some(center);

        let origin = self.to_origin(center, bubble);
        Placement {
            origin: clamp_origin(origin, bubble, visible, SCREEN_MARGIN),
            source,
        }
    }

    fn text_region_anchor(&self, regions: &[TextRegion]) -> Option<Point> {
        if regions.is_empty() {
            return None;
        }

        let mut ranked: Vec<&TextRegion> = regions.iter().collect();
        ranked.sort_by(|lhs, rhs| {
            rhs.confidence
                .total_cmp(&lhs.confidence)
                .then_with(|| rhs.area().total_cmp(&lhs.area()))
        });

        ranked
            .into_iter()
            .take(TEXT_ANCHOR_CANDIDATES)
            .map(TextRegion::center)
            .find(|center| match self.last_center {
                Some(last) => center.distance_squared(&last) >= REPEAT_RADIUS_SQUARED,
                None => true,
            })
    }

    fn focus_anchor(&self, focus: &Rect) -> Point {
        let candidates = [
            Point::new(focus.max_x() + FOCUS_EDGE_OFFSET, focus.mid_y()),
            Point::new(focus.mid_x(), focus.max_y() + FOCUS_EDGE_OFFSET),
            Point::new(focus.min_x() - FOCUS_EDGE_OFFSET, focus.mid_y()),
            Point::new(focus.mid_x(), focus.min_y() - FOCUS_EDGE_OFFSET),
        ];

        let Some(last) = self.last_center else {
            return candidates[0];
        };

        // Farthest from the previous bubble, first candidate on ties.
        let mut best = candidates[0];
        let mut best_distance = best.distance_squared(&last);
        for candidate in &candidates[1..] {
            let distance = candidate.distance_squared(&last);
            if distance > best_distance {
                best = *candidate;
                best_distance = distance;
            }
        }
        best
    }

    fn grid_anchor(&mut self, cursor: Option<Point>, displays: &DisplayLayout) -> Option<(usize, Point)> {
        let visible = displays.resolve(cursor)?.visible;

        let centers: Vec<Point> = GRID_ANCHORS
            .iter()
            .map(|(nx, ny)| {
                Point::new(
                    visible.min_x() + nx * visible.size.width,
                    visible.min_y() + ny * visible.size.height,
                )
            })
            .collect();

        let farthest = cursor.and_then(|cursor| {
            let mut best: Option<(usize, f64)> = None;
            for (index, center) in centers.iter().enumerate() {
                if Some(index) == self.last_grid_index {
                    continue;
                }
                let distance = center.distance_squared(&cursor);
                if best.map_or(distance.is_finite(), |(_, best_distance)| distance > best_distance) {
                    best = Some((index, distance));
                }
            }
            best.map(|(index, _)| index)
        });

        let chosen = farthest.unwrap_or(self.rotation % centers.len());
        self.rotation = (chosen + 1) % centers.len();
        self.last_grid_index = Some(chosen);

        Some((chosen, centers[chosen]))
    }

    fn to_origin(&mut self, center: Point, bubble: Size) -> Point {
        let mut origin = Point::new(center.x - bubble.width / 2.0, center.y - bubble.height / 2.0);
        if self.jitter > 0.0 {
            origin.x += self.rng.gen_range(-self.jitter..=self.jitter);
            origin.y += self.rng.gen_range(-self.jitter..=self.jitter);
        }
        origin
    }
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new()
    }
}
