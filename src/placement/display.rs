use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// One physical display. `visible` excludes menu bars, docks and the like.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub frame: Rect,
    pub visible: Rect,
}

impl Display {
    pub fn new(frame: Rect, visible: Rect) -> Self {
        Self { frame, visible }
    }

    /// A display with nothing reserved at its edges.
    pub fn full(frame: Rect) -> Self {
        Self::new(frame, frame)
    }
}

/// Display arrangement as last reported by the host. The first entry is the
/// primary display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayLayout {
    displays: Vec<Display>,
}

impl DisplayLayout {
    pub fn new(displays: Vec<Display>) -> Self {
        Self { displays }
    }

    pub fn single(display: Display) -> Self {
        Self::new(vec![display])
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn primary(&self) -> Option<&Display> {
        self.displays.first()
    }

    pub fn containing(&self, point: &Point) -> Option<&Display> {
        self.displays
            .iter()
            .find(|display| display.frame.contains(point))
    }

    /// The display containing `point`, else the primary display.
    pub fn resolve(&self, point: Option<Point>) -> Option<&Display> {
        point
            .and_then(|point| self.containing(&point))
            .or_else(|| self.primary())
    }
}

/// Keeps a `size`-sized rectangle at `origin` inside `bounds` with `margin`
/// on every side. Oversized rectangles are pinned to the near margin.
pub fn clamp_origin(origin: Point, size: Size, bounds: Rect, margin: f64) -> Point {
    let min_x = bounds.min_x() + margin;
    let max_x = bounds.max_x() - size.width - margin;
    let min_y = bounds.min_y() + margin;
    let max_y = bounds.max_y() - size.height - margin;

    Point::new(
        origin.x.min(max_x).max(min_x),
        origin.y.min(max_y).max(min_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> DisplayLayout {
        DisplayLayout::new(vec![
            Display::new(
                Rect::new(0.0, 0.0, 1440.0, 900.0),
                Rect::new(0.0, 0.0, 1440.0, 875.0),
            ),
            Display::full(Rect::new(1440.0, 0.0, 1920.0, 1080.0)),
        ])
    }

    #[test]
    fn resolves_containing_display() {
        let layout = layout();
        let display = layout.resolve(Some(Point::new(2000.0, 500.0))).unwrap();
        assert_eq!(display.frame.min_x(), 1440.0);
    }

    #[test]
    fn falls_back_to_primary() {
        let layout = layout();
        assert_eq!(layout.resolve(Some(Point::new(-50.0, -50.0))), layout.primary());
        assert_eq!(layout.resolve(None), layout.primary());
        assert!(DisplayLayout::default().resolve(None).is_none());
    }

    #[test]
    fn clamp_keeps_margin() {
        let bounds = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let size = Size::new(200.0, 100.0);

        assert_eq!(
            clamp_origin(Point::new(-50.0, 900.0), size, bounds, 20.0),
            Point::new(20.0, 680.0)
        );
        assert_eq!(
            clamp_origin(Point::new(400.0, 300.0), size, bounds, 20.0),
            Point::new(400.0, 300.0)
        );
    }

    #[test]
    fn oversized_bubble_pins_to_near_margin() {
        let bounds = Rect::new(100.0, 100.0, 150.0, 150.0);
        let origin = clamp_origin(Point::new(500.0, 500.0), Size::new(300.0, 300.0), bounds, 20.0);
        assert_eq!(origin, Point::new(120.0, 120.0));
    }
}
