use crate::geometry::{Point, Rect, Size};

/// Upper bound on the area sent for analysis around the cursor.
pub const DEFAULT_CROP_SIZE: Size = Size::new(900.0, 650.0);

/// Crop rectangle centred on `cursor`, shrunk to fit and shifted to stay
/// inside `display_frame`.
pub fn capture_region(cursor: Point, display_frame: Rect, crop: Size) -> Rect {
    let width = crop.width.min(display_frame.size.width);
    let height = crop.height.min(display_frame.size.height);

    let mut x = cursor.x - width / 2.0;
    let mut y = cursor.y - height / 2.0;

    if x < display_frame.min_x() {
        x = display_frame.min_x();
    }
    if x + width > display_frame.max_x() {
        x = display_frame.max_x() - width;
    }
    if y < display_frame.min_y() {
        y = display_frame.min_y();
    }
    if y + height > display_frame.max_y() {
        y = display_frame.max_y() - height;
    }

    Rect::new(x, y, width, height)
}
