/// Shelf packing cursor: items go left to right, rows top to bottom, and a
/// row is as tall as its tallest item.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ShelfCursor {
    pub x: u32,
    pub y: u32,
    pub row_height: u32,
}

impl ShelfCursor {
    /// Computes where a `width x height` item goes in a `bounds` sized area.
    ///
    /// Returns the item origin and the cursor that follows it, or `None` when
    /// the item does not fit. `self` is never modified.
    pub fn place(self, width: u32, height: u32, bounds: (u32, u32)) -> Option<((u32, u32), ShelfCursor)> {
        let (bound_w, bound_h) = bounds;
        if width > bound_w {
            return None;
        }

        let mut cursor = self;
        if cursor.x + width > bound_w {
            cursor.y += cursor.row_height;
            cursor.x = 0;
            cursor.row_height = 0;
        }

        if cursor.y + height > bound_h {
            return None;
        }

        let origin = (cursor.x, cursor.y);
        cursor.x += width;
        cursor.row_height = cursor.row_height.max(height);
        Some((origin, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: (u32, u32) = (64, 64);

    #[test]
    fn fills_rows_left_to_right() {
        let c = ShelfCursor::default();
        let (a, c) = c.place(32, 32, BOUNDS).unwrap();
        let (b, c) = c.place(32, 16, BOUNDS).unwrap();
        assert_eq!(a, (0, 0));
        assert_eq!(b, (32, 0));
        assert_eq!(c, ShelfCursor { x: 64, y: 0, row_height: 32 });
    }

    #[test]
    fn wraps_below_tallest_item() {
        let c = ShelfCursor { x: 40, y: 0, row_height: 20 };
        let (origin, next) = c.place(32, 8, BOUNDS).unwrap();
        assert_eq!(origin, (0, 20));
        assert_eq!(next, ShelfCursor { x: 32, y: 20, row_height: 8 });
    }

    #[test]
    fn rejects_items_past_the_bottom() {
        let c = ShelfCursor { x: 64, y: 32, row_height: 32 };
        assert!(c.place(32, 32, BOUNDS).is_none());
    }

    #[test]
    fn rejects_items_wider_than_the_area() {
        assert!(ShelfCursor::default().place(65, 1, BOUNDS).is_none());
    }
}
