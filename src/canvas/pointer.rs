//! Pointer input — mouse and touch funnel into one client-space position.

use super::Point;

/// One active touch contact, in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub client_x: f32,
    pub client_y: f32,
}

/// A raw pointer event as delivered by the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Mouse { client_x: f32, client_y: f32 },
    Touch { touches: Vec<TouchPoint> },
}

impl PointerInput {
    pub fn mouse(client_x: f32, client_y: f32) -> Self {
        Self::Mouse { client_x, client_y }
    }

    pub fn touch(client_x: f32, client_y: f32) -> Self {
        Self::Touch {
            touches: vec![TouchPoint { client_x, client_y }],
        }
    }

    /// Client position of the event. Only the first touch counts.
    pub fn client_position(&self) -> Option<Point> {
        match self {
            Self::Mouse { client_x, client_y } => Some(Point::new(*client_x, *client_y)),
            Self::Touch { touches } => touches
                .first()
                .map(|t| Point::new(t.client_x, t.client_y)),
        }
    }
}

/// Translate a client position into surface-local coordinates.
pub(super) fn to_local(client: Point, origin: Point) -> Point {
    Point::new(client.x - origin.x, client.y - origin.y)
}
