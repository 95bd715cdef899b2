//! Angles and diagram positions shared by the project model.

use std::cell::Cell;
use std::f64::consts::PI;
use std::fmt;

use crate::events::EventEmitter;

/// Half-extent of the square block-diagram scene. Positions clamp into
/// `[-DIAGRAM_HALF_EXTENT, DIAGRAM_HALF_EXTENT]` on both axes.
pub const DIAGRAM_HALF_EXTENT: i32 = 500;

/// Normalize an angle in radians into `[0, 2*pi)`.
pub fn clip_angle(val: f64) -> f64 {
    let mut val = val % (2.0 * PI);
    if val < 0.0 {
        val += 2.0 * PI;
    }
    val
}

/// Events emitted by an [`Angle`].
#[derive(Debug)]
pub struct AngleEvents {
    /// New value in radians, emitted on actual change only.
    pub value: EventEmitter<f64>,
}

/// An angle kept in `[0, 2*pi)`.
///
/// Radians internally; the view side works in degrees, and the serialized
/// form is the rounded integer degree.
pub struct Angle {
    rad: Cell<f64>,
    pub events: AngleEvents,
}

impl Angle {
    pub fn from_rad(val: f64) -> Self {
        Self {
            rad: Cell::new(clip_angle(val)),
            events: AngleEvents {
                value: EventEmitter::new(),
            },
        }
    }

    pub fn from_deg(val: f64) -> Self {
        Self::from_rad(val.to_radians())
    }

    pub fn rad(&self) -> f64 {
        self.rad.get()
    }

    pub fn deg(&self) -> f64 {
        self.rad.get().to_degrees()
    }

    /// The rounded integer degree used on the wire.
    pub fn int_deg(&self) -> i64 {
        self.deg().round() as i64
    }

    /// Set the angle in radians; all angle-setting goes through here.
    pub fn set_rad(&self, val: f64) {
        let new_val = clip_angle(val);
        if self.rad.get() != new_val {
            self.rad.set(new_val);
            self.events.value.emit(&new_val);
        }
    }

    pub fn set_deg(&self, val: f64) {
        self.set_rad(val.to_radians());
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Angle({})", self.rad.get())
    }
}

/// Events emitted by a [`Point`], one per axis.
#[derive(Debug)]
pub struct PointEvents {
    pub x: EventEmitter<Option<i32>>,
    pub y: EventEmitter<Option<i32>>,
}

/// An optional integer position on the block diagram.
///
/// Unset axes mark a placement that has not been made yet; set values clamp
/// into the diagram domain.
pub struct Point {
    x: Cell<Option<i32>>,
    y: Cell<Option<i32>>,
    pub events: PointEvents,
}

impl Point {
    pub fn new(x: Option<i32>, y: Option<i32>) -> Self {
        Self {
            x: Cell::new(x.map(clamp_coord)),
            y: Cell::new(y.map(clamp_coord)),
            events: PointEvents {
                x: EventEmitter::new(),
                y: EventEmitter::new(),
            },
        }
    }

    pub fn unset() -> Self {
        Self::new(None, None)
    }

    pub fn x(&self) -> Option<i32> {
        self.x.get()
    }

    pub fn y(&self) -> Option<i32> {
        self.y.get()
    }

    pub fn set_x(&self, val: Option<i32>) {
        let new_val = val.map(clamp_coord);
        if self.x.get() != new_val {
            self.x.set(new_val);
            self.events.x.emit(&new_val);
        }
    }

    pub fn set_y(&self, val: Option<i32>) {
        let new_val = val.map(clamp_coord);
        if self.y.get() != new_val {
            self.y.set(new_val);
            self.events.y.emit(&new_val);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x.get().is_some() && self.y.get().is_some()
    }

    pub fn as_tuple(&self) -> (Option<i32>, Option<i32>) {
        (self.x.get(), self.y.get())
    }
}

fn clamp_coord(val: i32) -> i32 {
    val.clamp(-DIAGRAM_HALF_EXTENT, DIAGRAM_HALF_EXTENT)
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point(x={:?}, y={:?})", self.x.get(), self.y.get())
    }
}
