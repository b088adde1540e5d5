use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drops the height axis; targeting works on the ground plane.
    pub const fn planar(self) -> Vec2 {
        Vec2 {
            x: self.x,
            y: self.y,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unsigned shortest angle, in degrees, between the view yaw and the bearing
/// from `from` to `to`. Always within `[0, 180]` for finite inputs.
pub fn angular_offset(from: Vec2, to: Vec2, view_yaw_degrees: f64) -> f64 {
    let bearing = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    let delta = (bearing - view_yaw_degrees).abs().rem_euclid(360.0);
    delta.min(360.0 - delta)
}

pub fn planar_distance(a: Vec2, b: Vec2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}
