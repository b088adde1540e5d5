use crate::math::Vec3;

pub const PITCH_LIMIT_DEGREES: f64 = 89.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub pitch: f64,
    pub yaw: f64,
}

impl Orientation {
    pub fn clamped(self) -> Self {
        Self {
            pitch: clamp_pitch(self.pitch),
            yaw: wrap_yaw(self.yaw),
        }
    }
}

pub fn clamp_pitch(pitch: f64) -> f64 {
    pitch.clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES)
}

/// Wraps a yaw into `(-180, 180]` using `((yaw + 180) mod 360) - 180`.
/// Values already in range are returned untouched, which keeps the wrap
/// exactly idempotent.
pub fn wrap_yaw(yaw: f64) -> f64 {
    if yaw > -180.0 && yaw <= 180.0 {
        return yaw;
    }
    let wrapped = (yaw + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub orientation: Orientation,
}

/// Last known-good player samples. A missing sample yields the previous value.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    last_orientation: Orientation,
    last_position: Vec3,
}

impl StateStore {
    pub fn update_orientation(&mut self, sample: Option<Orientation>) -> Orientation {
        if let Some(orientation) = sample {
            self.last_orientation = orientation.clamped();
        }
        self.last_orientation
    }

    pub fn update_position(&mut self, sample: Option<Vec3>) -> Vec3 {
        if let Some(position) = sample {
            self.last_position = position;
        }
        self.last_position
    }

    pub fn player_state(&self) -> PlayerState {
        PlayerState {
            position: self.last_position,
            orientation: self.last_orientation,
        }
    }
}
