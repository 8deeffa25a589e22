use glam::{Mat4, Vec3};

use crate::input::{InputState, Key};

/// Yaw-only model rotation driven by J/L.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelSpin {
    pub angle: f32,
    /// Radians per second while a key is held.
    pub speed: f32,
    pub scale: f32,
    pub offset: Vec3,
}

impl ModelSpin {
    pub fn new(scale: f32) -> Self {
        Self {
            angle: 0.0,
            speed: 3.0,
            scale,
            offset: Vec3::ZERO,
        }
    }

    /// J spins counter-clockwise seen from above, L clockwise.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        let dir = input.axis(Key::L, Key::J);
        if dir != 0.0 {
            self.angle = (self.angle + dir * self.speed * dt).rem_euclid(std::f32::consts::TAU);
        }
    }

    /// World transform: scale, then yaw, then offset.
    pub fn world(&self) -> Mat4 {
        Mat4::from_translation(self.offset)
            * Mat4::from_rotation_y(self.angle)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

impl Default for ModelSpin {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, InputFrame, KeyState, Modifiers};

    fn hold(key: Key) -> InputState {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
        state
    }

    #[test]
    fn j_and_l_spin_in_opposite_directions() {
        let mut a = ModelSpin::default();
        a.update(&hold(Key::J), 0.1);
        assert!((a.angle - 0.3).abs() < 1e-6);

        let mut b = ModelSpin::default();
        b.update(&hold(Key::L), 0.1);
        assert!((b.angle - (std::f32::consts::TAU - 0.3)).abs() < 1e-5);
    }

    #[test]
    fn idle_keeps_angle() {
        let mut s = ModelSpin::default();
        s.update(&InputState::default(), 1.0);
        assert_eq!(s.angle, 0.0);
    }

    #[test]
    fn world_applies_scale_before_offset() {
        let mut s = ModelSpin::new(0.1);
        s.offset = Vec3::new(0.0, 2.0, 0.0);
        let p = s.world().transform_point3(Vec3::new(10.0, 0.0, 0.0));
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }
}
