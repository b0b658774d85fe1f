//! Camera state and a keyboard controller that moves it between frames.
//!
//! The camera is a position plus pitch/yaw/roll in degrees. With all angles
//! at zero it looks down `-z`; positive yaw turns to the right.

use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::math::{Transformation, Vector3f};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vector3f,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Camera {
    pub fn new(position: Vector3f, pitch: f32, yaw: f32, roll: f32) -> Self {
        Self {
            position,
            pitch,
            yaw,
            roll,
        }
    }

    /// World-to-eye matrix: roll, pitch and yaw, then the inverse translation.
    pub fn view_matrix(&self) -> Transformation {
        let mut view = Transformation::new();
        view.rotate(self.roll, 0.0, 0.0, 1.0)
            .rotate(self.pitch, 1.0, 0.0, 0.0)
            .rotate(self.yaw, 0.0, 1.0, 0.0)
            .translate(-self.position.x, -self.position.y, -self.position.z);
        view
    }

    /// Unit vector the camera faces, ignoring pitch.
    pub fn forward(&self) -> Vector3f {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        Vector3f::new(sin, 0.0, -cos)
    }

    pub fn right(&self) -> Vector3f {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        Vector3f::new(cos, 0.0, sin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3f::new(0.0, 1.0, 0.0), 0.0, -90.0, 0.0)
    }
}

/// Keyboard driven fly camera.
///
/// WASD moves in the ground plane, Space/Shift change height, the arrow keys
/// turn and tilt.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    /// World units per second.
    speed: f32,
    /// Degrees per second.
    turn_speed: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_left: f32,
    amount_right: f32,
    amount_up: f32,
    amount_down: f32,
    turn_left: f32,
    turn_right: f32,
    look_up: f32,
    look_down: f32,
}

impl CameraController {
    pub fn new(speed: f32, turn_speed: f32) -> Self {
        Self {
            speed,
            turn_speed,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_left: 0.0,
            amount_right: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            turn_left: 0.0,
            turn_right: 0.0,
            look_up: 0.0,
            look_down: 0.0,
        }
    }

    /// Returns whether the key is one the controller reacts to.
    pub fn process_key(&mut self, key: PhysicalKey, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        let PhysicalKey::Code(code) = key else {
            return false;
        };
        let slot = match code {
            KeyCode::KeyW => &mut self.amount_forward,
            KeyCode::KeyS => &mut self.amount_backward,
            KeyCode::KeyA => &mut self.amount_left,
            KeyCode::KeyD => &mut self.amount_right,
            KeyCode::Space => &mut self.amount_up,
            KeyCode::ShiftLeft => &mut self.amount_down,
            KeyCode::ArrowLeft => &mut self.turn_left,
            KeyCode::ArrowRight => &mut self.turn_right,
            KeyCode::ArrowUp => &mut self.look_up,
            KeyCode::ArrowDown => &mut self.look_down,
            _ => return false,
        };
        *slot = amount;
        true
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        ..
                    },
                ..
            } => self.process_key(*physical_key, *state),
            _ => false,
        }
    }

    pub fn update(&self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();
        let forward = camera.forward();
        let right = camera.right();
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;
        camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;

        camera.yaw += (self.turn_right - self.turn_left) * self.turn_speed * dt;
        camera.pitch += (self.look_down - self.look_up) * self.turn_speed * dt;
        camera.pitch = camera.pitch.clamp(-89.0, 89.0);
    }
}
