//! A keyboard steered entity that walks over terrain, and the camera that
//! follows it.

use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    data_structures::{camera::Camera, entity::Entity, terrain::Terrain},
    math::Vector3f,
};

/// World units per second.
const RUN_SPEED: f32 = 90.0;
/// Degrees per second.
const TURN_SPEED: f32 = 160.0;
/// World units per second squared.
const GRAVITY: f32 = -50.0;
/// Upwards speed at take-off.
const JUMP_POWER: f32 = 30.0;

#[derive(Debug, Clone)]
pub struct Player {
    pub entity: Entity,
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    jump: bool,
    upwards_speed: f32,
    is_in_air: bool,
}

impl Player {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            forward: false,
            backward: false,
            left: false,
            right: false,
            jump: false,
            upwards_speed: 0.0,
            is_in_air: false,
        }
    }

    pub fn position(&self) -> Vector3f {
        self.entity.position
    }

    pub fn is_in_air(&self) -> bool {
        self.is_in_air
    }

    /// W/S run, A/D turn, Space jumps. Returns whether the key was used.
    pub fn process_key(&mut self, key: PhysicalKey, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        let PhysicalKey::Code(code) = key else {
            return false;
        };
        let slot = match code {
            KeyCode::KeyW => &mut self.forward,
            KeyCode::KeyS => &mut self.backward,
            KeyCode::KeyA => &mut self.left,
            KeyCode::KeyD => &mut self.right,
            KeyCode::Space => &mut self.jump,
            _ => return false,
        };
        *slot = pressed;
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

    /// Turns and runs for `dt`, then falls back onto `terrain`.
    ///
    /// The player faces model `+z` rotated by `rot_y`, the same direction the
    /// entity transformation turns the model.
    pub fn move_on(&mut self, dt: Duration, terrain: &Terrain) {
        let dt = dt.as_secs_f32();
        let turn = axis(self.left, self.right) * TURN_SPEED;
        self.entity.increase_rotation(0.0, turn * dt, 0.0);

        let distance = axis(self.backward, self.forward) * RUN_SPEED * dt;
        let (sin, cos) = self.entity.rot_y.to_radians().sin_cos();
        self.entity.increase_position(distance * sin, 0.0, distance * cos);

        if self.jump && !self.is_in_air {
            self.upwards_speed = JUMP_POWER;
            self.is_in_air = true;
        }
        self.upwards_speed += GRAVITY * dt;
        self.entity.increase_position(0.0, self.upwards_speed * dt, 0.0);

        let position = self.entity.position;
        let ground = terrain.height_of_terrain(position.x, position.z);
        if position.y <= ground {
            self.upwards_speed = 0.0;
            self.is_in_air = false;
            self.entity.position.y = ground;
        }
    }
}

fn axis(negative: bool, positive: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

/// Keeps a [`Camera`] behind and above a [`Player`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdPersonCamera {
    pub distance_from_player: f32,
    /// Degrees the camera is swung around the player, 0 is straight behind.
    pub angle_around_player: f32,
    /// Degrees the camera looks down onto the player.
    pub pitch: f32,
}

/// Height above the player's feet the camera aims at.
const TARGET_HEIGHT: f32 = 10.0;
const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 200.0;

impl Default for ThirdPersonCamera {
    fn default() -> Self {
        Self {
            distance_from_player: 25.0,
            angle_around_player: 0.0,
            pitch: 20.0,
        }
    }
}

impl ThirdPersonCamera {
    /// The mouse wheel zooms; arrow keys swing around the player and tilt.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 20.0,
                };
                self.zoom(lines * 2.0);
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                match code {
                    KeyCode::ArrowLeft => self.angle_around_player -= 5.0,
                    KeyCode::ArrowRight => self.angle_around_player += 5.0,
                    KeyCode::ArrowUp => self.pitch = (self.pitch - 5.0).max(0.0),
                    KeyCode::ArrowDown => self.pitch = (self.pitch + 5.0).min(89.0),
                    _ => return false,
                }
                true
            }
            _ => false,
        }
    }

    /// Moves closer for positive `amount`.
    pub fn zoom(&mut self, amount: f32) {
        self.distance_from_player = (self.distance_from_player - amount).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn update(&self, camera: &mut Camera, player: &Player) {
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        let horizontal = self.distance_from_player * cos_pitch;
        let vertical = self.distance_from_player * sin_pitch;

        let theta = player.entity.rot_y + self.angle_around_player;
        let (sin, cos) = theta.to_radians().sin_cos();
        let target = player.position();
        camera.position = Vector3f::new(
            target.x - horizontal * sin,
            target.y + TARGET_HEIGHT + vertical,
            target.z - horizontal * cos,
        );
        camera.pitch = self.pitch;
        camera.yaw = 180.0 - theta;
        camera.roll = 0.0;
    }
}
