//! CPU-side scene state: which garment and matcap are shown, pointer-driven
//! rotation, model scale and the camera.

use glam::{EulerRot, Mat4, Vec2, Vec3};
use transition::{ModelId, TextureId};

/// Rotation follows the pointer by this fraction each frame.
const ROTATION_LERP: f32 = 0.1;
/// Pointer travel across the full window maps to this many radians.
const ROTATION_RANGE: f32 = 0.2;

const MOBILE_BREAKPOINT: u32 = 768;
const MIN_SCALE: f32 = 2.0;
const MAX_SCALE: f32 = 2.5;

pub const CAMERA_FOV_DEGREES: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;
pub const CAMERA_DISTANCE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    model: Option<ModelId>,
    texture: Option<TextureId>,
    pointer: Vec2,
    rotation: Vec2,
    last_rotation: Vec2,
    velocity: Vec2,
    scale: f32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            model: None,
            texture: None,
            pointer: Vec2::ZERO,
            rotation: Vec2::ZERO,
            last_rotation: Vec2::ZERO,
            velocity: Vec2::ZERO,
            scale: MIN_SCALE,
        }
    }
}

impl SceneState {
    pub fn model(&self) -> Option<&ModelId> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: ModelId) {
        self.model = Some(model);
    }

    pub fn texture(&self) -> Option<&TextureId> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
    }

    /// Pointer normalised to [-1, 1] over the window, y down.
    pub fn pointer(&self) -> [f32; 2] {
        self.pointer.to_array()
    }

    /// Records a cursor position in physical window pixels.
    pub fn set_pointer_from_window(&mut self, x: f32, y: f32, width: u32, height: u32) {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        self.pointer = Vec2::new(
            (x / width * 2.0 - 1.0).clamp(-1.0, 1.0),
            (y / height * 2.0 - 1.0).clamp(-1.0, 1.0),
        );
    }

    /// Eases the rotation toward the pointer and refreshes the per-frame
    /// velocity. Call once per frame.
    pub fn update(&mut self) {
        self.last_rotation = self.rotation;
        let target = Vec2::new(self.pointer.y, self.pointer.x) * ROTATION_RANGE;
        self.rotation = self.rotation.lerp(target, ROTATION_LERP);
        self.velocity = self.rotation - self.last_rotation;
    }

    /// Rotation about the x and y axes, radians.
    pub fn rotation(&self) -> [f32; 2] {
        self.rotation.to_array()
    }

    /// Rotation delta of the last frame as `(y, x)`, the order the chromatic
    /// pass expects.
    pub fn rotation_velocity(&self) -> [f32; 2] {
        [self.velocity.y, self.velocity.x]
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scale = model_scale(width, height);
    }

    /// Places the mesh with `center` at the origin, then scales and rotates.
    pub fn model_matrix(&self, center: [f32; 3]) -> Mat4 {
        Mat4::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, 0.0)
            * Mat4::from_scale(Vec3::splat(self.scale))
            * Mat4::from_translation(-Vec3::from_array(center))
    }
}

/// Garment scale for a logical viewport size.
pub fn model_scale(width: u32, height: u32) -> f32 {
    let (w, h) = (width as f32, height as f32);
    let scale = if width < MOBILE_BREAKPOINT {
        (w / 600.0).min(h / 500.0)
    } else {
        (w / 900.0).min(h / 700.0)
    };
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Self {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, CAMERA_DISTANCE), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(
                CAMERA_FOV_DEGREES.to_radians(),
                aspect,
                CAMERA_NEAR,
                CAMERA_FAR,
            ),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
