use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use postfx::{Parameters, PARAM_SLOTS};

/// std140 image of the `PassParams` block: parameters packed four floats per
/// slot in declaration order.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct PassUniforms {
    pub slots: [[f32; 4]; PARAM_SLOTS],
}

impl PassUniforms {
    pub fn from_params(params: &Parameters) -> Self {
        Self {
            slots: params.pack(),
        }
    }
}

/// `SceneParams` block of the matcap shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct SceneUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

impl SceneUniforms {
    pub fn new(view_projection: Mat4, view: Mat4, model: Mat4) -> Self {
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        }
    }
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use postfx::PassKind;

    use super::*;

    #[test]
    fn layouts_match_std140_sizes() {
        assert_eq!(std::mem::size_of::<PassUniforms>(), 16 * PARAM_SLOTS);
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 3 * 64);
    }

    #[test]
    fn pass_uniforms_follow_packed_parameters() {
        let params = Parameters::defaults(PassKind::Grain.spec());
        let uniforms = PassUniforms::from_params(&params);
        assert_eq!(uniforms.slots, params.pack());
    }
}
