//! WGSL sources for the volume ray caster.

pub mod render {
    /// Full-screen triangle plus front-to-back composite ray marching.
    pub const RAYCAST: &str = include_str!("kernels/raycast.wgsl");
}
