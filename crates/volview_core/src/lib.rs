//! Core volume-viewer domain logic that stays independent of GPU backends and UI shells.
//!
//! - configuration shared between the UI and the GPU layer
//! - the volume buffer and the file-to-renderer axis transform
//! - the three-point opacity transfer curve driven by the sliders
//! - colormaps, the optional label mask and axis-aligned slices
//! - HDF5 loading (behind the default `hdf5` feature)
//! - the loaded/unloaded viewer session

pub mod colormap;
pub mod config;
pub mod error;
pub mod gpu;
#[cfg(feature = "hdf5")]
pub mod h5;
pub mod labels;
pub mod opacity;
pub mod session;
pub mod slice;
pub mod volume;

/// Scalar type used for positions, opacities and shading coefficients.
pub type Scalar = f32;

/// Raw sample type stored in the volume.
pub type Sample = u16;

pub use colormap::Colormap;
pub use error::{LoadError, Result};
pub use gpu::RenderUniforms;
pub use labels::{Label, LabelBuffer, LabelPalette, LabelVolume};
pub use opacity::{ControlPoint, OpacityCurve, SliderPositions};
pub use session::{DisplaySettings, LoadedVolume, Session, ViewerState};
pub use slice::{Slice, SliceAxis};
pub use volume::{Extents, VolumeBuffer, VolumeImage};
