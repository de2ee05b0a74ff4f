//! Typed failures of the load-and-build sequence.

use thiserror::Error;

use crate::Extents;

/// Everything that can go wrong between pressing "Load file" and seeing a volume.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The user closed the file dialog without picking a file.
    #[error("file selection cancelled")]
    DialogCancelled,

    /// The file does not contain a dataset with the expected name.
    #[error("dataset '{name}' not found")]
    DatasetNotFound { name: String },

    /// The dataset is not three-dimensional.
    #[error("dataset has rank {rank}, expected 3")]
    WrongRank { rank: usize },

    /// The sample count does not match the product of the extents.
    #[error("dimension mismatch: extents describe {expected} samples, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The dataset holds something other than integers.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// One of the extents is zero.
    #[error("volume has no samples")]
    EmptyVolume,

    /// The sample count overflows the address space.
    #[error("volume of {}x{}x{} samples is too large", .extents.x, .extents.y, .extents.z)]
    TooLarge { extents: Extents },

    /// The label dataset does not cover the same grid as the volume.
    #[error(
        "label grid {}x{}x{} does not match volume grid {}x{}x{}",
        .labels.x, .labels.y, .labels.z, .volume.x, .volume.y, .volume.z
    )]
    LabelGridMismatch { volume: Extents, labels: Extents },

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPU resources for the scene could not be created.
    #[error("GPU error: {0}")]
    Gpu(String),
}

impl LoadError {
    /// True for a cancelled dialog, which leaves the viewer unchanged.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LoadError::DialogCancelled)
    }
}

/// A specialized Result type for loading operations.
pub type Result<T> = std::result::Result<T, LoadError>;
