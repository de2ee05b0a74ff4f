//! Reads the rank-3 sample volume and the optional label mask out of an HDF5 file.

use std::path::Path;

use hdf5::{types::TypeDescriptor, Dataset};
use tracing::{debug, info};

use crate::{labels::LabelBuffer, Extents, LoadError, Result, Sample, VolumeBuffer};

fn open(path: &Path) -> Result<hdf5::File> {
    // hdf5 reports a missing file as a generic library error
    std::fs::metadata(path)?;
    Ok(hdf5::File::open(path)?)
}

/// Shape of an integer rank-3 dataset.
fn integer_extents(dataset: &Dataset) -> Result<Extents> {
    let extents = Extents::from_shape(&dataset.shape())?;
    let descriptor = dataset.dtype()?.to_descriptor()?;
    match descriptor {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {}
        other => return Err(LoadError::UnsupportedElementType(format!("{other:?}"))),
    }
    debug!(?descriptor, "dataset element type");
    Ok(extents)
}

/// Opens `path` read-only and reads the dataset `name` in file ordering.
pub fn read_volume(path: impl AsRef<Path>, name: &str) -> Result<VolumeBuffer> {
    let path = path.as_ref();
    let file = open(path)?;
    if !file.link_exists(name) {
        return Err(LoadError::DatasetNotFound {
            name: name.to_owned(),
        });
    }
    let dataset = file.dataset(name)?;

    let extents = integer_extents(&dataset)?;
    info!(
        path = %path.display(),
        x = extents.x,
        y = extents.y,
        z = extents.z,
        "reading volume dataset"
    );

    let samples: Vec<Sample> = dataset.read_raw()?;
    VolumeBuffer::new(extents, samples)
}

/// Reads the label dataset `name` if the file has one.
pub fn read_labels(path: impl AsRef<Path>, name: &str) -> Result<Option<LabelBuffer>> {
    let path = path.as_ref();
    let file = open(path)?;
    if !file.link_exists(name) {
        debug!(path = %path.display(), name, "no label dataset");
        return Ok(None);
    }
    let dataset = file.dataset(name)?;
    let extents = integer_extents(&dataset)?;
    info!(path = %path.display(), name, "reading label dataset");

    let labels: Vec<u8> = dataset.read_raw()?;
    LabelBuffer::new(extents, labels).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_volume(dir.path().join("absent.h5"), "volume").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn reads_samples_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.h5");
        let data: Vec<u16> = (0..24).collect();
        {
            let file = hdf5::File::create(&path).unwrap();
            let dataset = file
                .new_dataset::<u16>()
                .shape((2, 3, 4))
                .create("volume")
                .unwrap();
            dataset.write_raw(data.as_slice()).unwrap();
        }

        let buffer = read_volume(&path, "volume").unwrap();
        assert_eq!(buffer.extents(), Extents::new(2, 3, 4));
        assert_eq!(buffer.samples(), data.as_slice());
    }

    #[test]
    fn labels_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masked.h5");
        {
            let file = hdf5::File::create(&path).unwrap();
            file.new_dataset::<u16>()
                .shape((2, 2, 2))
                .create("volume")
                .unwrap()
                .write_raw(&[1u16; 8][..])
                .unwrap();
            file.new_dataset::<u8>()
                .shape((2, 2, 2))
                .create("mask")
                .unwrap()
                .write_raw(&[0u8, 0, 0, 2, 0, 0, 0, 5][..])
                .unwrap();
        }

        let labels = read_labels(&path, "mask").unwrap().unwrap();
        assert_eq!(labels.extents(), Extents::new(2, 2, 2));
        assert!(read_labels(&path, "organs").unwrap().is_none());
    }

    #[test]
    fn rejects_float_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.h5");
        {
            let file = hdf5::File::create(&path).unwrap();
            let dataset = file
                .new_dataset::<f32>()
                .shape((2, 2, 2))
                .create("volume")
                .unwrap();
            dataset.write_raw(&[0.5f32; 8][..]).unwrap();
        }

        let err = read_volume(&path, "volume").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedElementType(_)));
    }
}
