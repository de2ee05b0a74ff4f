#![cfg(feature = "hdf5")]

use std::path::{Path, PathBuf};

use volview_core::{
    config::ViewerConfig, h5::read_volume, Extents, LoadError, LoadedVolume, Session,
};

fn write_dataset(path: &Path, name: &str, shape: (usize, usize, usize), data: &[u16]) {
    let file = hdf5::File::create(path).expect("failed to create HDF5 file");
    let dataset = file
        .new_dataset::<u16>()
        .shape(shape)
        .create(name)
        .expect("failed to create dataset");
    dataset.write_raw(data).expect("failed to write dataset");
}

/// Sample value stored at file position (x, y, z) of the 4x4x4 fixture.
fn fixture_value(x: usize, y: usize, z: usize) -> u16 {
    (100 * x + 10 * y + z) as u16
}

fn fixture_samples() -> Vec<u16> {
    let mut data = Vec::with_capacity(64);
    for x in 0..4 {
        for y in 0..4 {
            for z in 0..4 {
                data.push(fixture_value(x, y, z));
            }
        }
    }
    data
}

#[test]
fn file_without_volume_dataset_leaves_session_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.h5");
    write_dataset(&path, "density", (4, 4, 4), &fixture_samples());

    let mut session = Session::new(ViewerConfig::default());
    let mut scene_built = false;
    let err = session
        .load_file(&path, |_| {
            scene_built = true;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, LoadError::DatasetNotFound { ref name } if name == "volume"));
    assert!(!scene_built);
    assert!(!session.state().is_loaded());
}

#[test]
fn rank_two_dataset_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.h5");
    {
        let file = hdf5::File::create(&path).unwrap();
        let dataset = file
            .new_dataset::<u16>()
            .shape((8, 8))
            .create("volume")
            .unwrap();
        dataset.write_raw(&[1u16; 64][..]).unwrap();
    }

    let err = read_volume(&path, "volume").unwrap_err();
    assert!(matches!(err, LoadError::WrongRank { rank: 2 }));
}

#[test]
fn displayed_sample_matches_reindexed_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("known.h5");
    write_dataset(&path, "volume", (4, 4, 4), &fixture_samples());

    let mut session = Session::new(ViewerConfig::default());
    let mut uploaded: Option<Vec<u16>> = None;
    session
        .load_file(&path, |volume: &LoadedVolume| {
            uploaded = Some(volume.image.samples().to_vec());
            Ok(())
        })
        .unwrap();

    let loaded = session.state().loaded().unwrap();
    assert_eq!(loaded.path, PathBuf::from(&path));
    let extents = loaded.image.extents();
    assert_eq!(extents, Extents::new(4, 4, 4));

    // What the scene builder received is the renderer-ordered buffer.
    let uploaded = uploaded.unwrap();
    let (x, y, z) = (3, 1, 2);
    assert_eq!(uploaded[extents.render_index(x, y, z)], fixture_value(x, y, z));
    assert_eq!(uploaded[z * 16 + y * 4 + x], 312);
    assert_eq!(loaded.image.sample(1, 2, 3), Some(fixture_value(1, 2, 3)));
    assert_eq!(loaded.image.range(), (0, 333));
}

#[test]
fn mask_dataset_loads_as_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("masked.h5");
    {
        let file = hdf5::File::create(&path).unwrap();
        file.new_dataset::<u16>()
            .shape((4, 4, 4))
            .create("volume")
            .unwrap()
            .write_raw(&fixture_samples()[..])
            .unwrap();
        let mut mask = vec![0u8; 64];
        // file position (x=3, y=1, z=2)
        mask[3 * 16 + 4 + 2] = 5;
        file.new_dataset::<u8>()
            .shape((4, 4, 4))
            .create("mask")
            .unwrap()
            .write_raw(&mask[..])
            .unwrap();
    }

    let mut session = Session::new(ViewerConfig::default());
    session.load_file(&path, |_| Ok(())).unwrap();
    let labels = session.state().loaded().unwrap().labels.as_ref().unwrap();
    assert_eq!(labels.present(), &[5]);
    assert_eq!(labels.label(3, 1, 2), Some(5));
    assert_eq!(labels.label(2, 1, 3), Some(0));
}

#[test]
fn mismatched_mask_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_mask.h5");
    {
        let file = hdf5::File::create(&path).unwrap();
        file.new_dataset::<u16>()
            .shape((4, 4, 4))
            .create("volume")
            .unwrap()
            .write_raw(&fixture_samples()[..])
            .unwrap();
        file.new_dataset::<u8>()
            .shape((2, 2, 2))
            .create("mask")
            .unwrap()
            .write_raw(&[1u8; 8][..])
            .unwrap();
    }

    let mut session = Session::new(ViewerConfig::default());
    let err = session.load_file(&path, |_| Ok(())).unwrap_err();
    assert!(matches!(err, LoadError::LabelGridMismatch { .. }));
    assert!(!session.state().is_loaded());
}
