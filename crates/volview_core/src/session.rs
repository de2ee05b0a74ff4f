//! Viewer state: what is loaded, the slider positions, and the current opacity curve.
//!
//! A load only replaces the current state after the file was read and the
//! caller's scene builder succeeded, so a failed load leaves the previous
//! volume (or the unloaded state) untouched.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    colormap::Colormap,
    config::ViewerConfig,
    labels::{LabelBuffer, LabelVolume},
    OpacityCurve, Result, Scalar, SliderPositions, VolumeBuffer, VolumeImage,
};

#[derive(Debug, Clone)]
pub struct LoadedVolume {
    pub path: PathBuf,
    pub image: VolumeImage,
    pub labels: Option<LabelVolume>,
    pub curve: OpacityCurve,
}

/// Presentation choices that do not change the loaded data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySettings {
    pub colormap: Colormap,
    pub show_labels: bool,
    pub label_opacity: Scalar,
}

impl DisplaySettings {
    pub fn initial(config: &ViewerConfig) -> Self {
        Self {
            colormap: config.render.colormap,
            show_labels: config.labels.visible,
            label_opacity: config.labels.opacity,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ViewerState {
    #[default]
    Unloaded,
    Loaded(LoadedVolume),
}

impl ViewerState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ViewerState::Loaded(_))
    }

    pub fn loaded(&self) -> Option<&LoadedVolume> {
        match self {
            ViewerState::Loaded(volume) => Some(volume),
            ViewerState::Unloaded => None,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    config: ViewerConfig,
    sliders: SliderPositions,
    display: DisplaySettings,
    state: ViewerState,
}

impl Session {
    pub fn new(config: ViewerConfig) -> Self {
        let sliders = SliderPositions::initial(&config.transfer);
        let display = DisplaySettings::initial(&config);
        Self {
            config,
            sliders,
            display,
            state: ViewerState::Unloaded,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn sliders(&self) -> SliderPositions {
        self.sliders
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn display(&self) -> DisplaySettings {
        self.display
    }

    pub fn set_display(&mut self, display: DisplaySettings) {
        self.display = DisplaySettings {
            label_opacity: display.label_opacity.clamp(0.0, 1.0),
            ..display
        };
    }

    /// Opacity the renderer should give label surfaces; zero hides them.
    pub fn label_opacity(&self) -> Scalar {
        let has_labels = self
            .state
            .loaded()
            .is_some_and(|volume| volume.labels.as_ref().is_some_and(|l| !l.present().is_empty()));
        if has_labels && self.display.show_labels {
            self.display.label_opacity
        } else {
            0.0
        }
    }

    pub fn current_curve(&self) -> OpacityCurve {
        OpacityCurve::from_sliders(&self.config.transfer, self.sliders)
    }

    /// Turns raw buffers into a loaded volume and hands it to `build_scene`.
    ///
    /// The state switches to [`ViewerState::Loaded`] only if the labels fit the
    /// volume grid and `build_scene` succeeds.
    pub fn load_buffer<F>(
        &mut self,
        path: &Path,
        buffer: VolumeBuffer,
        labels: Option<LabelBuffer>,
        build_scene: F,
    ) -> Result<()>
    where
        F: FnOnce(&LoadedVolume) -> Result<()>,
    {
        let extents = buffer.extents();
        let labels = labels.map(|l| l.into_volume(extents)).transpose()?;
        let volume = &self.config.volume;
        let loaded = LoadedVolume {
            path: path.to_path_buf(),
            image: buffer.into_image(volume.spacing, volume.origin),
            labels,
            curve: self.current_curve(),
        };
        build_scene(&loaded)?;
        info!(
            path = %path.display(),
            x = extents.x,
            y = extents.y,
            z = extents.z,
            range = ?loaded.image.range(),
            labels = ?loaded.labels.as_ref().map(LabelVolume::present),
            "volume loaded"
        );
        self.state = ViewerState::Loaded(loaded);
        Ok(())
    }

    /// Reads `path` with the configured dataset names and loads it.
    #[cfg(feature = "hdf5")]
    pub fn load_file<F>(&mut self, path: &Path, build_scene: F) -> Result<()>
    where
        F: FnOnce(&LoadedVolume) -> Result<()>,
    {
        let read = crate::h5::read_volume(path, &self.config.volume.dataset).and_then(|buffer| {
            let labels = crate::h5::read_labels(path, &self.config.labels.dataset)?;
            Ok((buffer, labels))
        });
        let (buffer, labels) = read.inspect_err(|err| {
            tracing::error!(path = %path.display(), "failed to read volume: {err}");
        })?;
        self.load_buffer(path, buffer, labels, build_scene).inspect_err(|err| {
            tracing::error!(path = %path.display(), "failed to build scene: {err}");
        })
    }

    /// Loads whatever `pick` returns; `None` means the user cancelled.
    #[cfg(feature = "hdf5")]
    pub fn load_picked<P, F>(&mut self, pick: P, build_scene: F) -> Result<()>
    where
        P: FnOnce() -> Option<PathBuf>,
        F: FnOnce(&LoadedVolume) -> Result<()>,
    {
        let Some(path) = pick() else {
            info!("file selection cancelled");
            return Err(crate::LoadError::DialogCancelled);
        };
        self.load_file(&path, build_scene)
    }

    /// Records new slider positions.
    ///
    /// Returns the recomputed curve when a volume is loaded and `None` otherwise,
    /// in which case there is nothing to update.
    pub fn set_sliders(&mut self, sliders: SliderPositions) -> Option<&OpacityCurve> {
        self.sliders = sliders;
        let curve = OpacityCurve::from_sliders(&self.config.transfer, sliders);
        match &mut self.state {
            ViewerState::Loaded(volume) => {
                volume.curve = curve;
                Some(&volume.curve)
            }
            ViewerState::Unloaded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extents, LoadError};

    fn labels_for(n: usize, label: u8) -> LabelBuffer {
        let extents = Extents::new(n, n, n);
        let mut labels = vec![0; extents.sample_count()];
        labels[0] = label;
        LabelBuffer::new(extents, labels).unwrap()
    }

    fn ramp_buffer(n: usize) -> VolumeBuffer {
        let extents = Extents::new(n, n, n);
        let samples = (0..extents.sample_count()).map(|i| i as u16).collect();
        VolumeBuffer::new(extents, samples).unwrap()
    }

    #[test]
    fn sliders_before_load_are_a_no_op() {
        let mut session = Session::new(ViewerConfig::default());
        let sliders = SliderPositions {
            mid_opacity: 12,
            mid_at: 900,
        };
        assert!(session.set_sliders(sliders).is_none());
        assert_eq!(session.sliders(), sliders);
        assert!(!session.state().is_loaded());
    }

    #[test]
    fn loaded_volume_uses_current_sliders() {
        let mut session = Session::new(ViewerConfig::default());
        session.set_sliders(SliderPositions {
            mid_opacity: 0,
            mid_at: 700,
        });
        session
            .load_buffer(Path::new("a.h5"), ramp_buffer(4), None, |_| Ok(()))
            .unwrap();
        let loaded = session.state().loaded().unwrap();
        assert_eq!(loaded.curve.middle().value, 700.0);
        assert_eq!(loaded.image.spacing(), glam::Vec3::new(3.0, 1.0, 1.0));

        let curve = session
            .set_sliders(SliderPositions {
                mid_opacity: 10,
                mid_at: 1200,
            })
            .cloned()
            .unwrap();
        assert_eq!(curve.middle().value, 1200.0);
        assert_eq!(session.state().loaded().unwrap().curve, curve);
    }

    #[test]
    fn failed_scene_build_keeps_previous_state() {
        let mut session = Session::new(ViewerConfig::default());
        session
            .load_buffer(Path::new("first.h5"), ramp_buffer(2), None, |_| Ok(()))
            .unwrap();

        let err = session
            .load_buffer(Path::new("second.h5"), ramp_buffer(3), None, |_| {
                Err(LoadError::Gpu("out of memory".into()))
            })
            .unwrap_err();
        assert!(matches!(err, LoadError::Gpu(_)));
        let current = session.state().loaded().unwrap();
        assert_eq!(current.path, Path::new("first.h5"));
        assert_eq!(current.image.extents(), Extents::new(2, 2, 2));
    }

    #[test]
    fn single_slice_volume_loads_with_a_visible_box() {
        let mut session = Session::new(ViewerConfig::default());
        let extents = Extents::new(1, 4, 4);
        let buffer = VolumeBuffer::new(extents, vec![900; 16]).unwrap();
        session
            .load_buffer(Path::new("slab.h5"), buffer, None, |_| Ok(()))
            .unwrap();
        let (lo, hi) = session.state().loaded().unwrap().image.bounds();
        assert!((hi - lo).min_element() > 0.0);
    }

    #[test]
    fn label_opacity_needs_labels_and_visibility() {
        let mut session = Session::new(ViewerConfig::default());
        assert_eq!(session.label_opacity(), 0.0);

        session
            .load_buffer(Path::new("plain.h5"), ramp_buffer(2), None, |_| Ok(()))
            .unwrap();
        assert_eq!(session.label_opacity(), 0.0);

        session
            .load_buffer(Path::new("masked.h5"), ramp_buffer(2), Some(labels_for(2, 3)), |_| Ok(()))
            .unwrap();
        assert_eq!(session.label_opacity(), 0.4);
        let labels = session.state().loaded().unwrap().labels.as_ref().unwrap();
        assert_eq!(labels.present(), &[3]);

        let hidden = DisplaySettings {
            show_labels: false,
            ..session.display()
        };
        session.set_display(hidden);
        assert_eq!(session.label_opacity(), 0.0);

        session.set_display(DisplaySettings {
            show_labels: true,
            label_opacity: 3.0,
            ..hidden
        });
        assert_eq!(session.label_opacity(), 1.0);
    }

    #[test]
    fn mismatched_labels_fail_the_load() {
        let mut session = Session::new(ViewerConfig::default());
        let mut built = false;
        let err = session
            .load_buffer(Path::new("bad.h5"), ramp_buffer(2), Some(labels_for(3, 1)), |_| {
                built = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, LoadError::LabelGridMismatch { .. }));
        assert!(!built);
        assert!(!session.state().is_loaded());
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn cancelled_pick_is_reported_and_ignored() {
        let mut session = Session::new(ViewerConfig::default());
        let mut built = false;
        let err = session
            .load_picked(|| None, |_| {
                built = true;
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(!built);
        assert!(!session.state().is_loaded());
    }
}
