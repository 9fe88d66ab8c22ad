//! Replay Device
//!
//! Serves a fixed sequence of frames instead of a live camera. Once the
//! sequence is exhausted it requests a stop and keeps showing the last frame,
//! so the pipeline winds down on its own.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::GrayImage;

use super::CaptureDevice;
use crate::module::error::{NightwatchError, Result};
use crate::module::trigger::StopSignal;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

enum Source {
    File(PathBuf),
    Memory(GrayImage),
}

/// Scripted capture device.
///
pub struct Replay {
    frames: Vec<Source>,
    cursor: usize,
    pace: f64, // 1.0 sleeps for real, 0.0 never sleeps
    recording: bool,
    stop: StopSignal,
}

impl Replay {
    /// Replay every image in `dir`, sorted by file name, in real time.
    pub fn from_dir(dir: &Path, stop: StopSignal) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|e| {
            NightwatchError::Device(format!("can't read replay dir {}: {}", dir.display(), e))
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        log::info!("Replay of {} frames from {}", paths.len(), dir.display());
        Self::new(paths.into_iter().map(Source::File).collect(), stop)
    }

    /// Replay in-memory frames without sleeping.
    pub fn from_frames(frames: Vec<GrayImage>, stop: StopSignal) -> Result<Self> {
        Ok(Self::new(frames.into_iter().map(Source::Memory).collect(), stop)?.with_pace(0.0))
    }

    fn new(frames: Vec<Source>, stop: StopSignal) -> Result<Self> {
        if frames.is_empty() {
            return Err(NightwatchError::Device("replay has no frames".into()));
        }
        Ok(Self {
            frames,
            cursor: 0,
            pace: 1.0,
            recording: false,
            stop,
        })
    }

    /// Scale the time spent in `wait_recording`.
    pub fn with_pace(mut self, pace: f64) -> Self {
        self.pace = pace.max(0.0);
        self
    }

    /// Number of stills served so far.
    pub fn served(&self) -> usize {
        self.cursor
    }

    fn current(&self) -> &Source {
        &self.frames[self.cursor.min(self.frames.len() - 1)]
    }
}

impl CaptureDevice for Replay {
    fn start_recording(&mut self) -> Result<()> {
        if self.recording {
            return Err(NightwatchError::Device("already recording".into()));
        }
        self.recording = true;
        Ok(())
    }

    fn wait_recording(&mut self, duration: Duration) -> Result<()> {
        if self.pace > 0.0 {
            thread::sleep(duration.mul_f64(self.pace));
        }
        Ok(())
    }

    fn stop_recording(&mut self, sink: &mut Vec<u8>) -> Result<()> {
        if !self.recording {
            return Err(NightwatchError::Device("not recording".into()));
        }
        self.recording = false;
        match self.current() {
            Source::File(path) => {
                let bytes = fs::read(path)
                    .map_err(|e| NightwatchError::Device(format!("{}: {}", path.display(), e)))?;
                sink.extend_from_slice(&bytes);
            }
            Source::Memory(img) => sink.extend_from_slice(img.as_raw()),
        }
        Ok(())
    }

    fn capture_still(&mut self) -> Result<GrayImage> {
        let exhausted = self.cursor >= self.frames.len();
        if exhausted && !self.stop.is_requested() {
            log::info!("Replay exhausted, requesting stop");
            self.stop.request();
        }
        let still = match self.current() {
            Source::File(path) => image::open(path)
                .map_err(|e| NightwatchError::Device(format!("{}: {}", path.display(), e)))?
                .to_luma8(),
            Source::Memory(img) => img.clone(),
        };
        if !exhausted {
            self.cursor += 1;
        }
        Ok(still)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn frame(value: u8) -> GrayImage {
        GrayImage::from_pixel(4, 3, Luma([value]))
    }

    #[test]
    fn replay_order_and_exhaustion_test() {
        let stop = StopSignal::new();
        let mut cam = Replay::from_frames(vec![frame(1), frame(2)], stop.clone()).unwrap();
        let mut sink = Vec::new();
        cam.start_recording().unwrap();
        cam.wait_recording(Duration::from_secs(10)).unwrap();
        cam.stop_recording(&mut sink).unwrap();
        assert_eq!(sink.len(), 12);
        assert_eq!(cam.capture_still().unwrap().get_pixel(0, 0)[0], 1);
        assert_eq!(cam.capture_still().unwrap().get_pixel(0, 0)[0], 2);
        assert!(!stop.is_requested());
        assert_eq!(cam.capture_still().unwrap().get_pixel(0, 0)[0], 2);
        assert!(stop.is_requested());
        assert_eq!(cam.served(), 2);
    }

    #[test]
    fn replay_rejects_unbalanced_recording_test() {
        let mut cam = Replay::from_frames(vec![frame(0)], StopSignal::new()).unwrap();
        let mut sink = Vec::new();
        assert!(cam.stop_recording(&mut sink).is_err());
        cam.start_recording().unwrap();
        assert!(cam.start_recording().is_err());
    }

    #[test]
    fn replay_from_dir_test() {
        let dir = tempfile::tempdir().unwrap();
        frame(9).save(dir.path().join("b.png")).unwrap();
        frame(3).save(dir.path().join("a.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();
        let mut cam = Replay::from_dir(dir.path(), StopSignal::new())
            .unwrap()
            .with_pace(0.0);
        assert_eq!(cam.capture_still().unwrap().get_pixel(0, 0)[0], 3);
        assert_eq!(cam.capture_still().unwrap().get_pixel(0, 0)[0], 9);
    }

    #[test]
    fn replay_empty_is_device_error_test() {
        let res = Replay::from_frames(vec![], StopSignal::new());
        assert!(matches!(res, Err(NightwatchError::Device(_))));
    }
}
