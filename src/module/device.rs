//! Provide Capture Devices.
//!
#[cfg(feature = "v4l2")]
pub mod camera;
pub mod replay;

use std::time::Duration;

use image::GrayImage;

use crate::module::error::{NightwatchError, Result};
use crate::module::trigger::StopSignal;
use crate::module::util::conf;

/// What the acquisition loop needs from a camera.
///
/// Timing is best effort: `wait_recording` may return early or late.
pub trait CaptureDevice: Send {
    /// Begin a recording burst.
    fn start_recording(&mut self) -> Result<()>;

    /// Keep recording for about `duration`.
    fn wait_recording(&mut self, duration: Duration) -> Result<()>;

    /// End the burst and append its bytes to `sink`.
    fn stop_recording(&mut self, sink: &mut Vec<u8>) -> Result<()>;

    /// Grab one grayscale still at native resolution.
    fn capture_still(&mut self) -> Result<GrayImage>;

    /// File extension of the recorded stream.
    fn container(&self) -> &'static str {
        crate::module::define::naming::SEGMENT_CONTAINER
    }
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn start_recording(&mut self) -> Result<()> {
        (**self).start_recording()
    }

    fn wait_recording(&mut self, duration: Duration) -> Result<()> {
        (**self).wait_recording(duration)
    }

    fn stop_recording(&mut self, sink: &mut Vec<u8>) -> Result<()> {
        (**self).stop_recording(sink)
    }

    fn capture_still(&mut self) -> Result<GrayImage> {
        (**self).capture_still()
    }

    fn container(&self) -> &'static str {
        (**self).container()
    }
}

/// Open the device selected in the configuration.
///
/// `data_dir` anchors a relative replay directory.
pub fn open(
    conf: &conf::Camera,
    data_dir: &str,
    stop: StopSignal,
) -> Result<Box<dyn CaptureDevice>> {
    match conf.device.as_str() {
        #[cfg(feature = "v4l2")]
        "v4l2" => Ok(Box::new(camera::V4l2Camera::new(conf)?)),
        #[cfg(not(feature = "v4l2"))]
        "v4l2" => Err(NightwatchError::Config(
            "built without the 'v4l2' feature".into(),
        )),
        "replay" => {
            let dir = std::path::Path::new(data_dir).join(&conf.replay_dir);
            Ok(Box::new(replay::Replay::from_dir(&dir, stop)?))
        }
        other => Err(NightwatchError::Config(format!(
            "unknown camera device '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_unknown_device_test() {
        let mut conf = conf::Config::default_config().unwrap().camera;
        conf.device = "webcam9000".into();
        let res = open(&conf, "/tmp", StopSignal::new());
        assert!(matches!(res, Err(NightwatchError::Config(_))));
    }

    #[test]
    fn open_replay_test() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("replay");
        std::fs::create_dir_all(&frames).unwrap();
        GrayImage::new(8, 6).save(frames.join("0001.png")).unwrap();
        let mut conf = conf::Config::default_config().unwrap().camera;
        conf.device = "replay".into();
        let mut device = open(&conf, dir.path().to_str().unwrap(), StopSignal::new()).unwrap();
        assert_eq!(device.capture_still().unwrap().dimensions(), (8, 6));
    }
}
