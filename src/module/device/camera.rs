//! Camera Functions
//!

use std::thread;
use std::time::{Duration, Instant};

use image::GrayImage;
use rscam::{Camera, Config};

use super::CaptureDevice;
use crate::module::error::{NightwatchError, Result};
use crate::module::util::conf;

/// V4L2 camera streaming MJPG.
///
/// Recording collects the MJPG frames of a burst, stills are decoded to gray.
pub struct V4l2Camera {
    cap: Camera, // The camera instance for capturing frames.
    recording: bool, // Whether a burst is in progress.
    burst: Vec<u8>, // Frames of the current burst.
}

impl V4l2Camera {
    /// Opens and starts the camera with the configured settings.
    ///
    /// Blocks for `warmup_seconds` so the automatic gain control settles.
    pub fn new(conf: &conf::Camera) -> Result<Self> {
        let mut cap = Camera::new(&conf.path)
            .map_err(|e| NightwatchError::Device(format!("{}: {}", conf.path, e)))?;

        cap.start(&Config {
            interval: (1, conf.framerate),
            resolution: (conf.width, conf.height),
            format: b"MJPG",
            nbuffers: 2,
            ..Default::default()
        })
        .map_err(|e| NightwatchError::Device(format!("{}: {}", conf.path, e)))?;

        if let Some(gain) = conf.gain {
            cap.set_control(rscam::CID_GAIN, &gain)
                .map_err(|e| NightwatchError::Device(format!("gain: {}", e)))?;
        }
        if let Some(exposure) = conf.exposure {
            cap.set_control(rscam::CID_EXPOSURE_AUTO, &1i32) // manual mode
                .map_err(|e| NightwatchError::Device(format!("exposure mode: {}", e)))?;
            cap.set_control(rscam::CID_EXPOSURE_ABSOLUTE, &exposure)
                .map_err(|e| NightwatchError::Device(format!("exposure: {}", e)))?;
        }

        log::info!(
            "Camera {} started at {}x{}@{}",
            conf.path,
            conf.width,
            conf.height,
            conf.framerate
        );
        thread::sleep(Duration::from_secs(conf.warmup_seconds));

        Ok(Self {
            cap,
            recording: false,
            burst: Vec::new(),
        })
    }

    fn grab(&self) -> Result<rscam::Frame> {
        self.cap
            .capture()
            .map_err(|e| NightwatchError::Device(format!("capture: {}", e)))
    }
}

impl CaptureDevice for V4l2Camera {
    fn start_recording(&mut self) -> Result<()> {
        self.burst.clear();
        self.recording = true;
        Ok(())
    }

    fn wait_recording(&mut self, duration: Duration) -> Result<()> {
        if !self.recording {
            return Err(NightwatchError::Device("not recording".into()));
        }
        let until = Instant::now() + duration;
        while Instant::now() < until {
            let frame = self.grab()?;
            self.burst.extend_from_slice(&frame[..]);
        }
        Ok(())
    }

    fn stop_recording(&mut self, sink: &mut Vec<u8>) -> Result<()> {
        self.recording = false;
        sink.append(&mut self.burst);
        Ok(())
    }

    fn capture_still(&mut self) -> Result<GrayImage> {
        let _ = self.grab(); // Grab a frame to reduce delay.
        let frame = self.grab()?;
        let img = image::load_from_memory(&frame[..])
            .map_err(|e| NightwatchError::Device(format!("malformed still: {}", e)))?;
        Ok(img.to_luma8())
    }

    fn container(&self) -> &'static str {
        "mjpeg"
    }
}
