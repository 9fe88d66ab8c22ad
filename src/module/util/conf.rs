//! Config Handler.

use serde::{Deserialize, Serialize};

use crate::module::error::{NightwatchError, Result};

/// Provides TOML config file handling.
pub mod toml {

    use super::DEFAULT_CONFIG;
    use crate::module::define;
    use crate::module::error::{NightwatchError, Result};
    use std::fs::File;
    use std::io::prelude::*;
    use std::path::Path;

    /// Loads a configuration file from the given directory.
    /// If not found, generates a default config file.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file is located or should be created.
    ///
    pub fn load(dir: &str) -> Result<super::Config> {
        let path = Path::new(dir).join(define::path::CONF_FILE);

        if !path.is_file() {
            // Create the default config if it doesn't exist
            let config = super::Config::default_config()?;
            save(dir, &config)?;
            log::info!("Wrote default config to {}", path.display());
        }

        let conf_str = std::fs::read_to_string(&path)
            .map_err(|e| NightwatchError::Config(format!("{}: {}", path.display(), e)))?;
        parse(&conf_str)
    }

    /// Parses and validates a configuration string.
    pub fn parse(conf_str: &str) -> Result<super::Config> {
        let conf: super::Config = toml::from_str(conf_str)
            .map_err(|e| NightwatchError::Config(format!("Failed to parse TOML: {}", e)))?;
        conf.validate()?;
        Ok(conf)
    }

    /// Saves a configuration file to the given directory.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file should be saved.
    /// * `conf` - The configuration data to be saved.
    ///
    pub fn save(dir: &str, conf: &super::Config) -> Result<()> {
        let toml_str =
            toml::to_string(conf).map_err(|e| NightwatchError::Config(e.to_string()))?;
        let path = crate::module::util::path::join(&[dir, define::path::CONF_FILE]);
        let mut file = File::create(&path).map_err(|e| NightwatchError::storage(&path, e))?;
        file.write_all(toml_str.as_bytes())
            .map_err(|e| NightwatchError::storage(&path, e))
    }

    pub(super) fn default_config() -> Result<super::Config> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| NightwatchError::Config(e.to_string()))
    }
}

/// Represents the configuration data structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub system: System,
    pub camera: Camera,
    pub acquisition: Acquisition,
    pub segmentation: Segmentation,
    pub classification: Classification,
}

impl Config {
    /// The embedded default configuration.
    pub fn default_config() -> Result<Self> {
        toml::default_config()
    }

    /// Rejects values the stages cannot work with.
    pub fn validate(&self) -> Result<()> {
        let acq = &self.acquisition;
        if acq.segment_length_seconds <= 0.0 {
            return Err(NightwatchError::Config(
                "segment_length_seconds must be positive".into(),
            ));
        }
        if acq.min_sample_interval_seconds <= 0.0 || acq.sample_interval_step_seconds <= 0.0 {
            return Err(NightwatchError::Config(
                "sample interval floor and step must be positive".into(),
            ));
        }
        if acq.sample_interval_seconds <= 0.0 || acq.triggered_sample_interval_seconds <= 0.0 {
            return Err(NightwatchError::Config(
                "sample intervals must be positive".into(),
            ));
        }
        if acq.backlog_low_watermark > acq.backlog_high_watermark {
            return Err(NightwatchError::Config(format!(
                "backlog_low_watermark ({}) exceeds backlog_high_watermark ({})",
                acq.backlog_low_watermark, acq.backlog_high_watermark
            )));
        }
        let seg = &self.segmentation;
        if seg.working_width == 0 || seg.working_height == 0 {
            return Err(NightwatchError::Config(
                "working resolution must be nonzero".into(),
            ));
        }
        if seg.dilate_width == 0 || seg.dilate_height == 0 {
            return Err(NightwatchError::Config("dilation kernel must be nonzero".into()));
        }
        if seg.dilate_width > 255 || seg.dilate_height > 255 {
            return Err(NightwatchError::Config(
                "dilation kernel sides must be below 256".into(),
            ));
        }
        if seg.background_history_length == 0 {
            return Err(NightwatchError::Config(
                "background_history_length must be nonzero".into(),
            ));
        }
        let cls = &self.classification;
        if cls.cascade_scale_factor <= 1.0 || cls.hog_scale <= 1.0 {
            return Err(NightwatchError::Config("scale steps must exceed 1.0".into()));
        }
        if cls.hog_win_stride.0 == 0 || cls.hog_win_stride.1 == 0 {
            return Err(NightwatchError::Config("hog_win_stride must be nonzero".into()));
        }
        Ok(())
    }
}

/// Represents system-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct System {
    pub log_level: String,
    pub heartbeat_minutes: u64,
}

/// Represents camera-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Camera {
    pub device: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub gain: Option<i32>,
    pub exposure: Option<i32>,
    pub warmup_seconds: u64,
    pub replay_dir: String,
}

/// Which queue the acquisition loop watches to adapt its sampling interval.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BacklogSource {
    /// Segmentation -> Classification queue.
    ClassificationInput,
    /// Acquisition -> Segmentation queue.
    SegmentationInput,
    /// Both queues together.
    Combined,
}

/// Represents acquisition-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Acquisition {
    #[serde(alias = "segmentLengthSeconds")]
    pub segment_length_seconds: f64,
    #[serde(alias = "sampleIntervalSeconds")]
    pub sample_interval_seconds: f64,
    pub min_sample_interval_seconds: f64,
    pub sample_interval_step_seconds: f64,
    #[serde(alias = "triggeredSampleIntervalSeconds")]
    pub triggered_sample_interval_seconds: f64,
    #[serde(alias = "backlogHighWatermark")]
    pub backlog_high_watermark: usize,
    #[serde(alias = "backlogLowWatermark")]
    pub backlog_low_watermark: usize,
    pub backlog_source: BacklogSource,
}

/// Represents segmentation-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Segmentation {
    pub working_width: u32,
    pub working_height: u32,
    #[serde(alias = "backgroundHistoryLength")]
    pub background_history_length: u32,
    pub variance_threshold: f32,
    pub dilate_width: u32,
    pub dilate_height: u32,
    #[serde(alias = "maxCandidateWidthPx")]
    pub max_candidate_width_px: u32,
}

/// Represents classification-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Classification {
    pub cascade_model: String,
    pub cascade_scale_factor: f32,
    pub cascade_min_neighbors: usize,
    pub hog_win_stride: (u32, u32),
    pub hog_padding: (u32, u32),
    pub hog_scale: f32,
    pub hog_hit_threshold: f32,
    pub save_evidence: bool,
}

// Default configuration data in TOML format
const DEFAULT_CONFIG: &str = r#"
[system]
  log_level = 'INFO' # Log level ('DEBUG', 'INFO', 'WARN', 'ERROR')
  heartbeat_minutes = 10 # Interval of "alive" lines in the stage logs

[camera]
  device = 'v4l2' # Capture device ('v4l2', 'replay')
  path = '/dev/video0' # V4L2 device node
  width = 800 # Image width
  height = 608 # Image height
  framerate = 25 # Frames per second
  gain = 800 # Analogue gain, leave out for automatic
  warmup_seconds = 5 # Wait for automatic gain control to settle
  replay_dir = 'replay' # Image directory served by the replay device

[acquisition]
  segment_length_seconds = 60.0 # Length of one recorded segment
  sample_interval_seconds = 2.3 # Initial interval between two stills
  min_sample_interval_seconds = 0.5 # Floor of the adaptive interval
  sample_interval_step_seconds = 0.5 # Adjustment per still
  triggered_sample_interval_seconds = 10.0 # Interval while the trigger is set
  backlog_high_watermark = 4 # Sample less often above this depth
  backlog_low_watermark = 2 # Sample more often below this depth
  backlog_source = 'classification_input' # 'classification_input', 'segmentation_input', 'combined'

[segmentation]
  working_width = 20 # Background model width
  working_height = 15 # Background model height
  background_history_length = 20 # Frames remembered by the background model
  variance_threshold = 16.0 # Squared distance (in variances) to count as foreground
  dilate_width = 3 # Dilation kernel width
  dilate_height = 5 # Dilation kernel height
  max_candidate_width_px = 250 # Wider regions are lighting changes, not objects

[classification]
  cascade_model = 'haarcascades/haarcascade_upperbody.xml' # OpenCV cascade XML, looked up in OpenCV's data dir when not a file
  cascade_scale_factor = 2.0
  cascade_min_neighbors = 13
  hog_win_stride = [4, 4] # People detector (OpenCV default weights), run on cascade negatives
  hog_padding = [8, 8]
  hog_scale = 1.15
  hog_hit_threshold = 0.0
  save_evidence = true # Keep a crop of every positive candidate
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_load() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();
        let res = toml::load(dir).unwrap();
        assert_eq!(res.acquisition.segment_length_seconds, 60.0);
        assert_eq!(res.acquisition.sample_interval_seconds, 2.3);
        assert_eq!(res.acquisition.triggered_sample_interval_seconds, 10.0);
        assert_eq!(res.acquisition.backlog_high_watermark, 4);
        assert_eq!(res.acquisition.backlog_low_watermark, 2);
        assert_eq!(
            res.acquisition.backlog_source,
            BacklogSource::ClassificationInput
        );
        assert_eq!(res.segmentation.max_candidate_width_px, 250);
        assert_eq!(res.segmentation.background_history_length, 20);
        // The default file was written and loads again.
        assert!(std::path::Path::new(dir).join("conf.toml").is_file());
        let again = toml::load(dir).unwrap();
        assert_eq!(again.camera.width, 800);
    }

    #[test]
    fn camel_case_aliases() {
        let mut conf = Config::default_config().unwrap();
        let text = ::toml::to_string(&conf).unwrap().replace(
            "segment_length_seconds = 60.0",
            "segmentLengthSeconds = 30.0",
        );
        conf = toml::parse(&text).unwrap();
        assert_eq!(conf.acquisition.segment_length_seconds, 30.0);
    }

    #[test]
    fn reject_inverted_watermarks() {
        let mut conf = Config::default_config().unwrap();
        conf.acquisition.backlog_low_watermark = 5;
        assert!(matches!(conf.validate(), Err(NightwatchError::Config(_))));

        let mut conf = Config::default_config().unwrap();
        conf.segmentation.dilate_height = 300;
        assert!(matches!(conf.validate(), Err(NightwatchError::Config(_))));
    }
}
