//! Module for Constants and Paths Definitions
//!
//! This module defines various constants and paths used throughout the application.

/// System Constants
pub mod system {
    /// Name of the system
    pub const NAME: &str = "nightwatch";
}

/// File Paths
pub mod path {

    // Persistent Data Directory
    pub const PERSISTENT_DIR: &str = "/data/";

    // Ephemeral Data Directory
    pub const EPHEMERAL_DIR: &str = "/run/user/1000/";

    // Recorded clips and evidence crops
    pub const RECORD_DIR: &str = "record";

    // Log Directory
    pub const LOG_DIR: &str = "log";

    // Configuration File
    pub const CONF_FILE: &str = "conf.toml";

    // Presence of this file asks a running pipeline to shut down.
    pub const STOP_FILE: &str = "stop";
}

/// Artifact naming
pub mod naming {
    /// chrono format of clip and evidence names (MMDD_HHMMSS)
    pub const TIME_FORMAT: &str = "%m%d_%H%M%S";

    /// chrono format used in heartbeat lines (MMDD_HHMM)
    pub const HEARTBEAT_FORMAT: &str = "%m%d_%H%M";

    /// Prefix of evidence crops
    pub const EVIDENCE_PREFIX: &str = "det";

    /// Extension of evidence crops
    pub const EVIDENCE_EXT: &str = "jpg";

    /// Default container of recorded segments
    pub const SEGMENT_CONTAINER: &str = "h264";
}

/// Stage names, also used as log file names.
pub mod stage {
    pub const ACQUISITION: &str = "acquisition";
    pub const SEGMENTATION: &str = "segmentation";
    pub const CLASSIFICATION: &str = "classification";
    pub const PERSISTENCE: &str = "persistence";

    /// All stages in pipeline order.
    pub const ALL: [&str; 4] = [ACQUISITION, SEGMENTATION, CLASSIFICATION, PERSISTENCE];
}
