//! This module provides miscellaneous utilities.

// Import the submodules for configuration, initialization, and paths
pub mod conf; // Configuration module
pub mod init; // Initialization module
pub mod path; // Path module
#[cfg(feature = "opencv")]
pub mod cv; // OpenCV interop
