//! Path Operations Module
//!
//! This module handles path operations for directories and files.

use std::path::PathBuf;

/// Join Paths
///
/// This function takes a slice of strings as input and joins them into a single path string.
/// It uses the PathBuf type to handle platform-specific separators and conversions.
pub fn join(paths: &[&str]) -> String {
    let mut path: PathBuf = PathBuf::new();
    for p in paths {
        path.push(p);
    }
    path.to_string_lossy().into_owned()
}

pub mod dir {
    //! Directory Operations Submodule
    //!
    //! This submodule provides functions for directory operations.

    use std::fs;
    use std::path::Path;

    use super::{NightwatchDir, NightwatchPath};
    use crate::module::define;
    use crate::module::error::{NightwatchError, Result};

    /// Create Directory from Path List
    ///
    /// It returns `Some(path)` if the directory creation succeeds, or `None` if it fails.
    pub fn create_dir_from_path_list(paths: &[&str]) -> Option<String> {
        let path = super::join(paths);
        match fs::create_dir_all(Path::new(&path)) {
            Ok(_) => Some(path),
            Err(_) => None,
        }
    }

    /// Create Subdirectory in Either Directory
    ///
    /// Uses `dir1` as the parent when it exists, `dir2` otherwise.
    pub fn create_subdir_in_either_dir(dir1: &str, dir2: &str, name: &str) -> Option<String> {
        let parent: &str = match Path::new(dir1).is_dir() {
            true => dir1,
            false => dir2,
        };
        create_dir_from_path_list(&[parent, name])
    }

    /// Create Data Directory
    ///
    /// Uses either `define::path::PERSISTENT_DIR` or `define::path::EPHEMERAL_DIR` as the parent directory,
    /// depending on which one exists.
    pub fn create_data_dir() -> Result<String> {
        create_subdir_in_either_dir(
            define::path::PERSISTENT_DIR,
            define::path::EPHEMERAL_DIR,
            define::system::NAME,
        )
        .ok_or_else(|| NightwatchError::Config("Can't Create Data Dir.".into()))
    }

    /// Create Application Subdirectories and Paths
    ///
    /// Creates the record and log directories inside `data_dir`.
    pub fn create_app_sub_dir(data_dir: &str) -> Result<NightwatchPath> {
        let record = create_dir_from_path_list(&[data_dir, define::path::RECORD_DIR])
            .ok_or_else(|| NightwatchError::Config("Can't Create Record Dir.".into()))?;
        let log = create_dir_from_path_list(&[data_dir, define::path::LOG_DIR])
            .ok_or_else(|| NightwatchError::Config("Can't Create Log Dir.".into()))?;
        Ok(NightwatchPath {
            dir: NightwatchDir {
                data: data_dir.to_string(),
                record,
                log,
            },
            stop: super::join(&[data_dir, define::path::STOP_FILE]),
        })
    }
}

/// Paths of Resources
///
#[derive(Debug, Clone)]
pub struct NightwatchPath {
    /// Directories Paths
    pub dir: NightwatchDir,
    /// Stop marker file
    pub stop: String,
}

/// Paths of Directories
///
#[derive(Debug, Clone)]
pub struct NightwatchDir {
    /// Data Directory Path
    pub data: String,
    /// Clips and evidence crops
    pub record: String,
    /// Log Directory Path
    pub log: String,
}
