//! This module contains all the sub-modules of the project.

pub mod acquisition; // Acquisition module: Records segments and samples stills.
pub mod channel; // Channel module: Sentinel-carrying queues between stages.
pub mod classification; // Classification module: Decides whether a candidate is human-like.
pub mod define; // Definition module: Contains definitions and constants used throughout the project.
pub mod device; // Device module: Capture devices.
pub mod error; // Error module: Error taxonomy shared by all stages.
pub mod frame; // Frame module: Payloads flowing through the pipeline.
pub mod persistence; // Persistence module: Writes retained segments and evidence to disk.
pub mod pipeline; // Pipeline module: Starts and joins the four stages.
pub mod segmentation; // Segmentation module: Background subtraction and motion regions.
pub mod stage; // Stage module: Stage state machine and consumer loop.
pub mod trigger; // Trigger module: Shared trigger and stop signals.
pub mod util; // Utility module: Provides various utility functions and helpers.
