//! Nightwatch, a motion triggered camera recorder.
//!
//! Records the camera continuously in segments and keeps only the segments
//! in which a human-like shape was seen.

pub mod module;
use crate::module::classification::Classifier;
use crate::module::define;
use crate::module::device;
use crate::module::error::{NightwatchError, Result};
use crate::module::persistence::storage::Storage;
use crate::module::pipeline::{Pipeline, PipelineReport};
use crate::module::segmentation::background;
use crate::module::trigger::{StopSignal, Trigger};
use crate::module::util::init::resource::init;

pub fn main() {
    match run() {
        Ok(report) if report.is_clean() => log::info!("Stopped cleanly"),
        Ok(_) => {
            log::error!("Stopped with errors");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", define::system::NAME, e);
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<PipelineReport> {
    // Prepare the resources by initializing the property struct
    let property = init()?;
    init_log(&property.path.dir.data, &property.conf.system.log_level)?;
    log::info!("Starting {}...", define::system::NAME);

    let stop = StopSignal::with_marker(&property.path.stop);
    stop.clear_marker()
        .map_err(|e| NightwatchError::storage(&property.path.stop, e))?;

    let conf = &property.conf;
    let device = device::open(&conf.camera, &property.path.dir.data, stop.clone())?;
    let classifier = Classifier::from_conf(&conf.classification)?;
    let background = background::from_conf(&conf.segmentation)?;
    let storage = Storage::new(&property.path.dir.record);
    log::info!("Recording to {}", storage.dir().display());

    let pipeline = Pipeline::launch(
        conf,
        device,
        background,
        classifier,
        storage,
        Trigger::new(),
        stop,
    )?;
    let report = pipeline.join();
    for stage in &report.stages {
        log::info!(
            "{}: {:?}, {} processed, {} failed",
            stage.name,
            stage.state,
            stage.processed,
            stage.failures
        );
    }
    Ok(report)
}

/// Builds the log4rs configuration.
///
/// Everything goes to `<dir>/log/nightwatch.log`; each stage additionally
/// gets its own file, `<dir>/log/<stage>.log`, fed by the records whose
/// target is the stage name.
///
/// # Arguments
/// * `dir` - The data directory
/// * `level` - 'DEBUG', 'INFO', 'WARN' or 'ERROR'
///
fn build_log_config(dir: &str, level: &str) -> Result<log4rs::Config> {
    use crate::module::util::path::join;
    use log::LevelFilter;
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Logger, Root};
    use log4rs::encode::pattern::PatternEncoder;

    const PATTERN: &str = "{h({d} - {l}: {m}{n})}";

    let level: LevelFilter = level
        .parse()
        .map_err(|_| NightwatchError::Config(format!("unknown log level '{}'", level)))?;
    let file_appender = |name: &str| {
        let path = join(&[dir, define::path::LOG_DIR, &format!("{}.log", name)]);
        FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(&path)
            .map_err(|e| NightwatchError::storage(&path, e))
    };

    let root = file_appender(define::system::NAME)?;
    let mut builder = Config::builder()
        .appender(Appender::builder().build(define::system::NAME, Box::new(root)));
    for stage in define::stage::ALL {
        builder = builder
            .appender(Appender::builder().build(stage, Box::new(file_appender(stage)?)))
            .logger(
                Logger::builder()
                    .appender(stage)
                    .build(stage, level),
            );
    }
    builder
        .build(Root::builder().appender(define::system::NAME).build(level))
        .map_err(|e| NightwatchError::Config(e.to_string()))
}

/// Initializes the logger system.
fn init_log(dir: &str, level: &str) -> Result<()> {
    let config = build_log_config(dir, level)?;
    log4rs::init_config(config).map_err(|e| NightwatchError::Config(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn log_config_test() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        std::fs::create_dir_all(tmp.path().join("log")).unwrap();
        let config = build_log_config(dir, "debug").unwrap();
        assert_eq!(config.loggers().len(), 4);
        assert_eq!(config.root().level(), log::LevelFilter::Debug);
        for name in ["nightwatch", "acquisition", "classification"] {
            assert!(Path::new(dir).join("log").join(format!("{}.log", name)).is_file());
        }
    }

    #[test]
    fn stage_lines_reach_stage_log_test() {
        use crate::module::stage::Heartbeat;
        use std::time::Duration;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        std::fs::create_dir_all(tmp.path().join("log")).unwrap();
        init_log(dir, "debug").unwrap();

        assert!(Heartbeat::new(Duration::ZERO).beat(define::stage::ACQUISITION));
        log::Log::flush(log::logger());

        let read = |name: &str| {
            std::fs::read_to_string(tmp.path().join("log").join(format!("{}.log", name)))
                .unwrap()
        };
        assert!(read("acquisition").contains("acquisition alive at"));
        assert!(read("nightwatch").contains("acquisition alive at"));
        assert!(!read("segmentation").contains("acquisition alive at"));
    }

    #[test]
    fn unknown_log_level_test() {
        let tmp = tempfile::tempdir().unwrap();
        let res = build_log_config(tmp.path().to_str().unwrap(), "chatty");
        assert!(matches!(res, Err(NightwatchError::Config(_))));
    }
}
