//! This module is responsible for preparing the resources needed by the application, such as directories, configurations, logs, etc.
//!

pub mod resource {
    use super::NightwatchProperty;
    use crate::module::error::Result;

    /// Initialize the application resources and return a NightwatchProperty instance containing paths and configurations.
    ///
    pub fn init() -> Result<NightwatchProperty> {
        let data_dir = crate::module::util::path::dir::create_data_dir()?;
        let conf = crate::module::util::conf::toml::load(&data_dir)?;
        init_in(&data_dir, conf)
    }

    /// Prepare the subdirectories of `data_dir` for an already loaded configuration.
    pub fn init_in(
        data_dir: &str,
        conf: crate::module::util::conf::Config,
    ) -> Result<NightwatchProperty> {
        let paths = crate::module::util::path::dir::create_app_sub_dir(data_dir)?;
        Ok(NightwatchProperty { path: paths, conf })
    }
}

/// This struct represents the properties of the app, such as paths and configurations.
///
#[derive(Debug, Clone)]
pub struct NightwatchProperty {
    pub path: crate::module::util::path::NightwatchPath, // The paths of the app resources
    pub conf: crate::module::util::conf::Config, // The configurations of the app
}
