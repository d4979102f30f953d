//! Session controller configuration

use serde::{Deserialize, Serialize};

use crate::engine::EngineOptions;

/// Tunables for playback and rendering
///
/// Every field has a default, so partial YAML files load fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Extension of files compiled with the project-descriptor compiler
    pub project_extension: String,

    /// Extension of the default render output file
    pub render_extension: String,

    /// Output passed to the engine for realtime playback (`-o<name>`)
    pub realtime_output: String,

    /// Output names that mean "live device" rather than a file
    pub live_output_names: Vec<String>,

    /// Engine options for realtime playback
    pub playback: EngineOptions,

    /// Engine options for offline rendering
    pub render: EngineOptions,

    /// Clear the attached console before each playback
    pub clear_console_on_play: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            project_extension: "csd".to_string(),
            render_extension: "wav".to_string(),
            realtime_output: "dac".to_string(),
            live_output_names: vec!["dac".to_string()],
            playback: EngineOptions::REALTIME,
            render: EngineOptions::OFFLINE,
            clear_console_on_play: true,
        }
    }
}

impl SessionConfig {
    /// Whether `filename` should go through the project-descriptor compiler
    pub fn is_project_file(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.project_extension))
    }

    /// Whether an engine-reported output name needs replacing with a file
    pub fn needs_output_file(&self, output_name: Option<&str>) -> bool {
        match output_name {
            None => true,
            Some(name) => {
                name.is_empty() || self.live_output_names.iter().any(|live| live == name)
            }
        }
    }

    /// Default render file for a target: `<stem>.<render_extension>`
    ///
    /// The stem is everything before the first `.` of the filename.
    pub fn default_output_name(&self, target_filename: &str) -> String {
        let stem = target_filename.split('.').next().unwrap_or(target_filename);
        format!("{}.{}", stem, self.render_extension)
    }
}
