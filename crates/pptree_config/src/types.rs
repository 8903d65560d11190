//! Configuration types deserialized from `pptree.toml`.

use serde::Deserialize;

/// The top-level configuration parsed from `pptree.toml`.
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PptreeConfig {
    /// How the adder-tree generator is launched.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Location and parameters of the logic-synthesis backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Default generation parameters used when a cell carries no override.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Reporting of external tool output.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings for the external tree generator.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Python interpreter used to run the generator.
    #[serde(default = "default_python")]
    pub python: String,
    /// Python module providing the generator class.
    #[serde(default = "default_module")]
    pub module: String,
    /// Generator class imported from [`module`](Self::module).
    #[serde(default = "default_class")]
    pub class: String,
    /// Optional generator script. When set, trees are built by running the
    /// script with command-line flags instead of an inline program.
    pub script: Option<String>,
    /// Whether the mapping library is generated and ingested before any tree.
    #[serde(default = "default_true")]
    pub emit_maps: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            module: default_module(),
            class: default_class(),
            script: None,
            emit_maps: true,
        }
    }
}

/// Settings for the logic-synthesis backend.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Path to the backend executable.
    pub executable: Option<String>,
    /// Shared configuration file (`{C}`); derived from the executable when absent.
    pub config: Option<String>,
    /// Learned-model file (`{D}`); derived from the executable when absent.
    pub model: Option<String>,
    /// Number of partitions used by partition-aware scripts.
    #[serde(default = "default_partitions")]
    pub partitions: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            executable: None,
            config: None,
            model: None,
            partitions: default_partitions(),
        }
    }
}

/// Default generation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Adder width used when a cell's operand widths are unknown.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Starting tree topology.
    #[serde(default = "default_start")]
    pub start: String,
    /// Encoded transform sequence (e.g. `_LF@6_LF@4`).
    #[serde(default)]
    pub transforms: String,
    /// Gate/behavioral mapping strategy.
    #[serde(default = "default_mapping")]
    pub mapping: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            start: default_start(),
            transforms: String::new(),
            mapping: default_mapping(),
        }
    }
}

/// Reporting policy for external tool output.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Re-emit every cleaned tool output line as a log line.
    #[serde(default = "default_true")]
    pub echo_tool_output: bool,
    /// Show real temporary directory paths instead of a placeholder.
    #[serde(default)]
    pub show_tempdir: bool,
    /// Leave generator working directories on disk after the pass.
    #[serde(default)]
    pub keep_temp_dirs: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            echo_tool_output: true,
            show_tempdir: false,
            keep_temp_dirs: false,
        }
    }
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_module() -> String {
    "pptrees.yosys_alu".to_string()
}

fn default_class() -> String {
    "yosys_alu".to_string()
}

fn default_true() -> bool {
    true
}

fn default_partitions() -> u32 {
    1
}

fn default_width() -> u32 {
    32
}

fn default_start() -> String {
    "ripple-carry".to_string()
}

fn default_mapping() -> String {
    "behavioral".to_string()
}
