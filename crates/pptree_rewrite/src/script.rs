//! Command and script construction for the external tools.
//!
//! Everything here is pure string building. The generator side produces an
//! [`Invocation`] for the tree generator in either of its flavors. The
//! backend side composes a `read; optimize; emit` script from a
//! [`ScriptMode`] and substitutes the shared configuration paths.

use crate::invocation::Invocation;
use crate::request::{py_str, GenerationRequest};
use pptree_config::{GeneratorConfig, ResolvedBackend};
use std::path::{Path, PathBuf};

/// File name of the generated tree module inside the working directory.
pub const TREE_ARTIFACT: &str = "pptrees_alu.v";
/// File name of the generated primitive library inside the working directory.
pub const LIBRARY_ARTIFACT: &str = "modules.v";
/// File name of the backend script inside its working directory.
pub const BACKEND_SCRIPT: &str = "lso.script";

/// How the tree generator is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorFlavor {
    /// `python -c` with a program that imports the generator class.
    Inline {
        /// Python module providing the tree class.
        module: String,
        /// Tree class name.
        class: String,
    },
    /// A standalone generator script taking `--width`-style flags.
    Script(PathBuf),
}

/// Generator launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Python interpreter.
    pub python: String,
    /// Python module used for maps and for the inline flavor.
    pub module: String,
    /// Tree class used for maps and for the inline flavor.
    pub class: String,
    /// Optional standalone script used for tree generation.
    pub script: Option<PathBuf>,
}

impl GeneratorSettings {
    /// The flavor used for tree generation.
    pub fn flavor(&self) -> GeneratorFlavor {
        match &self.script {
            Some(path) => GeneratorFlavor::Script(path.clone()),
            None => GeneratorFlavor::Inline {
                module: self.module.clone(),
                class: self.class.clone(),
            },
        }
    }

    fn prelude(&self) -> String {
        format!("import sys; from {} import {} as tree; ", self.module, self.class)
    }
}

impl From<&GeneratorConfig> for GeneratorSettings {
    fn from(cfg: &GeneratorConfig) -> Self {
        Self {
            python: cfg.python.clone(),
            module: cfg.module.clone(),
            class: cfg.class.clone(),
            script: cfg.script.as_ref().map(PathBuf::from),
        }
    }
}

/// Artifact paths for maps generation in `dir`.
pub fn maps_artifacts(dir: &Path, mapping: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{mapping}_map.v")),
        dir.join(LIBRARY_ARTIFACT),
    )
}

/// The invocation that writes the mapping library for `mapping` into `dir`.
pub fn maps_invocation(settings: &GeneratorSettings, dir: &Path, mapping: &str) -> Invocation {
    let program = format!(
        "{}g=tree(1); g.yosys_map({},{});",
        settings.prelude(),
        py_str(&dir.display().to_string()),
        py_str(mapping)
    );
    Invocation::new(&settings.python)
        .arg("-c")
        .arg(program)
        .current_dir(dir)
}

/// The invocation that builds one tree into `dir`, and the file it writes.
pub fn tree_invocation(
    settings: &GeneratorSettings,
    request: &GenerationRequest,
    dir: &Path,
    top_module: &str,
) -> (Invocation, PathBuf) {
    let transforms = request.transforms.to_string();
    match settings.flavor() {
        GeneratorFlavor::Inline { .. } => {
            let artifact = dir.join(TREE_ARTIFACT);
            let program = format!(
                "{}g=tree({},{}); \
                 [getattr(g,t.split('@')[0])(*[int(x) for x in t.split('@')[1].split(',') if x]) \
                 for t in {}.split('_')[1:]]; \
                 g.hdl({},{},top_module={});",
                settings.prelude(),
                request.width(),
                py_str(&request.start_topology),
                py_str(&transforms),
                py_str(&artifact.display().to_string()),
                py_str(&request.mapping),
                py_str(top_module)
            );
            let inv = Invocation::new(&settings.python)
                .arg("-c")
                .arg(program)
                .current_dir(dir);
            (inv, artifact)
        }
        GeneratorFlavor::Script(script) => {
            let artifact = dir.join(format!("{top_module}.v"));
            let inv = Invocation::new(&settings.python)
                .arg(script.display().to_string())
                .arg("--width")
                .arg(request.width().to_string())
                .arg("--start")
                .arg(&request.start_topology)
                .arg("--transforms")
                .arg(transforms)
                .arg("--top_module")
                .arg(top_module)
                .arg("--mapping")
                .arg(&request.mapping)
                .arg("--hdl_root")
                .arg(dir.display().to_string())
                .current_dir(dir);
            (inv, artifact)
        }
    }
}

/// Whole-design MIG optimization.
pub const MIG: &str = "ps -a; oracle --config {C}; ps -m";
/// Whole-design AIG optimization.
pub const AIG: &str = "ps -a; optimize; ps -a";
/// Partitioned high-effort optimization.
pub const PART_HIGH_EFFORT: &str = "partitioning {P}; optimization -c {C}; ps -m";
/// Partitioned high-effort optimization with merging.
pub const PART_HIGH_EFFORT_M: &str = "partitioning {P}; optimization -c {C} -m; ps -m";
/// Partitioned deep optimization driven by the learned model.
pub const PART_DEEP: &str = "partitioning {P}; optimization --deep {D}; ps -m";
/// Partitioned deep optimization with merging.
pub const PART_DEEP_M: &str = "partitioning {P}; optimization --deep {D} -m; ps -m";
/// Exclusive-partition optimization into MIG.
pub const PART_EXCLU_MIG: &str = "partitioning {P}; optimization -e -m -c {C}; ps -m";
/// Exclusive-partition optimization into AIG.
pub const PART_EXCLU_AIG: &str = "partitioning {P}; optimization -e -a -c {C}; ps -a";

/// Backend script mode flags.
///
/// `exclusive_partition` only takes effect together with `partitioned`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptMode {
    /// Partition the design before optimizing.
    pub partitioned: bool,
    /// Optimize each partition exclusively into one representation.
    pub exclusive_partition: bool,
    /// Use a majority-inverter graph.
    pub use_mig: bool,
    /// Use an and-inverter graph.
    pub use_aig: bool,
    /// Deep (model-driven) effort.
    pub deep_effort: bool,
    /// Merge partitions after optimization.
    pub merge_effort: bool,
    /// Read and emit only.
    pub test_only: bool,
    /// Emit technology-mapped LUTs instead of BLIF.
    pub lut_output: bool,
}

/// Values substituted for `{P}`, `{C}` and `{D}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPaths {
    /// Number of partitions.
    pub partitions: u32,
    /// Shared configuration file.
    pub config_file: String,
    /// Learned-model file.
    pub model_file: String,
}

impl From<&ResolvedBackend> for BackendPaths {
    fn from(resolved: &ResolvedBackend) -> Self {
        Self {
            partitions: resolved.partitions,
            config_file: resolved.config_file.display().to_string(),
            model_file: resolved.model_file.display().to_string(),
        }
    }
}

/// The `read` statement.
pub fn read_statement(mode: &ScriptMode, input: &str) -> String {
    if !mode.partitioned && mode.use_mig {
        format!("read -m {input}")
    } else {
        format!("read {input}")
    }
}

/// The optimization template, or `None` when `test_only` is set.
pub fn optimization_template(mode: &ScriptMode) -> Option<&'static str> {
    if mode.test_only {
        return None;
    }
    let template = if mode.partitioned && mode.exclusive_partition {
        if mode.use_mig {
            PART_EXCLU_MIG
        } else {
            PART_EXCLU_AIG
        }
    } else if mode.partitioned {
        match (mode.deep_effort, mode.merge_effort) {
            (true, true) => PART_DEEP_M,
            (true, false) => PART_DEEP,
            (false, true) => PART_HIGH_EFFORT_M,
            (false, false) => PART_HIGH_EFFORT,
        }
    } else if mode.use_mig {
        MIG
    } else if mode.use_aig {
        AIG
    } else if mode.merge_effort {
        PART_HIGH_EFFORT_M
    } else {
        PART_HIGH_EFFORT
    };
    Some(template)
}

/// The emit statement.
pub fn emit_statement(mode: &ScriptMode, output: &str) -> String {
    let multi = !mode.test_only && !mode.use_aig;
    match (mode.lut_output, multi) {
        (true, true) => format!("lut_map -m -o {output}"),
        (true, false) => format!("lut_map -o {output}"),
        (false, true) => format!("write_blif -m {output}"),
        (false, false) => format!("write_blif {output}"),
    }
}

/// Replaces every `{P}`, `{C}` and `{D}` in `template`.
pub fn substitute(template: &str, paths: &BackendPaths) -> String {
    template
        .replace(
            "{P}",
            &format!("{} -c {}", paths.partitions, paths.config_file),
        )
        .replace("{C}", &paths.config_file)
        .replace("{D}", &paths.model_file)
}

/// Builds the complete backend script for `mode`.
pub fn backend_script(mode: &ScriptMode, paths: &BackendPaths, input: &str, output: &str) -> String {
    let mut statements = vec![read_statement(mode, input)];
    if let Some(template) = optimization_template(mode) {
        statements.push(substitute(template, paths));
    }
    statements.push(emit_statement(mode, output));
    statements.join("; ")
}

/// Wraps a user-supplied script body with `read` and `write_blif`.
pub fn prepend_script_file(body: &str, input: &str, output: &str) -> String {
    let body = body.trim_end();
    let sep = if body.is_empty() || body.ends_with(';') { " " } else { "; " };
    let body = if body.is_empty() {
        String::new()
    } else {
        format!("{body}{sep}")
    };
    format!("read {input}; {body}write_blif {output}")
}

/// The invocation that runs a backend script file.
pub fn backend_invocation(executable: &Path, script: &Path) -> Invocation {
    let inv = Invocation::new(executable.display().to_string())
        .arg("-f")
        .arg(script.display().to_string());
    match script.parent() {
        Some(dir) => inv.current_dir(dir),
        None => inv,
    }
}
