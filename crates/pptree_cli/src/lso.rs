//! `pptree lso`: build or run a logic-synthesis backend script.

use std::error::Error;
use std::fs;
use std::path::Path;

use pptree_config::resolve_backend;
use pptree_rewrite::{Backend, BackendScript, IoNames, OutputOptions, ProcessRunner, ScriptMode};

use crate::{GlobalArgs, LsoArgs};

fn mode(args: &LsoArgs) -> ScriptMode {
    ScriptMode {
        partitioned: args.partitioned,
        exclusive_partition: args.exclusive,
        use_mig: args.mig,
        use_aig: args.aig,
        deep_effort: args.deep,
        merge_effort: args.merge,
        test_only: args.test,
        lut_output: args.lut,
    }
}

fn load_io_names(path: &Path) -> Result<IoNames, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
    let names = serde_json::from_str(&text)
        .map_err(|e| format!("invalid names file `{}`: {e}", path.display()))?;
    Ok(names)
}

/// Runs `pptree lso`.
///
/// Input and output are made absolute because the backend runs in its own
/// working directory.
pub fn run(args: &LsoArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let mut config = global.load_config()?;
    if let Some(exe) = &args.executable {
        config.backend.executable = Some(exe.clone());
    }
    if let Some(parts) = args.partitions {
        config.backend.partitions = parts;
    }
    let resolved = resolve_backend(&config.backend)?;
    let output = OutputOptions {
        echo: config.output.echo_tool_output,
        show_tempdir: config.output.show_tempdir,
    };

    let script = match &args.script {
        Some(path) => BackendScript::User(fs::read_to_string(path)?),
        None => BackendScript::Mode(mode(args)),
    };
    let input = std::path::absolute(&args.input)?;
    let out = std::path::absolute(&args.output)?;

    let mut backend = Backend::new(resolved, ProcessRunner).with_output(output);
    if args.dry_run {
        println!("{}", backend.script_text(&script, &input, &out));
        return Ok(0);
    }
    let names = match &args.io_names {
        Some(path) => load_io_names(path)?,
        None => IoNames::default(),
    };
    backend.run(&script, &input, &out, names)?;
    log::info!("wrote {}", out.display());
    Ok(0)
}
