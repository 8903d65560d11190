//! `pptree opt`: rewrite marked adders in a JSON design.
//!
//! 1. Load config and build pass options from `[defaults]` plus pass args
//! 2. Load the design
//! 3. Run the rewrite driver with the native host and real subprocesses
//! 4. Render diagnostics and write the design

use std::error::Error;
use std::fs;

use log::info;
use pptree_diagnostics::{Diagnostic, DiagnosticSink};
use pptree_host::NativeHost;
use pptree_ir::Design;
use pptree_rewrite::codes::E_ARGUMENT;
use pptree_rewrite::{run_rewrite, Generator, GeneratorSettings, ProcessRunner, RewriteError, RewriteOptions};

use crate::{GlobalArgs, OptArgs, ReportFormat};

/// Runs `pptree opt`.
///
/// Returns exit code 1 when the pass is rejected outright. Cells that could
/// not be rewritten are reported but do not change the exit code.
pub fn run(args: &OptArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let config = global.load_config()?;
    let sink = DiagnosticSink::new();

    let options = match RewriteOptions::from_config(&config).and_then(|o| o.apply_args(args.pass_args.as_slice())) {
        Ok(options) => options,
        Err(e) => {
            sink.emit(Diagnostic::error(E_ARGUMENT, e.to_string()));
            global.render(&sink, args.format);
            return Ok(1);
        }
    };

    let text = fs::read_to_string(&args.design)?;
    let mut design: Design = serde_json::from_str(&text)?;

    let mut host = NativeHost::new();
    let mut generator = Generator::new(GeneratorSettings::from(&config.generator), ProcessRunner)
        .with_output(options.output);

    let outcome = run_rewrite(&mut design, &mut host, &mut generator, &options, &sink);
    let report = match outcome {
        Ok(report) => report,
        Err(RewriteError::Argument(message)) => {
            sink.emit(Diagnostic::error(E_ARGUMENT, message));
            global.render(&sink, args.format);
            return Ok(1);
        }
        Err(e) => {
            global.render(&sink, args.format);
            return Err(e.into());
        }
    };

    global.render(&sink, args.format);
    let written = serde_json::to_string_pretty(&design)?;
    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                let (errors, warnings) = sink.summary();
                eprintln!(
                    "   Result: {} rewritten, {} failed, {} error(s), {} warning(s)",
                    report.rewritten,
                    report.failed.len(),
                    errors,
                    warnings
                );
            }
            match &args.output {
                Some(path) => fs::write(path, written)?,
                None => println!("{written}"),
            }
        }
        ReportFormat::Json => {
            let mut summary = serde_json::json!({ "report": report });
            match &args.output {
                Some(path) => fs::write(path, written)?,
                None => summary["design"] = serde_json::to_value(&design)?,
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    if let Some(path) = &args.output {
        info!("wrote {}", path.display());
    }
    Ok(0)
}
