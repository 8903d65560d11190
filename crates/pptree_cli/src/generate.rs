//! `pptree generate`: run the tree generator once.

use std::error::Error;
use std::fs;

use pptree_diagnostics::{Diagnostic, DiagnosticSink};
use pptree_rewrite::codes::{E_ARTIFACT_MISSING, E_TOOL_FAILED};
use pptree_rewrite::{
    GenerationMode, GenerationRequest, Generator, GeneratorSettings, ProcessRunner, RewriteError,
    RewriteOptions, TransformSequence,
};

use crate::{GenerateArgs, GlobalArgs, ReportFormat};

/// Builds the request from flags, falling back to `[defaults]`.
fn request(args: &GenerateArgs, defaults: RewriteOptions) -> Result<GenerationRequest, RewriteError> {
    let mapping = args.mapping.clone().unwrap_or(defaults.mapping);
    if args.maps {
        return Ok(GenerationRequest::maps(mapping));
    }
    let transforms = match &args.transforms {
        Some(text) => text.parse::<TransformSequence>()?,
        None => defaults.transforms,
    };
    let start = args.start.clone().unwrap_or(defaults.start);
    Ok(GenerationRequest::new(args.width.unwrap_or(defaults.width), start, transforms, mapping)?)
}

/// Runs `pptree generate`.
///
/// With `--keep` the artifact paths are printed and the directory stays on
/// disk; otherwise the artifact is printed and the directory removed.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let config = global.load_config()?;
    let defaults = RewriteOptions::from_config(&config)?;
    let output = defaults.output;
    let request = request(args, defaults)?;
    let mode = if args.maps {
        GenerationMode::MapsOnly
    } else {
        GenerationMode::TreeGeneration
    };

    let mut generator =
        Generator::new(GeneratorSettings::from(&config.generator), ProcessRunner).with_output(output);
    let result = match generator.invoke(&request, mode) {
        Ok(result) => result,
        Err(e) => {
            let code = match e {
                RewriteError::MissingArtifact { .. } => E_ARTIFACT_MISSING,
                _ => E_TOOL_FAILED,
            };
            let mut diag = Diagnostic::error(code, e.to_string());
            if let RewriteError::ExternalTool(tool) = &e {
                for line in &tool.tail {
                    diag = diag.with_note(format!("output: {line}"));
                }
            }
            let sink = DiagnosticSink::new();
            sink.emit(diag);
            global.render(&sink, ReportFormat::Text);
            return Ok(1);
        }
    };

    if let Some(top) = &result.top_module {
        log::info!("generated {top}");
    }
    if args.keep {
        let artifact = result.artifact.clone();
        let library = result.library.clone();
        let dir = result.keep();
        log::info!("kept {}", dir.display());
        println!("{}", artifact.display());
        if let Some(library) = library {
            println!("{}", library.display());
        }
    } else {
        print!("{}", fs::read_to_string(&result.artifact)?);
    }
    Ok(0)
}
