//! Rewrite pass options.
//!
//! Options start from the `[defaults]`, `[generator]` and `[output]` tables
//! of `pptree.toml` and are then overridden by pass arguments in the host's
//! usual form: `-width N -start S -transforms T -mapping M [module...]`.

use crate::error::RewriteError;
use crate::generator::OutputOptions;
use crate::request::{TransformSequence, DEFAULT_MAPPING, DEFAULT_START, DEFAULT_WIDTH};
use pptree_config::PptreeConfig;

/// Fallbacks and switches for one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Width used when a cell has no usable width parameters.
    pub width: u32,
    /// Starting topology used when a cell has no `pptrees_base`.
    pub start: String,
    /// Transforms used when a cell has no `pptrees_transforms`.
    pub transforms: TransformSequence,
    /// Mapping strategy used when a cell has no `pptrees_mapping`.
    pub mapping: String,
    /// Modules to process; empty means the current selection.
    pub modules: Vec<String>,
    /// Generate and ingest the mapping library before rewriting.
    pub emit_maps: bool,
    /// Keep generator working directories after the pass.
    pub keep_temp_dirs: bool,
    /// Tool output handling.
    pub output: OutputOptions,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            start: DEFAULT_START.to_string(),
            transforms: TransformSequence::default(),
            mapping: DEFAULT_MAPPING.to_string(),
            modules: Vec::new(),
            emit_maps: true,
            keep_temp_dirs: false,
            output: OutputOptions::default(),
        }
    }
}

impl RewriteOptions {
    /// Builds options from a loaded configuration.
    pub fn from_config(config: &PptreeConfig) -> Result<Self, RewriteError> {
        let transforms = config
            .defaults
            .transforms
            .parse::<TransformSequence>()
            .map_err(|e| RewriteError::Argument(format!("defaults.transforms: {e}")))?;
        Ok(Self {
            width: config.defaults.width,
            start: config.defaults.start.clone(),
            transforms,
            mapping: config.defaults.mapping.clone(),
            modules: Vec::new(),
            emit_maps: config.generator.emit_maps,
            keep_temp_dirs: config.output.keep_temp_dirs,
            output: OutputOptions {
                echo: config.output.echo_tool_output,
                show_tempdir: config.output.show_tempdir,
            },
        })
    }

    /// Applies pass arguments on top of these options.
    ///
    /// Any malformed argument is a [`RewriteError::Argument`].
    pub fn apply_args<S: AsRef<str>>(mut self, args: &[S]) -> Result<Self, RewriteError> {
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .ok_or_else(|| RewriteError::Argument(format!("option `{flag}` needs a value")))
            };
            match arg {
                "-width" => {
                    let text = value(arg)?;
                    self.width = match text.parse::<u32>() {
                        Ok(w) if w > 0 => w,
                        _ => {
                            return Err(RewriteError::Argument(format!(
                                "invalid width `{text}`: expected a positive integer"
                            )))
                        }
                    };
                }
                "-start" => self.start = value(arg)?.to_string(),
                "-transforms" | "-transform" => {
                    let text = value(arg)?;
                    self.transforms = text
                        .parse()
                        .map_err(|e| RewriteError::Argument(format!("invalid transforms `{text}`: {e}")))?;
                }
                "-mapping" => self.mapping = value(arg)?.to_string(),
                "-nomaps" => self.emit_maps = false,
                "-keep" => self.keep_temp_dirs = true,
                flag if flag.starts_with('-') => {
                    return Err(RewriteError::Argument(format!("unknown option `{flag}`")))
                }
                module => self.modules.push(module.to_string()),
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RewriteOptions, RewriteError> {
        RewriteOptions::default().apply_args(args)
    }

    #[test]
    fn defaults_match_documented_values() {
        let o = RewriteOptions::default();
        assert_eq!(o.width, 32);
        assert_eq!(o.start, "ripple-carry");
        assert!(o.transforms.is_empty());
        assert_eq!(o.mapping, "behavioral");
        assert!(o.modules.is_empty());
        assert!(o.emit_maps);
    }

    #[test]
    fn overrides_and_modules() {
        let o = parse(&[
            "-width", "16", "-start", "kogge-stone", "-transform", "_LF@2",
            "-mapping", "sklansky", "-nomaps", "alu", "top",
        ])
        .unwrap();
        assert_eq!(o.width, 16);
        assert_eq!(o.start, "kogge-stone");
        assert_eq!(o.transforms.to_string(), "_LF@2");
        assert_eq!(o.mapping, "sklansky");
        assert!(!o.emit_maps);
        assert_eq!(o.modules, vec!["alu", "top"]);
    }

    #[test]
    fn malformed_width_is_an_argument_error() {
        for bad in ["0", "abc", "-3", "1.5"] {
            let err = parse(&["-width", bad]).unwrap_err();
            assert!(matches!(err, RewriteError::Argument(_)), "{bad}");
        }
    }

    #[test]
    fn missing_value_and_unknown_flag() {
        assert!(matches!(parse(&["-width"]), Err(RewriteError::Argument(_))));
        assert!(matches!(parse(&["-fast"]), Err(RewriteError::Argument(_))));
        assert!(matches!(parse(&["-transforms", "_LF"]), Err(RewriteError::Argument(_))));
    }

    #[test]
    fn default_config_matches_default_options() {
        let from_cfg = RewriteOptions::from_config(&PptreeConfig::default()).unwrap();
        assert_eq!(from_cfg, RewriteOptions::default());
    }

    #[test]
    fn config_defaults_flow_through() {
        let mut cfg = PptreeConfig::default();
        cfg.defaults.width = 64;
        cfg.defaults.transforms = "_FL@3".into();
        cfg.output.keep_temp_dirs = true;
        let o = RewriteOptions::from_config(&cfg).unwrap();
        assert_eq!(o.width, 64);
        assert_eq!(o.transforms.0[0].args, vec![3]);
        assert!(o.keep_temp_dirs);

        cfg.defaults.transforms = "_FL@x".into();
        assert!(matches!(
            RewriteOptions::from_config(&cfg),
            Err(RewriteError::Argument(_))
        ));
    }
}
