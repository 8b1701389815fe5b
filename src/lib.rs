use std::{collections::HashMap, error::Error, io::Read};

use log::debug;

pub mod config;
pub mod error;
pub mod includes;
pub mod lexer;
pub mod macros;
pub mod reader;

pub use config::{enumerate_configs, match_cfg_def, materialize};
pub use error::{CollectedErrors, ErrorMessage, ErrorSink, FileLocation, Severity};
pub use includes::handle_includes;
pub use macros::{expand_macros, Macro};
pub use reader::{read, remove_space_near_nl, replace_if_defined};

/// Normalize the input, splice its includes and list every configuration the
/// code admits, returning the processed text alongside the configuration
/// names. The text is shared by all later per-configuration passes.
pub fn scan_configurations(
    input: &mut dyn Read,
    filename: &str,
    include_paths: &[String],
) -> Result<(String, Vec<String>), Box<dyn Error>> {
    let mut processed = reader::read(input)?;
    processed = reader::normalize_whitespace(&processed);
    includes::handle_includes(&mut processed, filename, include_paths);
    processed = reader::replace_if_defined(&processed);

    let configs = config::enumerate_configs(&processed);
    debug!("{}: {} configurations", filename, configs.len());

    Ok((processed, configs))
}

/// Run the whole pipeline: one fully expanded text per configuration, keyed
/// by the configuration name. The empty key is the base configuration.
pub fn preprocess(
    input: &mut dyn Read,
    filename: &str,
    include_paths: &[String],
    error_logger: &mut dyn ErrorSink,
) -> Result<HashMap<String, String>, Box<dyn Error>> {
    let (data, configs) = scan_configurations(input, filename, include_paths)?;

    let mut result = HashMap::new();
    for cfg in configs {
        let code = config::materialize(&data, &cfg);
        let expanded = macros::expand_macros(code, filename, error_logger);
        result.insert(cfg, expanded);
    }

    Ok(result)
}
