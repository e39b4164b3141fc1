use std::path::PathBuf;

use tagtally_core::config::{env_flag, env_parse, ConfigError};
use tagtally_core::normalize::{NormalizeConfig, DEFAULT_TARGET_BYTES};

/// Settings for the ingestion stage.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory scanned (non-recursively) for images.
    pub input_dir: PathBuf,
    /// Directory that receives one `<stem>.json` per image.
    pub output_dir: PathBuf,
    /// Byte budget for each normalized image.
    pub target_bytes: u64,
    pub normalize: NormalizeConfig,
    /// Leave images that already have an annotation file untouched.
    pub skip_existing: bool,
}

impl IngestConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            target_bytes: DEFAULT_TARGET_BYTES,
            normalize: NormalizeConfig::default(),
            skip_existing: false,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default          |
    /// |----------------------------|------------------|
    /// | `INGEST_INPUT_DIR`         | `./dist`         |
    /// | `INGEST_OUTPUT_DIR`        | `./json_outputs` |
    /// | `INGEST_TARGET_BYTES`      | `512000`         |
    /// | `INGEST_SKIP_EXISTING`     | `false`          |
    /// | `NORMALIZE_MAX_ITERATIONS` | `400`            |
    /// | `NORMALIZE_MIN_DIMENSION`  | `16`             |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = NormalizeConfig::default();
        let normalize = NormalizeConfig {
            max_iterations: env_parse("NORMALIZE_MAX_ITERATIONS", defaults.max_iterations)?,
            min_dimension: env_parse("NORMALIZE_MIN_DIMENSION", defaults.min_dimension)?,
            ..defaults
        };

        Ok(Self {
            input_dir: env_parse("INGEST_INPUT_DIR", PathBuf::from("./dist"))?,
            output_dir: env_parse("INGEST_OUTPUT_DIR", PathBuf::from("./json_outputs"))?,
            target_bytes: env_parse("INGEST_TARGET_BYTES", DEFAULT_TARGET_BYTES)?,
            normalize,
            skip_existing: env_flag("INGEST_SKIP_EXISTING", false)?,
        })
    }
}

/// Settings for the aggregation stage.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Directory holding the annotation JSON files.
    pub input_dir: PathBuf,
    /// Directory that receives the CSV frequency tables.
    pub output_dir: PathBuf,
    /// Skip (and report) malformed annotation files instead of aborting.
    pub skip_malformed: bool,
}

impl AggregateConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            skip_malformed: false,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default          |
    /// |----------------------------|------------------|
    /// | `AGGREGATE_INPUT_DIR`      | `./json_outputs` |
    /// | `AGGREGATE_OUTPUT_DIR`     | `./output_csv`   |
    /// | `AGGREGATE_SKIP_MALFORMED` | `false`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            input_dir: env_parse("AGGREGATE_INPUT_DIR", PathBuf::from("./json_outputs"))?,
            output_dir: env_parse("AGGREGATE_OUTPUT_DIR", PathBuf::from("./output_csv"))?,
            skip_malformed: env_flag("AGGREGATE_SKIP_MALFORMED", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_defaults() {
        let config = IngestConfig::new("in", "out");
        assert_eq!(config.target_bytes, 500 * 1024);
        assert!(!config.skip_existing);
        assert_eq!(config.normalize, NormalizeConfig::default());
    }

    #[test]
    fn aggregate_defaults() {
        let config = AggregateConfig::new("json", "csv");
        assert_eq!(config.input_dir, PathBuf::from("json"));
        assert!(!config.skip_malformed);
    }
}
