//! Workflow configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which workflow the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Ingest, encode with a preset, publish for streaming.
    #[default]
    EncodeAndPublish,
    /// Ingest, index, download the index output.
    IndexAndDownload,
}

/// Configuration for the end-to-end workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub kind: WorkflowKind,

    /// Local media file to ingest.
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Where index outputs are downloaded.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional indexer configuration file.
    #[serde(default)]
    pub configuration_file: Option<PathBuf>,

    /// Encoding preset passed as task configuration.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Name filter for the encoder processor.
    #[serde(default = "default_encoder_processor")]
    pub encoder_processor: String,

    /// Name filter for the indexer processor.
    #[serde(default = "default_indexer_processor")]
    pub indexer_processor: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_preset() -> String {
    "H264 Adaptive Bitrate MP4 Set 720p".to_string()
}

fn default_encoder_processor() -> String {
    "Media Encoder".to_string()
}

fn default_indexer_processor() -> String {
    "Indexer".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            kind: WorkflowKind::default(),
            source: None,
            output_dir: default_output_dir(),
            configuration_file: None,
            preset: default_preset(),
            encoder_processor: default_encoder_processor(),
            indexer_processor: default_indexer_processor(),
        }
    }
}
