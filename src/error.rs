//! Rich diagnostic error types for triplewalk.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for triplewalk.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum WalkError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Ingestion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("failed to open RDF source: {path}")]
    #[diagnostic(
        code(tw::ingest::open),
        help("Check that the input file exists and is readable.")
    )]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized RDF format for {path}")]
    #[diagnostic(
        code(tw::ingest::format),
        help(
            "The format is detected from the file extension. Supported extensions: \
             .nt, .nq, .ttl, .trig, .n3, .rdf, .xml (optionally followed by .gz)."
        )
    )]
    UnknownFormat { path: String },

    #[error("RDF parse error in {source_name}: {message}")]
    #[diagnostic(
        code(tw::ingest::parse),
        help(
            "The parser rejected the input. Validate the file with an RDF linter, \
             or check that the extension matches the actual serialization."
        )
    )]
    Parse {
        source_name: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Entity selector errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SelectorError {
    #[error("failed to read entity file: {path}")]
    #[diagnostic(
        code(tw::select::subset_file),
        help(
            "The entity subset file must exist and be valid UTF-8 with one entity per line. \
             Remove the option to sample every subject in the graph instead."
        )
    )]
    SubsetFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan walk directory: {path}")]
    #[diagnostic(
        code(tw::select::manifest),
        help("The directory of previous walk files could not be read.")
    )]
    Manifest {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Sampler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SamplerError {
    #[error("walk generation failed for entity {entity}: {message}")]
    #[diagnostic(
        code(tw::walk::task_failed),
        help("The entity was skipped. Other entities are unaffected.")
    )]
    TaskFailed { entity: String, message: String },
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OutputError {
    #[error("failed to create walk file: {path}")]
    #[diagnostic(
        code(tw::output::create),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write walks: {source}")]
    #[diagnostic(
        code(tw::output::write),
        help(
            "Writing to the walk file failed. Check that the disk is not full. \
             The run was stopped because the output is incomplete."
        )
    )]
    Write {
        #[source]
        source: std::io::Error,
    },

    #[error("walk writer is already closed")]
    #[diagnostic(
        code(tw::output::closed),
        help("Walks were submitted after `close()`. Open a new writer for another run.")
    )]
    Closed,

    #[error("walk writer thread terminated unexpectedly")]
    #[diagnostic(
        code(tw::output::writer_panicked),
        help("This is a bug. Please report it with the log output of the run.")
    )]
    WriterPanicked,

    #[error("failed to read walk file: {path}")]
    #[diagnostic(
        code(tw::output::read),
        help("The walk file is missing, truncated, or not valid UTF-8.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(tw::config::invalid),
        help("Check the walk configuration values. {message}")
    )]
    Invalid { message: String },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tw::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(tw::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(tw::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning triplewalk results.
pub type WalkResult<T> = std::result::Result<T, WalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_error_converts_to_walk_error() {
        let err = SelectorError::SubsetFile {
            path: "entities.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let top: WalkError = err.into();
        assert!(matches!(
            top,
            WalkError::Selector(SelectorError::SubsetFile { .. })
        ));
    }

    #[test]
    fn output_error_converts_to_walk_error() {
        let top: WalkError = OutputError::Closed.into();
        assert!(matches!(top, WalkError::Output(OutputError::Closed)));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ConfigError::Invalid {
            message: "threads must be >= 1".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("threads must be >= 1"));

        let err = SamplerError::TaskFailed {
            entity: "http://example.org/A".into(),
            message: "boom".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("http://example.org/A"));
        assert!(msg.contains("boom"));
    }
}
