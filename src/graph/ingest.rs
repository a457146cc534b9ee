//! RDF ingestion: parses serialized graphs into a [`TripleStore`].
//!
//! Parsing is delegated to `oxigraph`; this module only maps RDF terms onto
//! walk tokens. IRIs become bare IRI strings, blank nodes become `_:id`, and
//! literal objects are dropped unless [`IngestOptions::include_literals`] is set.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedOrBlankNode, Term};

use crate::error::IngestError;

use super::index::TripleStore;

/// Result type for ingestion.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Options controlling how RDF terms become tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Keep triples whose object is a literal.
    pub include_literals: bool,
    /// Skip malformed statements instead of failing.
    pub lenient: bool,
}

/// Detect the RDF format of `path` from its extension, ignoring a trailing `.gz`.
pub fn detect_format(path: &Path) -> Option<RdfFormat> {
    let name = path.file_name()?.to_str()?;
    let name = name.strip_suffix(".gz").unwrap_or(name);
    let extension = Path::new(name).extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "xml" | "owl" => Some(RdfFormat::RdfXml),
        other => RdfFormat::from_extension(other),
    }
}

/// Load an RDF file into `store`. Returns the number of new triples.
pub fn load_rdf_file(store: &TripleStore, path: &Path, options: IngestOptions) -> IngestResult<usize> {
    let format = detect_format(path).ok_or_else(|| IngestError::UnknownFormat {
        path: path.display().to_string(),
    })?;
    let file = File::open(path).map_err(|e| IngestError::Open {
        path: path.display().to_string(),
        source: e,
    })?;
    let reader = BufReader::new(file);
    let gzipped = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    tracing::info!(path = %path.display(), ?format, gzipped, "loading RDF");
    let added = if gzipped {
        load_rdf_reader(store, BufReader::new(GzDecoder::new(reader)), format, &path.display().to_string(), options)?
    } else {
        load_rdf_reader(store, reader, format, &path.display().to_string(), options)?
    };
    tracing::info!(path = %path.display(), added, total = store.len(), "RDF loaded");
    Ok(added)
}

/// Parse RDF from `reader` in the given format and insert every triple.
///
/// `source_name` is only used in error messages.
pub fn load_rdf_reader<R: Read>(
    store: &TripleStore,
    reader: R,
    format: RdfFormat,
    source_name: &str,
    options: IngestOptions,
) -> IngestResult<usize> {
    let mut parser = RdfParser::from_format(format);
    if options.lenient {
        parser = parser.lenient();
    }

    let mut added = 0;
    let mut skipped = 0usize;
    for quad in parser.for_reader(reader) {
        let quad = match quad {
            Ok(quad) => quad,
            Err(e) if options.lenient => {
                tracing::debug!(source = source_name, error = %e, "skipping malformed statement");
                skipped += 1;
                continue;
            }
            Err(e) => {
                return Err(IngestError::Parse {
                    source_name: source_name.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let Some(object) = object_token(&quad.object, options.include_literals) else {
            continue;
        };
        let subject = subject_token(&quad.subject);
        if store.add(&subject, quad.predicate.as_str(), &object) {
            added += 1;
        }
    }

    if skipped > 0 {
        tracing::warn!(source = source_name, skipped, "malformed statements skipped");
    }
    Ok(added)
}

fn subject_token(subject: &NamedOrBlankNode) -> String {
    match subject {
        NamedOrBlankNode::NamedNode(node) => node.as_str().to_string(),
        NamedOrBlankNode::BlankNode(node) => format!("_:{}", node.as_str()),
    }
}

fn object_token(object: &Term, include_literals: bool) -> Option<String> {
    match object {
        Term::NamedNode(node) => Some(node.as_str().to_string()),
        Term::BlankNode(node) => Some(format!("_:{}", node.as_str())),
        Term::Literal(literal) if include_literals => literal_token(literal.value()),
        Term::Literal(_) => None,
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Walk lines are space-separated, so literal values must not contain whitespace.
/// Blank literals have no token and their triple is skipped.
fn literal_token(value: &str) -> Option<String> {
    let token = value.split_whitespace().collect::<Vec<_>>().join("_");
    (!token.is_empty()).then_some(token)
}
