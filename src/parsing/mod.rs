pub mod extractor;
pub mod languages;
pub mod scanner;
pub mod template;

pub use extractor::{extract, extraction_failure, ExtractionOutput, LanguageSpec};
pub use scanner::{ScannedFile, Scanner};

use crate::node::ExtractionError;
use crate::node::ErrorSeverity;

/// Dispatch a file to its language extractor by extension. Unsupported
/// extensions and oversized files return an empty, error-tagged output
/// rather than propagating, per spec §4.B.
pub fn extract_file(path: &str, source: &str, max_file_size: u64) -> ExtractionOutput {
    if source.len() as u64 > max_file_size {
        return ExtractionOutput {
            nodes: Vec::new(),
            edges: Vec::new(),
            unresolved: Vec::new(),
            errors: vec![ExtractionError {
                message: format!("file exceeds max size ({} > {max_file_size})", source.len()),
                severity: ErrorSeverity::Warning,
                line: None,
            }],
        };
    }

    let extension = path.rsplit('.').next().unwrap_or("");

    if template::TEMPLATE_EXTENSIONS.contains(&extension) {
        let out = template::extract(path, source);
        return ExtractionOutput { nodes: out.nodes, edges: out.edges, unresolved: out.unresolved, errors: Vec::new() };
    }

    let Some(spec) = languages::for_extension(extension) else {
        return ExtractionOutput {
            nodes: Vec::new(),
            edges: Vec::new(),
            unresolved: Vec::new(),
            errors: vec![ExtractionError {
                message: format!("no extractor registered for .{extension}"),
                severity: ErrorSeverity::Warning,
                line: None,
            }],
        };
    };

    match extract(spec, path, source) {
        Ok(out) => out,
        Err(e) => extraction_failure(path, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_rust_function() {
        let out = extract_file("src/lib.rs", "pub fn hello() -> &'static str { \"world\" }", 1_000_000);
        assert!(out.nodes.iter().any(|n| n.name == "hello"));
    }

    #[test]
    fn unsupported_extension_yields_no_nodes_and_a_warning() {
        let out = extract_file("README.md", "# hi", 1_000_000);
        assert!(out.nodes.is_empty());
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn oversized_file_is_skipped_with_warning() {
        let huge = "a".repeat(100);
        let out = extract_file("src/big.rs", &huge, 10);
        assert!(out.nodes.is_empty());
        assert_eq!(out.errors.len(), 1);
    }
}
