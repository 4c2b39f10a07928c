//! Assembly documents on disk.
//!
//! Saves write a sibling temp file and rename it over the target. Loads
//! parse the whole file before touching the live graph.

use crate::loader::{Format, detect_format};
use snapwright_core::catalog::PartCatalog;
use snapwright_core::diagnostics::Diagnostic;
use snapwright_core::graph::PartGraph;
use snapwright_core::serialize::{self, AssemblyDocument, LoadReport};
use std::path::{Path, PathBuf};

/// Errors from reading or writing save files.
#[derive(Debug, thiserror::Error)]
pub enum SaveIoError {
    #[error("save file not found: {0}")]
    Missing(PathBuf),

    #[error("unsupported save format: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("could not serialize {file}: {detail}")]
    Serialize { file: PathBuf, detail: String },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_of(path: &Path) -> Result<Format, SaveIoError> {
    detect_format(path).map_err(|_| SaveIoError::UnsupportedFormat {
        file: path.to_path_buf(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Write `doc` to `path` in the format named by its extension.
pub fn save_document(path: &Path, doc: &AssemblyDocument) -> Result<(), SaveIoError> {
    let serialize_error = |detail: String| SaveIoError::Serialize {
        file: path.to_path_buf(),
        detail,
    };
    let text = match format_of(path)? {
        Format::Json => serde_json::to_string_pretty(doc).map_err(|e| serialize_error(e.to_string()))?,
        Format::Ron => ron::ser::to_string_pretty(doc, ron::ser::PrettyConfig::default())
            .map_err(|e| serialize_error(e.to_string()))?,
        Format::Toml => toml::to_string(doc).map_err(|e| serialize_error(e.to_string()))?,
    };

    let tmp = temp_path(path);
    if let Err(e) = std::fs::write(&tmp, text) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::debug!(
        path = %path.display(),
        parts = doc.parts.len(),
        connections = doc.connections.len(),
        "saved assembly"
    );
    Ok(())
}

/// Encode the graph and save it.
pub fn save_assembly(path: &Path, graph: &PartGraph) -> Result<(), SaveIoError> {
    save_document(path, &serialize::encode(graph))
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read and parse a document without touching any graph.
pub fn read_document(path: &Path) -> Result<AssemblyDocument, SaveIoError> {
    let format = format_of(path)?;
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SaveIoError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let parse_error = |detail: String| SaveIoError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Replace the contents of `graph` with the assembly saved at `path`.
///
/// The graph is left untouched unless the file was read and parsed. A
/// missing file is also reported as a diagnostic on the graph.
pub fn load_assembly(
    path: &Path,
    catalog: &PartCatalog,
    graph: &mut PartGraph,
) -> Result<LoadReport, SaveIoError> {
    let doc = match read_document(path) {
        Ok(doc) => doc,
        Err(SaveIoError::Missing(missing)) => {
            graph.report(Diagnostic::MissingSaveFile {
                path: missing.display().to_string(),
            });
            return Err(SaveIoError::Missing(missing));
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read save file");
            return Err(e);
        }
    };
    let report = serialize::decode(&doc, catalog, graph);
    tracing::debug!(
        path = %path.display(),
        loaded = report.parts_loaded,
        skipped = report.parts_skipped,
        "loaded assembly"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapwright_core::diagnostics::DiagnosticKind;
    use snapwright_core::test_utils::*;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "snapwright_persist_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn catalog() -> PartCatalog {
        [cube_prefab("cube"), core_prefab()].into_iter().collect()
    }

    /// Core at the origin with a cube connected on its +X face.
    fn small_assembly() -> PartGraph {
        let mut graph = PartGraph::new();
        let core = placed(&mut graph, &core_prefab(), pose_at(0.0, 0.0, 0.0));
        let cube = placed_cube(&mut graph, 1.0, 0.0, 0.0);
        let a = node_at(&graph, core, 0);
        let b = node_at(&graph, cube, 1);
        assert!(graph.connect(a, b));
        graph
    }

    fn round_trip(ext: &str) {
        let dir = make_test_dir(ext);
        let path = dir.join(format!("save.{ext}"));
        let graph = small_assembly();

        save_assembly(&path, &graph).unwrap();
        assert!(!temp_path(&path).exists());

        let mut restored = PartGraph::new();
        let report = load_assembly(&path, &catalog(), &mut restored).unwrap();
        assert_eq!(report.parts_loaded, 2);
        assert_eq!(report.connections_restored, 1);
        assert_eq!(serialize::encode(&restored), serialize::encode(&graph));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Round trips
    // -----------------------------------------------------------------------

    #[test]
    fn json_round_trip() {
        round_trip("json");
    }

    #[test]
    fn ron_round_trip() {
        round_trip("ron");
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = make_test_dir("overwrite");
        let path = dir.join("save.json");
        fs::write(&path, "stale").unwrap();

        save_document(&path, &AssemblyDocument::default()).unwrap();
        assert_eq!(read_document(&path).unwrap(), AssemblyDocument::default());

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_reports_diagnostic_and_keeps_graph() {
        let dir = make_test_dir("missing");
        let mut graph = small_assembly();

        let err = load_assembly(&dir.join("nope.json"), &catalog(), &mut graph).unwrap_err();
        assert!(matches!(err, SaveIoError::Missing(_)));
        assert_eq!(graph.part_count(), 2);
        assert_eq!(graph.diagnostics().count(DiagnosticKind::MissingSaveFile), 1);

        cleanup(&dir);
    }

    #[test]
    fn corrupt_file_keeps_graph() {
        let dir = make_test_dir("corrupt");
        let path = dir.join("save.json");
        fs::write(&path, "{ \"parts\": [ { \"id\": ").unwrap();
        let mut graph = small_assembly();

        let err = load_assembly(&path, &catalog(), &mut graph).unwrap_err();
        assert!(matches!(err, SaveIoError::Parse { .. }));
        assert_eq!(graph.part_count(), 2);
        assert_eq!(graph.connections().len(), 1);

        cleanup(&dir);
    }

    #[test]
    fn unsupported_extension_rejected() {
        let err = save_document(Path::new("save.bin"), &AssemblyDocument::default()).unwrap_err();
        assert!(matches!(err, SaveIoError::UnsupportedFormat { .. }));
    }

    #[test]
    fn unknown_prefab_skips_record() {
        let dir = make_test_dir("unknown_prefab");
        let path = dir.join("save.json");
        save_assembly(&path, &small_assembly()).unwrap();

        let only_cubes: PartCatalog = [cube_prefab("cube")].into_iter().collect();
        let mut graph = PartGraph::new();
        let report = load_assembly(&path, &only_cubes, &mut graph).unwrap();
        assert_eq!(report.parts_loaded, 1);
        assert_eq!(report.parts_skipped, 1);
        assert_eq!(report.connections_dropped, 1);
        assert_eq!(graph.diagnostics().count(DiagnosticKind::UnknownPrefab), 1);

        cleanup(&dir);
    }
}
