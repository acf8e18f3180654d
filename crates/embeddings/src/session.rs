//! ONNX Runtime session construction

use brand_audit_common::{AuditError, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Environment variable capping intra-op threads per session
pub const THREADS_ENV: &str = "BRAND_AUDIT_THREADS";

fn intra_threads() -> usize {
    std::env::var(THREADS_ENV)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(num_cpus::get_physical)
}

/// Create a session with full graph optimization and memory pattern reuse
pub fn create_session(model_name: &str, model_path: &Path) -> Result<Session> {
    let load_error = |reason: String| AuditError::ModelLoad {
        model: model_name.to_string(),
        reason,
    };
    if !model_path.exists() {
        return Err(load_error(format!("model file not found: {}", model_path.display())));
    }

    let start = Instant::now();
    let session = Session::builder()
        .map_err(|e| load_error(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_error(e.to_string()))?
        .with_intra_threads(intra_threads())
        .map_err(|e| load_error(e.to_string()))?
        .with_memory_pattern(true)
        .map_err(|e| load_error(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| load_error(format!("{}: {e}", model_path.display())))?;

    info!(
        "Loaded {} from {} in {:.2}s",
        model_name,
        model_path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(session)
}

pub(crate) fn load_tokenizer(model_name: &str, path: &Path) -> Result<tokenizers::Tokenizer> {
    tokenizers::Tokenizer::from_file(path).map_err(|e| AuditError::ModelLoad {
        model: model_name.to_string(),
        reason: format!("tokenizer {}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_load_error() {
        let err = create_session("clip", Path::new("/nonexistent/clip.onnx")).unwrap_err();
        match err {
            AuditError::ModelLoad { model, reason } => {
                assert_eq!(model, "clip");
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_tokenizer_is_load_error() {
        let err = load_tokenizer("nli", Path::new("/nonexistent/tokenizer.json")).unwrap_err();
        assert!(matches!(err, AuditError::ModelLoad { .. }));
    }
}
