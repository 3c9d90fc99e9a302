//! Single-file JSON persistence for the fitted classifier.
//!
//! The artifact is written to a temporary file next to the target and then
//! renamed over it, so readers never see a half-written model.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::classifier::ClassifierModel;

/// Errors raised while saving or loading the model artifact.
#[derive(Debug, Error)]
pub enum ModelIoError {
    #[error("Failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read model from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize model: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid model at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Model at {path} failed validation: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Write `model` to `path`, creating the parent directory if needed.
pub fn save(path: &Path, model: &ClassifierModel) -> Result<(), ModelIoError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|source| ModelIoError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;
    let bytes = serde_json::to_vec(model).map_err(ModelIoError::Serialize)?;
    let write_err = |source: std::io::Error| ModelIoError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    file.write_all(&bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    file.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

/// Load and validate a model previously written by [`save`].
pub fn load(path: &Path) -> Result<ClassifierModel, ModelIoError> {
    let bytes = std::fs::read(path).map_err(|source| ModelIoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let model: ClassifierModel =
        serde_json::from_slice(&bytes).map_err(|source| ModelIoError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    model.validate().map_err(|reason| ModelIoError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::{DecisionTree, ForestModel, Node};
    use tempfile::tempdir;

    fn tiny_model() -> ClassifierModel {
        ClassifierModel {
            forest: ForestModel {
                model_version: 1,
                feature_len_f32: 6,
                classes: vec!["Confirmed".into(), "Candidate".into(), "False Positive".into()],
                max_depth: 1,
                trees: vec![DecisionTree {
                    nodes: vec![
                        Node::Split {
                            feature_index: 1,
                            threshold: 2.0,
                            left: 1,
                            right: 2,
                        },
                        Node::Leaf {
                            proba: vec![0.7, 0.2, 0.1],
                        },
                        Node::Leaf {
                            proba: vec![0.1, 0.1, 0.8],
                        },
                    ],
                }],
            },
            trained: true,
            accuracy: 0.5,
            sample_count: 12,
        }
    }

    #[test]
    fn saves_into_missing_directory_and_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("classifier_model.json");
        let model = tiny_model();
        save(&path, &model).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn overwrites_previous_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = tiny_model();
        save(&path, &model).unwrap();
        model.accuracy = 0.9;
        save(&path, &model).unwrap();
        assert_eq!(load(&path).unwrap().accuracy, 0.9);
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(load(&path), Err(ModelIoError::Parse { .. })));
        assert!(matches!(
            load(&dir.path().join("missing.json")),
            Err(ModelIoError::Read { .. })
        ));
    }

    #[test]
    fn rejects_structurally_invalid_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = tiny_model();
        model.forest.trees.clear();
        std::fs::write(&path, serde_json::to_vec(&model).unwrap()).unwrap();
        assert!(matches!(load(&path), Err(ModelIoError::Invalid { .. })));
    }
}
