use crate::{IngestError, TranscriptDocument};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn load_documents(folder: &Path) -> Result<Vec<TranscriptDocument>, IngestError> {
    let report = load_documents_best_effort(folder)?;
    Ok(report.documents)
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub documents: Vec<TranscriptDocument>,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Many(Vec<TranscriptDocument>),
    One(Box<TranscriptDocument>),
}

pub fn load_documents_best_effort(folder: &Path) -> Result<IngestionReport, IngestError> {
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no json transcript files found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        let parsed = fs::read_to_string(&path)
            .map_err(IngestError::from)
            .and_then(|raw| Ok(serde_json::from_str::<DocumentFile>(&raw)?));

        let file_documents = match parsed {
            Ok(DocumentFile::Many(documents)) => documents,
            Ok(DocumentFile::One(document)) => vec![*document],
            Err(error) => {
                skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        for document in file_documents {
            match prepare_document(document) {
                Ok(document) => documents.push(document),
                Err(error) => skipped_files.push(SkippedFile {
                    path: path.clone(),
                    reason: error.to_string(),
                }),
            }
        }
    }

    Ok(IngestionReport {
        documents,
        skipped_files,
    })
}

fn prepare_document(mut document: TranscriptDocument) -> Result<TranscriptDocument, IngestError> {
    if document.id.trim().is_empty() {
        return Err(IngestError::InvalidDocument {
            document_id: String::new(),
            details: "document id is empty".to_string(),
        });
    }

    document
        .validate()
        .map_err(|error| IngestError::InvalidDocument {
            document_id: document.id.clone(),
            details: error.to_string(),
        })?;

    if document.video_id.is_empty() {
        document.video_id = document.id.clone();
    }
    document.matched_tokens = None;

    Ok(document)
}
