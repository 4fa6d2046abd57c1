//! Multipart intake: body fields become [`FormSubmission`] values and file parts are
//! streamed into the temporary upload directory.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::{FormSubmission, UploadedFile};

const ARRAY_SUFFIX: &str = "[]";

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("unable to stage upload in {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Drains `multipart` into a submission, staging every uploaded file under `temp_dir`.
///
/// On error, files staged so far are removed before returning.
pub async fn read_submission(
    mut multipart: Multipart,
    temp_dir: &Path,
) -> Result<FormSubmission, IntakeError> {
    let mut submission = FormSubmission::new();

    let result = async {
        while let Some(field) = multipart.next_field().await? {
            let Some(raw_name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                // Browsers send an empty file part when no file was chosen.
                Some(original) if original.is_empty() => {
                    field.bytes().await?;
                }
                Some(original) => {
                    let file = stage_file(field, raw_name, original, temp_dir).await?;
                    submission.files.push(file);
                }
                None => {
                    let value = field.text().await?;
                    match raw_name.strip_suffix(ARRAY_SUFFIX) {
                        Some(name) => submission.append_array_field(name.to_string(), value),
                        None => submission.append_field(raw_name, value),
                    }
                }
            }
        }
        Ok::<(), IntakeError>(())
    }
    .await;

    match result {
        Ok(()) => Ok(submission),
        Err(err) => {
            discard_staged(&submission.files).await;
            Err(err)
        }
    }
}

async fn stage_file(
    mut field: Field<'_>,
    fieldname: String,
    originalname: String,
    temp_dir: &Path,
) -> Result<UploadedFile, IntakeError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| IntakeError::Io { path, source }
    };

    tokio::fs::create_dir_all(temp_dir)
        .await
        .map_err(io_error(temp_dir))?;

    let mimetype = match field.content_type() {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(&originalname)
            .first_or_octet_stream()
            .to_string(),
    };

    let filename = Uuid::new_v4().simple().to_string();
    let path = temp_dir.join(&filename);
    let mut out = tokio::fs::File::create(&path)
        .await
        .map_err(io_error(&path))?;

    let mut size = 0u64;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                drop(out);
                remove_quietly(&path).await;
                return Err(err.into());
            }
        };
        size += chunk.len() as u64;
        if let Err(source) = out.write_all(&chunk).await {
            drop(out);
            remove_quietly(&path).await;
            return Err(IntakeError::Io { path, source });
        }
    }
    if let Err(source) = out.flush().await {
        drop(out);
        remove_quietly(&path).await;
        return Err(IntakeError::Io { path, source });
    }

    debug!(%fieldname, %filename, size, "staged upload");
    Ok(UploadedFile {
        fieldname,
        originalname,
        mimetype,
        filename,
        destination: temp_dir.to_path_buf(),
        path,
        size,
    })
}

/// Best-effort cleanup of staged files; ones already relocated are skipped.
pub async fn discard_staged(files: &[UploadedFile]) {
    for file in files {
        remove_quietly(&file.path).await;
    }
}

/// Removes what a successful submission left behind in the staging area: uploads under
/// field names no question asked for, and repeats beyond the first per field.
///
/// Files sitting directly in `kept_root` are left alone, so a staging directory that is
/// also the upload root never loses stored uploads.
pub async fn discard_unclaimed(files: &[UploadedFile], kept_root: &Path) {
    for file in files {
        if file.path.parent() != Some(kept_root) {
            remove_quietly(&file.path).await;
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, path = %path.display(), "failed to discard staged upload"),
    }
}
