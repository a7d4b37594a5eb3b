use std::path::Path;

use crate::error::AppError;

pub const POST_IMAGES_DIR: &str = "post_images";
pub const PROFILE_PICTURES_DIR: &str = "profile_pictures";

/// Write an uploaded file under the uploads root and return the
/// relative path to record on the owning entity. The write happens
/// before any row mutation, so a failed write never leaves a record
/// pointing at a missing file.
pub fn store_upload(
    uploads_root: &Path,
    subdir: &str,
    user_id: i64,
    original_name: &str,
    data: &[u8],
) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let name = sanitize_filename(original_name);
    ensure_image(&name)?;

    let dir = uploads_root.join(subdir);
    std::fs::create_dir_all(&dir)?;

    let filename = format!("user_{}_{}", user_id, name);
    std::fs::write(dir.join(&filename), data)?;

    Ok(format!("{}/{}", subdir, filename))
}

fn ensure_image(name: &str) -> Result<(), AppError> {
    let looks_like_image = mime_guess::from_path(name)
        .iter()
        .any(|m| m.type_() == mime_guess::mime::IMAGE);
    if !looks_like_image {
        return Err(AppError::Validation("Only image uploads are accepted".into()));
    }
    Ok(())
}

/// Strip any path components and characters outside [A-Za-z0-9._-]
/// from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
