use crate::common::errors::{BusinessError, BusinessResult};
use axum::extract::Multipart;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form key the file was sent under, e.g. `pallets[0].zip_photos`
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A fully buffered `multipart/form-data` body
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

fn malformed(err: &axum::extract::multipart::MultipartError) -> BusinessError {
    BusinessError::ValidationError {
        field: "body".to_string(),
        message: format!("Malformed multipart body: {err}"),
    }
}

pub async fn read_form(mut multipart: Multipart) -> BusinessResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| malformed(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field.bytes().await.map_err(|e| malformed(&e))?;
            form.files.push(UploadedFile {
                field: name,
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| malformed(&e))?;
            form.fields.push((name, value));
        }
    }

    tracing::debug!(
        fields = form.fields.len(),
        files = form.files.len(),
        "Read multipart form"
    );
    Ok(form)
}
