// Upload pipeline: every file goes through two requests. First the vendor
// API hands out a single-use slot on its object store, then the file is
// POSTed there as multipart/form-data together with the fields the slot
// dictates. The file id returned by the first request is what chapters
// refer to.

use crate::api::{check_status, Session};
use crate::error::{read_body, ApiError, UploadError};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tracing::debug;

/// Single-use upload destination issued by `POST /file`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadSlot {
    pub request: SlotRequest,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

/// Where and how to send the file. `fields` must be sent verbatim next to
/// the file part.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlotRequest {
    pub url: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl UploadSlot {
    /// File name of the `file` part: the object key the store expects.
    pub fn key(&self) -> &str {
        self.request.fields.get("key").map(String::as_str).unwrap_or("")
    }
}

impl Session {
    /// Ask the vendor API for a fresh upload slot.
    pub fn request_slot(&self) -> Result<UploadSlot, ApiError> {
        let action = "requesting file";
        let res = self
            .api()
            .post(self.endpoints().api("/file"))
            .send()
            .map_err(|source| ApiError::Transport { action, source })?;
        let res = check_status(action, res)?;
        res.json()
            .map_err(|source| ApiError::Decode { action, source })
    }

    /// Upload one file and return its file id. The content is buffered in
    /// memory so the request carries an exact Content-Length; `label` is
    /// shown next to the progress bar.
    pub fn upload(
        &self,
        mut content: impl Read,
        size_bytes: u64,
        label: &str,
    ) -> Result<String, UploadError> {
        let slot = self.request_slot()?;
        debug!(file_id = %slot.file_id, url = %slot.request.url, "got upload slot");

        let mut buf = Vec::with_capacity(size_bytes as usize);
        content.read_to_end(&mut buf).map_err(UploadError::Read)?;
        let len = buf.len() as u64;

        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(label.to_string());

        let form = build_form(&slot, bar.wrap_read(Cursor::new(buf)), len)?;
        let res = self
            .transfer
            .post(&slot.request.url)
            .multipart(form)
            .send();
        bar.finish();

        let res = res.map_err(UploadError::Transfer)?;
        if res.status().as_u16() > 299 {
            let status = res.status();
            return Err(UploadError::Rejected {
                status,
                body: read_body(res),
            });
        }
        Ok(slot.file_id)
    }
}

/// Slot fields as text parts, then the content as the `file` part. Every
/// part has a known length so reqwest can compute the body size up front.
fn build_form<R>(slot: &UploadSlot, content: R, len: u64) -> Result<Form, UploadError>
where
    R: Read + Send + 'static,
{
    let mut form = Form::new().percent_encode_noop();
    for (name, value) in &slot.request.fields {
        form = form.text(name.clone(), value.clone());
    }
    let part = Part::reader_with_length(content, len)
        .file_name(slot.key().to_string())
        .mime_str("application/octet-stream")
        .map_err(UploadError::Transfer)?;
    Ok(form.part("file", part))
}
