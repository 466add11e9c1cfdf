//! Request envelopes.
//!
//! [`RequestBody`] decides the transport: `Json` goes through the structured
//! client (JSON content type, token interceptor), `Multipart` goes through the
//! raw client so the transport writes its own boundary header.

use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::models::{ContentCategory, Role};

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartBody),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<MultipartBody> for RequestBody {
    fn from(body: MultipartBody) -> Self {
        RequestBody::Multipart(body)
    }
}

/// A file attachment inside a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(field: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        }
    }

    /// Read `path` into a part named `field`. The file name is the last path
    /// component.
    pub async fn from_path(field: &str, path: &Path, mime: &str) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            field: field.to_string(),
            file_name,
            mime: mime.to_string(),
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FormField {
    Text { name: String, value: String },
    File(FilePart),
}

/// Ordered multipart form. Converted to a transport form only when sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    fields: Vec<FormField>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.push(FormField::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.fields.push(FormField::File(part));
        self
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|f| match f {
                FormField::Text { name, .. } => name.as_str(),
                FormField::File(part) => part.field.as_str(),
            })
            .collect()
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            FormField::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn file_part(&self, field: &str) -> Option<&FilePart> {
        self.fields.iter().find_map(|f| match f {
            FormField::File(part) if part.field == field => Some(part),
            _ => None,
        })
    }

    /// Total size of the attached files.
    pub fn payload_bytes(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match f {
                FormField::File(part) => part.bytes.len(),
                FormField::Text { .. } => 0,
            })
            .sum()
    }

    pub(crate) fn into_form(self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field {
                FormField::Text { name, value } => form.text(name, value),
                FormField::File(part) => {
                    let file_part = Part::bytes(part.bytes)
                        .file_name(part.file_name)
                        .mime_str(&part.mime)?;
                    form.part(part.field, file_part)
                }
            };
        }
        Ok(form)
    }
}

/// Profile fields collected during onboarding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone_number: String,
    pub role: Option<Role>,
    pub content_type: Option<ContentCategory>,
    /// Sent as the `profilePicture` file part.
    pub picture: Option<FilePart>,
}

impl ProfileUpdate {
    pub fn new(name: &str, phone_number: &str) -> Self {
        Self {
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            role: None,
            content_type: None,
            picture: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn content_type(mut self, content_type: ContentCategory) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Attach the image at `path`; MIME is derived from its extension.
    pub async fn picture_from_path(mut self, path: &Path) -> std::io::Result<Self> {
        let part = FilePart::from_path("profilePicture", path, &image_mime_for(path)).await?;
        self.picture = Some(part);
        Ok(self)
    }

    /// Name and phone number are both required.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.phone_number.trim().is_empty()
    }

    fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("phoneNumber", self.phone_number.clone()),
        ];
        if let Some(role) = self.role {
            fields.push(("role", role.as_str().to_string()));
        }
        if let Some(content_type) = self.content_type {
            fields.push(("contentType", content_type.as_str().to_string()));
        }
        fields
    }

    /// JSON without a picture, multipart with one.
    pub fn into_body(self) -> RequestBody {
        let fields = self.text_fields();
        match self.picture {
            None => {
                let map: Map<String, Value> = fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v)))
                    .collect();
                RequestBody::Json(Value::Object(map))
            }
            Some(picture) => {
                let body = fields
                    .iter()
                    .fold(MultipartBody::new(), |body, (k, v)| body.text(k, v));
                RequestBody::Multipart(body.file(picture))
            }
        }
    }
}

impl From<ProfileUpdate> for RequestBody {
    fn from(update: ProfileUpdate) -> Self {
        update.into_body()
    }
}

/// An audio file to store in the user's history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingUpload {
    pub audio: FilePart,
    pub title: String,
    /// `mm:ss`
    pub duration: String,
}

impl RecordingUpload {
    /// Title defaults to the file name. Unknown duration is sent as `0:00`.
    pub async fn from_path(path: &Path, duration_secs: Option<u64>) -> std::io::Result<Self> {
        let audio = FilePart::from_path("audio", path, audio_mime_for(path)).await?;
        Ok(Self {
            title: audio.file_name.clone(),
            duration: duration_label(duration_secs),
            audio,
        })
    }

    /// A freshly captured clip, named `Recording_<unix millis>.m4a`.
    pub fn captured(bytes: Vec<u8>, duration_secs: Option<u64>, now: DateTime<Utc>) -> Self {
        let name = recording_file_name(now);
        Self {
            audio: FilePart::new("audio", &name, "audio/m4a", bytes),
            title: name,
            duration: duration_label(duration_secs),
        }
    }

    pub fn into_body(self) -> RequestBody {
        RequestBody::Multipart(
            MultipartBody::new()
                .file(self.audio)
                .text("title", &self.title)
                .text("duration", &self.duration),
        )
    }
}

impl From<RecordingUpload> for RequestBody {
    fn from(upload: RecordingUpload) -> Self {
        upload.into_body()
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// `image/<ext>`, with `jpg` normalized to `jpeg`.
pub fn image_mime_for(path: &Path) -> String {
    match extension(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg".to_string(),
        Some(ext) if !ext.is_empty() => format!("image/{}", ext),
        _ => "application/octet-stream".to_string(),
    }
}

pub fn audio_mime_for(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("m4a") => "audio/m4a",
        Some("wav") => "audio/wav",
        Some("aac") => "audio/aac",
        Some("ogg") => "audio/ogg",
        _ => "audio/mpeg",
    }
}

fn duration_label(duration_secs: Option<u64>) -> String {
    duration_secs
        .map(format_duration)
        .unwrap_or_else(|| "0:00".to_string())
}

/// Seconds as zero-padded `mm:ss`.
pub fn format_duration(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `Recording_<unix millis>.m4a`
pub fn recording_file_name(now: DateTime<Utc>) -> String {
    format!("Recording_{}.m4a", now.timestamp_millis())
}
