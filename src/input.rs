use crate::model::{ContentBlock, ImageUrl, MessageContent};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("failed to read attachment {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported attachment type for {path}")]
    UnsupportedType { path: String },
}

const MIME_TYPE_MAP: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("py", "application/python"),
    ("xml", "application/xml"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

fn detect_mime_type(extension: &str) -> Option<&'static str> {
    let lowered = extension.to_ascii_lowercase();
    MIME_TYPE_MAP
        .iter()
        .find(|(ext, _)| *ext == lowered)
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Raw,
    Upload,
    Url,
}

/// One attachment riding along with a user message. Uploads are read
/// eagerly: text files inline their contents, images inline as base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileAttachment {
    pub fn raw(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = filename
            .rsplit('.')
            .next()
            .and_then(detect_mime_type)
            .map(str::to_string);
        Self {
            source_path: None,
            source_type: SourceType::Raw,
            filename: Some(filename),
            content: content.into(),
            mime_type,
        }
    }

    pub fn from_upload(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(detect_mime_type)
            .ok_or_else(|| AttachmentError::UnsupportedType {
                path: path.display().to_string(),
            })?;

        let content = if mime_type.starts_with("image/") {
            let bytes = fs::read(path).map_err(|source| AttachmentError::Read {
                path: path.display().to_string(),
                source,
            })?;
            BASE64.encode(bytes)
        } else {
            fs::read_to_string(path).map_err(|source| AttachmentError::Read {
                path: path.display().to_string(),
                source,
            })?
        };

        Ok(Self {
            source_path: Some(path.display().to_string()),
            source_type: SourceType::Upload,
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            content,
            mime_type: Some(mime_type.to_string()),
        })
    }

    /// URL attachments store the address; the model fetches it itself.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url.rsplit('/').next().map(str::to_string);
        let mime_type = url
            .rsplit('.')
            .next()
            .and_then(detect_mime_type)
            .map(str::to_string);
        Self {
            source_path: Some(url.clone()),
            source_type: SourceType::Url,
            filename,
            content: url,
            mime_type,
        }
    }

    fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
    }
}

/// What the user provided for one turn: a message plus any attachments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

impl UserInput {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            files: Vec::new(),
        }
    }

    /// Renders the turn for the model channel. A bare message stays a
    /// plain string; attachments promote the content to blocks, with
    /// text files inlined and images attached as image blocks.
    pub fn build_message_content(&self) -> MessageContent {
        if self.files.is_empty() {
            return MessageContent::Text(self.message.clone().unwrap_or_default());
        }

        let mut text_blocks = Vec::new();
        let mut image_blocks = Vec::new();

        if let Some(message) = self.message.as_ref().filter(|message| !message.is_empty()) {
            text_blocks.push(ContentBlock::Text {
                text: message.clone(),
            });
        }

        for attachment in &self.files {
            if attachment.is_image() {
                let url = match attachment.source_type {
                    SourceType::Url => attachment.content.clone(),
                    _ => format!(
                        "data:{};base64,{}",
                        attachment.mime_type.as_deref().unwrap_or("image/png"),
                        attachment.content
                    ),
                };
                image_blocks.push(ContentBlock::ImageUrl {
                    image_url: ImageUrl { url },
                });
            } else {
                text_blocks.push(ContentBlock::Text {
                    text: format!(
                        "[File: {}]\n {}",
                        attachment.filename.as_deref().unwrap_or("unnamed"),
                        attachment.content
                    ),
                });
            }
        }

        let mut blocks = text_blocks;
        blocks.append(&mut image_blocks);
        if blocks.is_empty() {
            blocks.push(ContentBlock::Text {
                text: String::new(),
            });
        }
        MessageContent::Blocks(blocks)
    }
}
