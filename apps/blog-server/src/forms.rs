//! Post form: multipart decoding and shape rules.
//!
//! Decoding never fails on user mistakes; it collects what the browser sent
//! into [`PostForm`]. [`PostForm::validate`] then turns it into a typed
//! [`PostInput`] or a bag of field messages for the form to show again.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use actix_multipart::{Field, Multipart};
use futures::StreamExt;
use regex::Regex;
use serde::Serialize;

use blog_core::FieldErrors;
use blog_core::domain::{ImageUpload, PostInput, PostWithRelations, UploadedFile};

use crate::middleware::error::{AppError, AppResult};

/// Upper bound for a single text field.
pub const MAX_TEXT_FIELD_BYTES: usize = 1024 * 1024;

const MAX_TEXT_CHARS: usize = 255;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-z\-]+$").expect("slug pattern is valid"));

/// The image part as it came off the wire.
#[derive(Debug)]
pub enum ImagePart {
    File(UploadedFile),
    TooLarge,
    Broken(String),
}

/// Raw post submission.
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category_id: String,
    pub tags: Vec<String>,
    pub image: Option<ImagePart>,
    /// Names of parts the form does not know.
    pub unexpected: Vec<String>,
}

/// Submitted values echoed back into the form.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FormValues {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category_id: String,
    pub tags: Vec<String>,
}

impl FormValues {
    /// Values of an existing post, for the edit form.
    pub fn from_post(post: &PostWithRelations) -> Self {
        Self {
            title: post.post.title.clone(),
            slug: post.post.slug.clone(),
            content: post.post.content.clone(),
            category_id: post
                .post
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            tags: post.tags.iter().map(|t| t.id.to_string()).collect(),
        }
    }
}

impl PostForm {
    pub fn values(&self) -> FormValues {
        FormValues {
            title: self.title.clone(),
            slug: self.slug.clone(),
            content: self.content.clone(),
            category_id: self.category_id.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Apply the shape rules.
    pub fn validate(self, max_image_bytes: usize) -> Result<PostInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        for name in &self.unexpected {
            errors.add("form", format!("Champ inattendu : {}.", name));
        }

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.add("title", "Le champ titre est obligatoire.");
        } else if title.chars().count() > MAX_TEXT_CHARS {
            errors.add("title", "Le titre ne doit pas dépasser 255 caractères.");
        }

        let slug = self.slug.trim().to_string();
        if slug.is_empty() {
            errors.add("slug", "Le champ slug est obligatoire.");
        } else if slug.chars().count() > MAX_TEXT_CHARS {
            errors.add("slug", "Le slug ne doit pas dépasser 255 caractères.");
        } else if !SLUG_PATTERN.is_match(&slug) {
            errors.add(
                "slug",
                "Le slug ne peut contenir que des lettres minuscules, des chiffres et des tirets.",
            );
        }

        let content = self.content.trim().to_string();
        if content.is_empty() {
            errors.add("content", "Le champ contenu est obligatoire.");
        }

        let category_id = match self.category_id.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("category_id", "La catégorie sélectionnée est invalide.");
                    None
                }
            },
        };

        let mut tag_ids = BTreeSet::new();
        for raw in &self.tags {
            match raw.trim().parse::<i64>() {
                Ok(id) => {
                    tag_ids.insert(id);
                }
                Err(_) => {
                    errors.add("tags", format!("Le tag « {} » est invalide.", raw));
                }
            }
        }

        let image = match self.image {
            None => None,
            Some(ImagePart::Broken(reason)) => Some(ImageUpload::Failed(reason)),
            Some(ImagePart::TooLarge) => {
                errors.add(
                    "image",
                    format!(
                        "L'image ne doit pas dépasser {} Ko.",
                        max_image_bytes / 1024
                    ),
                );
                None
            }
            // No file chosen in the browser.
            Some(ImagePart::File(file)) if file.bytes.is_empty() => None,
            Some(ImagePart::File(file)) => match image_content_type(&file) {
                Some(content_type) => Some(ImageUpload::Received(UploadedFile {
                    content_type,
                    ..file
                })),
                None => {
                    errors.add("image", "Le fichier doit être une image.");
                    None
                }
            },
        };

        errors.into_result()?;

        Ok(PostInput {
            title,
            slug,
            content,
            category_id,
            tag_ids,
            image,
        })
    }
}

/// The declared type when it is an image, else the type guessed from the name.
fn image_content_type(file: &UploadedFile) -> Option<String> {
    if file.content_type.starts_with("image/") {
        return Some(file.content_type.clone());
    }

    mime_guess::from_path(&file.file_name)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}

/// Decode a multipart post submission.
pub async fn read_post_form(mut payload: Multipart, max_image_bytes: usize) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) if matches!(form.image, Some(ImagePart::Broken(_))) => {
                tracing::warn!("Stopped reading form after broken upload: {}", e);
                break;
            }
            Err(e) => return Err(AppError::BadRequest(format!("Malformed form data: {}", e))),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => form.image = Some(read_image(&mut field, max_image_bytes).await),
            "title" => form.title = read_text(&mut field).await?,
            "slug" => form.slug = read_text(&mut field).await?,
            "content" => form.content = read_text(&mut field).await?,
            "category_id" => form.category_id = read_text(&mut field).await?,
            "tags[]" => form.tags.push(read_text(&mut field).await?),
            // HTML form method override
            "_method" => {
                read_text(&mut field).await?;
            }
            _ => {
                drain(&mut field).await;
                form.unexpected.push(name);
            }
        }
    }

    Ok(form)
}

async fn read_text(field: &mut Field) -> AppResult<String> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("Form field too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| AppError::BadRequest("Form field is not UTF-8".to_string()))
}

async fn read_image(field: &mut Field, max_image_bytes: usize) -> ImagePart {
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .unwrap_or_default()
        .to_string();
    let content_type = field
        .content_type()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default();

    let mut bytes = Vec::new();
    let mut too_large = false;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return ImagePart::Broken(e.to_string()),
        };
        if too_large || bytes.len() + chunk.len() > max_image_bytes {
            too_large = true;
            continue;
        }
        bytes.extend_from_slice(&chunk);
    }

    if too_large {
        tracing::debug!(%file_name, max_image_bytes, "Rejected oversized image");
        return ImagePart::TooLarge;
    }

    ImagePart::File(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}

async fn drain(field: &mut Field) {
    while let Some(chunk) = field.next().await {
        if chunk.is_err() {
            break;
        }
    }
}
