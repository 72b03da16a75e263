//! Request bodies: the multipart report form plus the urlencoded
//! account, comment and query shapes.

use actix_multipart::{Multipart, MultipartError};
use futures_util::TryStreamExt;
use serde::Deserialize;
use wp_core::error::{AppError, Result};
use wp_core::models::{CommentDraft, Registration, ReportDraft};

/// Uploads larger than this are rejected before they reach the image decoder.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// A photo as it arrived on the wire.
#[derive(Debug)]
pub struct UploadedPhoto {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Raw fields of the add/edit report form, keyed by their form names:
/// `title`, `description`, `tags`, `location[address]`,
/// `location[coordinates][0]` (lng), `location[coordinates][1]` (lat), `photo`.
#[derive(Debug, Default)]
pub struct ReportForm {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub photo: Option<UploadedPhoto>,
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::ValidationError(format!("malformed form data: {err}"))
}

fn text(data: Vec<u8>, field: &str) -> Result<String> {
    String::from_utf8(data).map_err(|_| AppError::ValidationError(format!("{field} must be valid UTF-8")))
}

impl ReportForm {
    pub async fn from_multipart(mut payload: Multipart) -> Result<Self> {
        let mut form = ReportForm::default();

        while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
            let name = field.content_disposition().get_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

            let mut data = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                if data.len() + chunk.len() > MAX_PHOTO_BYTES {
                    return Err(AppError::ValidationError("That file is too large!".into()));
                }
                data.extend_from_slice(&chunk);
            }

            match name.as_str() {
                "photo" => {
                    // An empty file input still submits an empty part.
                    if data.is_empty() {
                        continue;
                    }
                    let content_type = content_type.unwrap_or_default();
                    if !content_type.starts_with("image/") {
                        return Err(AppError::ValidationError("That filetype isn't allowed!".into()));
                    }
                    form.photo = Some(UploadedPhoto { content_type, data });
                }
                "title" => form.title = text(data, "title")?,
                "description" => form.description = text(data, "description")?,
                "tags" | "tags[]" => form.tags.push(text(data, "tags")?),
                "location[address]" => form.address = text(data, "address")?,
                "location[coordinates][0]" => form.lng = text(data, "longitude")?,
                "location[coordinates][1]" => form.lat = text(data, "latitude")?,
                other => log::debug!("ignoring unknown form field {other:?}"),
            }
        }

        Ok(form)
    }

    /// Splits the form into a draft (photo unset) and the pending upload.
    pub fn into_draft(self) -> Result<(ReportDraft, Option<UploadedPhoto>)> {
        let draft = ReportDraft {
            lng: parse_coordinate(&self.lng, "longitude")?,
            lat: parse_coordinate(&self.lat, "latitude")?,
            title: self.title,
            description: Some(self.description).filter(|d| !d.trim().is_empty()),
            tags: self.tags,
            address: self.address,
            photo: None,
        };
        Ok((draft, self.photo))
    }
}

fn parse_coordinate(raw: &str, name: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError("You must supply coordinates!".into()));
    }
    raw.parse()
        .map_err(|_| AppError::ValidationError(format!("{name} must be a number")))
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

impl From<RegisterForm> for Registration {
    fn from(form: RegisterForm) -> Self {
        Registration {
            name: form.name,
            email: form.email,
            password: form.password,
            confirm: form.password_confirm,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Rating arrives from a radio group, so it may be absent or empty.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
    #[serde(default)]
    pub rating: Option<String>,
}

impl CommentForm {
    pub fn into_draft(self) -> Result<CommentDraft> {
        let rating = match self.rating.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::ValidationError("Rating must be a whole number".into()))?,
            ),
        };
        Ok(CommentDraft { text: self.text, rating })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Coordinates stay strings here so a bad value produces our own 400 body.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: Option<String>,
    pub lat: Option<String>,
}

impl NearQuery {
    pub fn point(&self) -> Result<(f64, f64)> {
        let lng = parse_coordinate(self.lng.as_deref().unwrap_or_default(), "lng")?;
        let lat = parse_coordinate(self.lat.as_deref().unwrap_or_default(), "lat")?;
        Ok((lng, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_form_into_draft() {
        let form = ReportForm {
            title: "Sunset Point".into(),
            description: "  ".into(),
            tags: vec!["Family Friendly".into()],
            address: "Boracay".into(),
            lng: " 122.5 ".into(),
            lat: "10.7".into(),
            photo: None,
        };
        let (draft, photo) = form.into_draft().unwrap();
        assert_eq!((draft.lng, draft.lat), (122.5, 10.7));
        assert_eq!(draft.description, None);
        assert!(photo.is_none());
    }

    #[test]
    fn test_bad_coordinates_are_validation_errors() {
        let form = ReportForm { lng: "east".into(), lat: "1".into(), ..Default::default() };
        assert!(matches!(form.into_draft(), Err(AppError::ValidationError(_))));

        let missing = NearQuery { lng: Some("1".into()), lat: None };
        assert!(matches!(missing.point(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_comment_rating_parsing() {
        let blank = CommentForm { text: "nice".into(), rating: Some("".into()) };
        assert_eq!(blank.into_draft().unwrap().rating, None);

        let five = CommentForm { text: "nice".into(), rating: Some("5".into()) };
        assert_eq!(five.into_draft().unwrap().rating, Some(5));

        let junk = CommentForm { text: "nice".into(), rating: Some("five".into()) };
        assert!(junk.into_draft().is_err());
    }
}
