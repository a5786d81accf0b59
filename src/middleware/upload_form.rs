use axum::extract::{FromRequest, Multipart, Request};
use std::collections::HashMap;

use crate::error::PortalError;
use crate::service::publish::{BannerFields, CatalogFields, ImageUpload};

/// Multipart form field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// An admin form submission: text fields plus an optional image.
///
/// A file input left empty arrives as a zero-length part and is treated as
/// "no image selected".
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| PortalError::validation(rejection.body_text()))?;

        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name != IMAGE_FIELD {
                form.fields.insert(name, field.text().await?);
                continue;
            }

            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(PortalError::validation("The selected file is not an image"));
            }
            form.image = Some(ImageUpload {
                file_name,
                content_type,
                bytes,
            });
        }
        Ok(form)
    }
}

/// Metadata that can be read out of an [`UploadForm`].
pub trait FormFields: Sized {
    fn from_form(form: &UploadForm) -> Result<Self, PortalError>;
}

impl FormFields for CatalogFields {
    fn from_form(form: &UploadForm) -> Result<Self, PortalError> {
        Ok(CatalogFields {
            name: form.text("name"),
            description: form.text("description"),
        })
    }
}

impl FormFields for BannerFields {
    fn from_form(form: &UploadForm) -> Result<Self, PortalError> {
        let kind = match form.fields.get("type") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Default::default(),
        };
        Ok(BannerFields {
            title: form.text("title"),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BannerType;

    fn form(pairs: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image: None,
        }
    }

    #[test]
    fn banner_type_defaults_to_desktop() {
        let fields = BannerFields::from_form(&form(&[("title", "Open day")])).unwrap();
        assert_eq!(fields.kind, BannerType::Desktop);
        assert_eq!(fields.title, "Open day");
    }

    #[test]
    fn bad_banner_type_is_rejected() {
        let err = BannerFields::from_form(&form(&[("title", "x"), ("type", "tv")])).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[test]
    fn missing_catalog_fields_read_as_empty() {
        let fields = CatalogFields::from_form(&form(&[("name", "Lab")])).unwrap();
        assert_eq!(fields.description, "");
    }
}
