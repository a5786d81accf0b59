use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::db::models::{Banner, User};
use crate::middleware::auth::{Admin, Capability};
use crate::middleware::upload_form::{FormFields, UploadForm};
use crate::service::banners::{self, BannerBoard};
use crate::service::catalog::{self, Listing};
use crate::service::publish::Publishable;
use crate::{PortalError, router::PortalState};

/// `?confirm=true` stands in for the "Are you sure?" dialog.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

fn title_case(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn outcome<T: Serialize>(message: String, item: &T) -> Json<Value> {
    Json(json!({ "message": message, "item": item }))
}

/// GET /api/admin/students
pub async fn students(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
) -> Result<Json<Listing<User>>, PortalError> {
    Ok(Json(catalog::students(&state.backend).await?))
}

/// GET /api/admin/banners -> all banners, newest first, split by type.
pub async fn banners(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
) -> Result<Json<BannerBoard>, PortalError> {
    Ok(Json(banners::board(&state.publisher).await?))
}

/// PATCH /api/admin/banners/{id}/active
pub async fn toggle_banner(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, PortalError> {
    let banner: Banner = banners::toggle_active(&state.publisher, id).await?;
    let status = if banner.active { "activated" } else { "deactivated" };
    Ok(outcome(format!("Banner {status}"), &banner))
}

/// GET /api/admin/{entities}
pub async fn list<P>(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
) -> Result<Json<Value>, PortalError>
where
    P: Publishable + Serialize,
{
    let items = state.publisher.list::<P>().await?;
    let empty = items.is_empty();
    Ok(Json(json!({
        "items": items,
        "empty_message": empty.then(|| format!("No {} available", P::TABLE.name())),
    })))
}

/// POST /api/admin/{entities} (multipart) -> upload the image and insert the row.
pub async fn create<P>(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
    form: UploadForm,
) -> Result<Json<Value>, PortalError>
where
    P: Publishable + Serialize,
    P::Fields: FormFields,
{
    let fields = P::Fields::from_form(&form)?;
    let created: P = state.publisher.create(fields, form.image).await?;
    Ok(outcome(
        format!("{} added successfully", title_case(P::ENTITY)),
        &created,
    ))
}

/// PUT /api/admin/{entities}/{id} (multipart) -> edit metadata, optionally replace the image.
pub async fn update<P>(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
    Path(id): Path<i64>,
    form: UploadForm,
) -> Result<Json<Value>, PortalError>
where
    P: Publishable + Serialize,
    P::Fields: FormFields,
{
    let fields = P::Fields::from_form(&form)?;
    let updated: P = state.publisher.update(id, fields, form.image).await?;
    Ok(outcome(
        format!("{} updated successfully", title_case(P::ENTITY)),
        &updated,
    ))
}

/// DELETE /api/admin/{entities}/{id}?confirm=true
pub async fn delete<P>(
    _cap: Capability<Admin>,
    State(state): State<PortalState>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Value>, PortalError>
where
    P: Publishable,
{
    state.publisher.delete::<P>(id, query.confirm).await?;
    Ok(Json(json!({
        "message": format!("{} deleted successfully", title_case(P::ENTITY)),
        "id": id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_labels_are_title_cased() {
        assert_eq!(title_case("facility"), "Facility");
        assert_eq!(title_case(""), "");
    }
}
