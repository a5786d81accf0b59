use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::middleware::auth::{Capability, Student};
use crate::service::catalog;
use crate::{PortalError, router::PortalState};

/// GET /api/student/modules -> knowledge modules for a signed-in student.
pub async fn modules(
    cap: Capability<Student>,
    State(state): State<PortalState>,
) -> Result<Json<Value>, PortalError> {
    let modules = catalog::modules(&state.backend).await?;
    Ok(Json(json!({ "user": cap.email(), "modules": modules })))
}
