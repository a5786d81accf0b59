use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::db::models::{Banner, BannerType, Facility, Service};
use crate::service::banners::{active_set, viewport_class};
use crate::service::carousel::{Carousel, rotation};
use crate::service::catalog::{self, Listing};
use crate::{PortalError, router::PortalState};

#[derive(Debug, Deserialize)]
pub struct ViewportQuery {
    /// Viewport width in logical pixels; desktop when absent.
    pub width: Option<u32>,
    /// Slide to start the rotation on, as picked from the slide indicator.
    pub slide: Option<usize>,
}

impl ViewportQuery {
    fn class(&self, state: &PortalState) -> BannerType {
        self.width
            .map(|w| viewport_class(w, state.display.mobile_breakpoint))
            .unwrap_or(BannerType::Desktop)
    }
}

#[derive(Debug, Serialize)]
pub struct ActiveBanners {
    pub viewport: BannerType,
    #[serde(flatten)]
    pub listing: Listing<Banner>,
}

/// GET /health -> confirms the table store answers.
pub async fn health(State(state): State<PortalState>) -> Result<Json<Value>, PortalError> {
    let facilities = catalog::facility_count(&state.backend).await?;
    Ok(Json(json!({ "status": "ok", "facilities": facilities })))
}

/// GET /api/banners/active?width= -> the active set for the caller's viewport class.
pub async fn active_banners(
    State(state): State<PortalState>,
    Query(query): Query<ViewportQuery>,
) -> Result<Json<ActiveBanners>, PortalError> {
    let viewport = query.class(&state);
    let banners = active_set(&state.backend, viewport).await?;
    Ok(Json(ActiveBanners {
        viewport,
        listing: Listing::new(banners, "No banners available"),
    }))
}

/// GET /api/banners/rotation?width= -> SSE stream of the slide to display.
///
/// A viewport-class switch on the client means reconnecting with the new
/// width, which starts a fresh rotation at index 0. Clicking a slide dot
/// reconnects with `slide=` to resume from that banner.
pub async fn banner_rotation(
    State(state): State<PortalState>,
    Query(query): Query<ViewportQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, PortalError> {
    let viewport = query.class(&state);
    let mut carousel = Carousel::new(active_set(&state.backend, viewport).await?);
    if let Some(index) = query.slide
        && !carousel.select(index)
    {
        debug!(index, total = carousel.len(), "slide out of range; starting at 0");
    }
    let slides = rotation(carousel, state.display.rotation_interval())
        .map(|slide| Event::default().event("slide").json_data(slide));
    Ok(Sse::new(slides).keep_alive(KeepAlive::default()))
}

/// GET /api/facilities
pub async fn facilities(
    State(state): State<PortalState>,
) -> Result<Json<Listing<Facility>>, PortalError> {
    Ok(Json(catalog::facilities(&state.publisher).await?))
}

/// GET /api/services
pub async fn services(
    State(state): State<PortalState>,
) -> Result<Json<Listing<Service>>, PortalError> {
    Ok(Json(catalog::services(&state.publisher).await?))
}
