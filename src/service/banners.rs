use crate::backend::{Backend, Select, Table};
use crate::db::models::{Banner, BannerType, from_record};
use crate::error::PortalError;
use crate::service::publish::Publisher;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

/// Viewport class for a width in logical pixels.
pub fn viewport_class(width: u32, mobile_breakpoint: u32) -> BannerType {
    if width < mobile_breakpoint {
        BannerType::Mobile
    } else {
        BannerType::Desktop
    }
}

/// Active banners of one type, in storage order.
pub async fn active_set(backend: &Backend, kind: BannerType) -> Result<Vec<Banner>, PortalError> {
    let rows = backend
        .tables
        .select(
            Select::from(Table::Banners)
                .eq("active", true)
                .eq("type", kind.as_str()),
        )
        .await
        .inspect_err(|e| error!(kind = %kind, error = %e, "fetching active banners failed"))?;
    rows.into_iter().map(from_record).collect()
}

/// Admin view of all banners split by type, newest first.
#[derive(Debug, Serialize)]
pub struct BannerBoard {
    pub desktop: Vec<Banner>,
    pub mobile: Vec<Banner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop_empty: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_empty: Option<&'static str>,
}

impl BannerBoard {
    pub fn from_banners(banners: Vec<Banner>) -> Self {
        let (mobile, desktop): (Vec<_>, Vec<_>) = banners
            .into_iter()
            .partition(|b| b.kind == BannerType::Mobile);
        Self {
            desktop_empty: desktop.is_empty().then_some("No desktop banners available"),
            mobile_empty: mobile.is_empty().then_some("No mobile banners available"),
            desktop,
            mobile,
        }
    }
}

pub async fn board(publisher: &Publisher) -> Result<BannerBoard, PortalError> {
    Ok(BannerBoard::from_banners(publisher.list::<Banner>().await?))
}

/// Flip a banner between active and inactive.
pub async fn toggle_active(publisher: &Publisher, id: i64) -> Result<Banner, PortalError> {
    let banner: Banner = publisher.find(id).await?;
    let mut patch = crate::backend::Record::new();
    patch.insert("active".into(), Value::Bool(!banner.active));
    let row = publisher
        .backend()
        .tables
        .update_by_id(Table::Banners, id, patch)
        .await
        .inspect_err(|e| error!(id, error = %e, "toggling banner status failed"))?;
    let updated: Banner = from_record(row)?;
    info!(id, active = updated.active, "banner status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Record;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    fn seed(mem: &MemoryBackend, id: i64, kind: &str, active: bool, created_at: &str) {
        let row: Record = json!({
            "id": id,
            "title": format!("banner {id}"),
            "image_url": format!("http://objects.test/public/banners/banner-{kind}-{id}.png"),
            "active": active,
            "type": kind,
            "created_at": created_at,
        })
        .as_object()
        .cloned()
        .unwrap();
        mem.tables.seed(Table::Banners, row);
    }

    #[test]
    fn breakpoint_splits_mobile_from_desktop() {
        assert_eq!(viewport_class(767, 768), BannerType::Mobile);
        assert_eq!(viewport_class(768, 768), BannerType::Desktop);
        assert_eq!(viewport_class(1920, 768), BannerType::Desktop);
    }

    #[tokio::test]
    async fn active_set_filters_by_status_and_type() {
        let mem = MemoryBackend::default();
        seed(&mem, 1, "desktop", true, "2024-01-01T00:00:00Z");
        seed(&mem, 2, "desktop", false, "2024-01-02T00:00:00Z");
        seed(&mem, 3, "mobile", true, "2024-01-03T00:00:00Z");

        let desktop = active_set(&mem.backend(), BannerType::Desktop).await.unwrap();
        assert_eq!(desktop.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1]);
        let mobile = active_set(&mem.backend(), BannerType::Mobile).await.unwrap();
        assert_eq!(mobile.iter().map(|b| b.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn board_is_newest_first_with_empty_states() {
        let mem = MemoryBackend::default();
        seed(&mem, 1, "desktop", true, "2024-01-01T00:00:00Z");
        seed(&mem, 2, "desktop", false, "2024-03-01T00:00:00Z");

        let board = board(&Publisher::new(mem.backend())).await.unwrap();
        assert_eq!(board.desktop.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(board.mobile.is_empty());
        assert_eq!(board.mobile_empty, Some("No mobile banners available"));
        assert_eq!(board.desktop_empty, None);
    }

    #[tokio::test]
    async fn toggle_flips_active_flag() {
        let mem = MemoryBackend::default();
        seed(&mem, 5, "mobile", true, "2024-01-01T00:00:00Z");
        let publisher = Publisher::new(mem.backend());

        assert!(!toggle_active(&publisher, 5).await.unwrap().active);
        assert!(toggle_active(&publisher, 5).await.unwrap().active);
        assert!(matches!(
            toggle_active(&publisher, 99).await,
            Err(PortalError::NotFound { id: 99, .. })
        ));
    }
}
