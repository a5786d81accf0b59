//! Banner rotation: a cursor over the active set, advanced on a timer.

use crate::db::models::Banner;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

#[derive(Debug, Clone, Default)]
pub struct Carousel {
    banners: Vec<Banner>,
    index: usize,
}

/// What the display should show right now.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Slide {
    pub index: usize,
    pub total: usize,
    pub banner: Option<Banner>,
}

impl Carousel {
    pub fn new(banners: Vec<Banner>) -> Self {
        Self { banners, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.banners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rotates(&self) -> bool {
        self.banners.len() > 1
    }

    /// Swap in a new active set; the cursor restarts at the first banner.
    pub fn replace(&mut self, banners: Vec<Banner>) {
        self.banners = banners;
        self.index = 0;
    }

    /// Step to the next banner, wrapping around. No-op for 0 or 1 banners.
    pub fn advance(&mut self) {
        if self.rotates() {
            self.index = (self.index + 1) % self.banners.len();
        }
    }

    /// Jump straight to a banner (slide indicator); out-of-range is ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.banners.len() {
            self.index = index;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&Banner> {
        self.banners.get(self.index)
    }

    pub fn slide(&self) -> Slide {
        Slide {
            index: self.index,
            total: self.banners.len(),
            banner: self.current().cloned(),
        }
    }
}

/// Emit the current slide immediately, then one slide per `period` as the
/// carousel advances. With fewer than two banners the stream emits once and
/// then stays pending. Dropping the stream cancels the timer.
pub fn rotation(mut carousel: Carousel, period: Duration) -> impl Stream<Item = Slide> + Send {
    let first = stream::once(futures::future::ready(carousel.slide()));
    if !carousel.rotates() {
        return first.chain(stream::pending()).boxed();
    }

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ticks = IntervalStream::new(interval).map(move |_| {
        carousel.advance();
        carousel.slide()
    });
    first.chain(ticks).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BannerType;
    use chrono::Utc;

    fn banner(id: i64) -> Banner {
        Banner {
            id,
            title: format!("banner {id}"),
            image_url: format!("http://objects.test/banners/banner-desktop-{id}.png"),
            active: true,
            kind: BannerType::Desktop,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn advance_wraps_modulo_set_size() {
        let mut c = Carousel::new(vec![banner(1), banner(2), banner(3)]);
        let seen: Vec<usize> = (0..4)
            .map(|_| {
                c.advance();
                c.index()
            })
            .collect();
        assert_eq!(seen, vec![1, 2, 0, 1]);
    }

    #[test]
    fn single_or_empty_sets_do_not_rotate() {
        let mut c = Carousel::new(vec![banner(1)]);
        c.advance();
        assert_eq!(c.index(), 0);

        let mut empty = Carousel::default();
        empty.advance();
        assert!(empty.current().is_none());
        assert_eq!(empty.slide().total, 0);
    }

    #[test]
    fn replace_resets_cursor() {
        let mut c = Carousel::new(vec![banner(1), banner(2), banner(3)]);
        c.advance();
        c.advance();
        c.replace(vec![banner(4), banner(5)]);
        assert_eq!(c.index(), 0);
        assert_eq!(c.current().map(|b| b.id), Some(4));
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut c = Carousel::new(vec![banner(1), banner(2)]);
        assert!(c.select(1));
        assert!(!c.select(2));
        assert_eq!(c.index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_advances_every_period() {
        let start = Instant::now();
        let carousel = Carousel::new(vec![banner(1), banner(2), banner(3)]);
        let slides: Vec<Slide> = rotation(carousel, Duration::from_secs(5))
            .take(5)
            .collect()
            .await;

        let indices: Vec<usize> = slides.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1]);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn single_banner_emits_once() {
        let carousel = Carousel::new(vec![banner(1)]);
        let mut slides = rotation(carousel, Duration::from_secs(5));
        assert_eq!(slides.next().await.map(|s| s.index), Some(0));
        let next = tokio::time::timeout(Duration::from_secs(60), slides.next()).await;
        assert!(next.is_err());
    }
}
