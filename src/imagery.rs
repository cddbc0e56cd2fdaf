//! Aerial imagery behind the projected tracks.
//!
//! Downloading is left to an [`ImageryProvider`]; this module only decides
//! what to ask for and memoizes the answers in an [`ImageryCache`].

use crate::error::{ImageryError, ValidationError};
use crate::projection::ProjectionResult;
use crate::sample::GeoBounds;
use crate::validation::{validate_dimension, validate_tolerance};
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TOLERANCE: f64 = 0.001;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Request size for the content area of a projection, `multiplier` times
    /// the on-screen size so the image stays sharp when zoomed.
    pub fn for_content(result: &ProjectionResult, multiplier: u32) -> Self {
        Self {
            width: (result.content_width as u32).saturating_mul(multiplier),
            height: (result.content_height as u32).saturating_mul(multiplier),
        }
    }
}

pub trait ImageryProvider {
    type Image: Clone;

    fn fetch(
        &self,
        bounds: &GeoBounds,
        dimensions: ImageDimensions,
    ) -> Result<Self::Image, ImageryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    bounds: [i64; 4],
    dimensions: ImageDimensions,
}

struct CacheEntry<I> {
    image: I,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub oldest: Option<Instant>,
    pub newest: Option<Instant>,
}

/// In-memory image cache with a fixed time to live.
///
/// Keys snap each edge of the box to a grid of `tolerance` degrees, so boxes
/// that differ by less than that share an entry.
pub struct ImageryCache<I> {
    entries: HashMap<CacheKey, CacheEntry<I>>,
    tolerance: f64,
    ttl: Duration,
}

impl<I: Clone> Default for ImageryCache<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            tolerance: DEFAULT_TOLERANCE,
            ttl: DEFAULT_TTL,
        }
    }
}

impl<I: Clone> ImageryCache<I> {
    /// Fails unless `tolerance` is a finite grid size in (0, 1] degrees.
    pub fn new(tolerance: f64, ttl: Duration) -> Result<Self, ValidationError> {
        Ok(Self {
            entries: HashMap::new(),
            tolerance: validate_tolerance(tolerance)?,
            ttl,
        })
    }

    fn key(&self, bounds: &GeoBounds, dimensions: ImageDimensions) -> CacheKey {
        let snap = |value: f64| (value / self.tolerance).round() as i64;
        CacheKey {
            bounds: [
                snap(bounds.min_lon),
                snap(bounds.min_lat),
                snap(bounds.max_lon),
                snap(bounds.max_lat),
            ],
            dimensions,
        }
    }

    pub fn get(&mut self, bounds: &GeoBounds, dimensions: ImageDimensions) -> Option<I> {
        self.get_at(bounds, dimensions, Instant::now())
    }

    pub fn insert(&mut self, bounds: &GeoBounds, dimensions: ImageDimensions, image: I) {
        self.insert_at(bounds, dimensions, image, Instant::now());
    }

    fn get_at(
        &mut self,
        bounds: &GeoBounds,
        dimensions: ImageDimensions,
        now: Instant,
    ) -> Option<I> {
        self.evict_expired(now);
        let key = self.key(bounds, dimensions);
        self.entries.get(&key).map(|entry| entry.image.clone())
    }

    fn insert_at(
        &mut self,
        bounds: &GeoBounds,
        dimensions: ImageDimensions,
        image: I,
        now: Instant,
    ) {
        let key = self.key(bounds, dimensions);
        self.entries.insert(
            key,
            CacheEntry {
                image,
                inserted_at: now,
            },
        );
        self.evict_expired(now);
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) <= ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("Evicted {evicted} expired imagery entries");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&mut self) -> CacheStats {
        self.evict_expired(Instant::now());
        CacheStats {
            entries: self.entries.len(),
            oldest: self.entries.values().map(|e| e.inserted_at).min(),
            newest: self.entries.values().map(|e| e.inserted_at).max(),
        }
    }
}

/// Returns the cached image for the request, or fetches and caches it.
/// Failed fetches are not cached.
pub fn fetch_cached<P: ImageryProvider>(
    provider: &P,
    cache: &mut ImageryCache<P::Image>,
    bounds: &GeoBounds,
    dimensions: ImageDimensions,
) -> Result<P::Image, ImageryError> {
    bounds.validate()?;
    validate_dimension(dimensions.width, "image width")?;
    validate_dimension(dimensions.height, "image height")?;

    if let Some(image) = cache.get(bounds, dimensions) {
        debug!("Using cached aerial view for {:?}", bounds);
        return Ok(image);
    }

    debug!("Downloading new aerial view for {:?}", bounds);
    let image = provider.fetch(bounds, dimensions)?;
    cache.insert(bounds, dimensions, image.clone());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl ImageryProvider for CountingProvider {
        type Image = String;

        fn fetch(
            &self,
            bounds: &GeoBounds,
            dimensions: ImageDimensions,
        ) -> Result<String, ImageryError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ImageryError::Provider("service unavailable".into()));
            }
            Ok(format!(
                "{}x{}@{}",
                dimensions.width, dimensions.height, bounds.min_lon
            ))
        }
    }

    fn leuven() -> GeoBounds {
        GeoBounds {
            min_lon: 4.60,
            min_lat: 50.80,
            max_lon: 4.80,
            max_lat: 50.95,
        }
    }

    const DIMS: ImageDimensions = ImageDimensions {
        width: 2326,
        height: 1680,
    };

    #[test]
    fn second_request_is_served_from_cache() {
        let provider = CountingProvider::new(false);
        let mut cache = ImageryCache::default();

        let first = fetch_cached(&provider, &mut cache, &leuven(), DIMS).unwrap();
        let nudged = GeoBounds {
            min_lon: 4.600_2,
            ..leuven()
        };
        let second = fetch_cached(&provider, &mut cache, &nudged, DIMS).unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn other_dimensions_or_far_bounds_miss() {
        let provider = CountingProvider::new(false);
        let mut cache = ImageryCache::default();

        fetch_cached(&provider, &mut cache, &leuven(), DIMS).unwrap();
        let smaller = ImageDimensions {
            width: 1163,
            height: 840,
        };
        fetch_cached(&provider, &mut cache, &leuven(), smaller).unwrap();
        let moved = GeoBounds {
            min_lon: 4.61,
            ..leuven()
        };
        fetch_cached(&provider, &mut cache, &moved, DIMS).unwrap();

        assert_eq!(provider.calls.get(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = ImageryCache::new(DEFAULT_TOLERANCE, Duration::from_secs(60)).unwrap();
        let start = Instant::now();

        cache.insert_at(&leuven(), DIMS, "tile".to_string(), start);
        assert_eq!(
            cache.get_at(&leuven(), DIMS, start + Duration::from_secs(59)),
            Some("tile".to_string())
        );
        assert_eq!(
            cache.get_at(&leuven(), DIMS, start + Duration::from_secs(61)),
            None
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn tolerance_must_be_positive_and_finite() {
        for tolerance in [0.0, -0.001, f64::NAN, f64::INFINITY] {
            assert!(
                ImageryCache::<String>::new(tolerance, DEFAULT_TTL).is_err(),
                "tolerance {tolerance} accepted"
            );
        }

        let mut coarse = ImageryCache::new(0.1, DEFAULT_TTL).unwrap();
        coarse.insert(&leuven(), DIMS, "coarse".to_string());
        let moved = GeoBounds {
            min_lon: 4.62,
            ..leuven()
        };
        assert_eq!(coarse.get(&moved, DIMS), Some("coarse".to_string()));
    }

    #[test]
    fn failures_are_not_cached() {
        let provider = CountingProvider::new(true);
        let mut cache = ImageryCache::default();

        assert!(fetch_cached(&provider, &mut cache, &leuven(), DIMS).is_err());
        assert!(fetch_cached(&provider, &mut cache, &leuven(), DIMS).is_err());
        assert_eq!(provider.calls.get(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalid_requests_never_reach_the_provider() {
        let provider = CountingProvider::new(false);
        let mut cache = ImageryCache::default();
        let zero = ImageDimensions {
            width: 0,
            height: 10,
        };
        assert!(matches!(
            fetch_cached(&provider, &mut cache, &leuven(), zero),
            Err(ImageryError::InvalidRequest(_))
        ));
        assert_eq!(provider.calls.get(), 0);
    }

    #[test]
    fn stats_track_oldest_and_newest() {
        let mut cache = ImageryCache::default();
        assert_eq!(cache.stats().entries, 0);
        cache.insert(&leuven(), DIMS, 1u8);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.oldest, stats.newest);
        cache.clear();
        assert!(cache.is_empty());
    }
}
