//! Photo domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A photo owned by a user
///
/// Photos live and die with their owner: they are written when the owning
/// user is updated and removed when the user is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: Option<i64>,
    pub title: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl Photo {
    pub fn new(title: impl Into<String>, url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
            latitude: None,
            longitude: None,
            width,
            height,
            uploaded_at: Utc::now(),
        }
    }

    /// Set the location the photo was taken at
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Both coordinates, or `None` when either is missing
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Map marker size preserving aspect ratio, longest side `max_side`
    pub fn marker_size(&self, max_side: f64) -> (f64, f64) {
        if self.width == 0 || self.height == 0 || self.width == self.height {
            return (max_side, max_side);
        }
        let (w, h) = (self.width as f64, self.height as f64);
        if w > h {
            (max_side, max_side * h / w)
        } else {
            (max_side * w / h, max_side)
        }
    }
}
