use serde::{Deserialize, Serialize};

pub const DEFAULT_CENTER: LatLon = LatLon {
    lat: 51.445,
    lon: -0.22,
};
pub const DEFAULT_ZOOM: f64 = 11.3;

/// Basemap styles offered by the map, `(value, label)`.
pub const MAP_STYLES: &[(&str, &str)] = &[
    ("open-street-map", "OpenStreetMap"),
    ("carto-voyager", "Carto Voyager"),
    ("carto-positron", "Carto Positron"),
    ("stamen-terrain", "Stamen Terrain"),
];
pub const DEFAULT_MAP_STYLE: &str = "carto-voyager";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Map center and zoom. Only pan/zoom gestures change it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: LatLon,
    pub zoom: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// A pan/zoom gesture; absent fields leave the view untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewChange {
    pub center: Option<LatLon>,
    pub zoom: Option<f64>,
}

impl ViewChange {
    pub fn is_empty(&self) -> bool {
        self.center.is_none() && self.zoom.is_none()
    }
}

impl ViewState {
    /// Merge `change` into this view. Non-finite values are ignored.
    pub fn apply_pan(&self, change: &ViewChange) -> ViewState {
        let center = change
            .center
            .filter(|c| c.lat.is_finite() && c.lon.is_finite())
            .unwrap_or(self.center);
        let zoom = change.zoom.filter(|z| z.is_finite()).unwrap_or(self.zoom);
        ViewState { center, zoom }
    }

    pub fn marker_size(&self) -> u32 {
        marker_size_for_zoom(self.zoom)
    }
}

/// Marker diameter in pixels: `max(7, floor(20 * 1.2^(zoom - 12)))`.
pub fn marker_size_for_zoom(zoom: f64) -> u32 {
    let size = (20.0 * 1.2f64.powf(zoom - 12.0)).floor();
    if size.is_finite() && size > 7.0 {
        size as u32
    } else {
        7
    }
}

pub fn is_known_map_style(style: &str) -> bool {
    MAP_STYLES.iter().any(|(value, _)| *value == style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_change_returns_previous() {
        let view = ViewState {
            center: LatLon { lat: 51.5, lon: -0.1 },
            zoom: 13.0,
        };
        assert_eq!(view.apply_pan(&ViewChange::default()), view);
    }

    #[test]
    fn zoom_only_change_keeps_center_and_vice_versa() {
        let view = ViewState::default();
        let zoomed = view.apply_pan(&ViewChange {
            center: None,
            zoom: Some(14.5),
        });
        assert_eq!(zoomed.center, DEFAULT_CENTER);
        assert_eq!(zoomed.zoom, 14.5);

        let panned = zoomed.apply_pan(&ViewChange {
            center: Some(LatLon { lat: 51.41, lon: -0.19 }),
            zoom: None,
        });
        assert_eq!(panned.zoom, 14.5);
        assert_eq!(panned.center.lat, 51.41);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let view = ViewState::default();
        let next = view.apply_pan(&ViewChange {
            center: Some(LatLon { lat: f64::NAN, lon: 0.0 }),
            zoom: Some(f64::INFINITY),
        });
        assert_eq!(next, view);
    }

    #[test]
    fn marker_size_scales_with_zoom() {
        assert_eq!(marker_size_for_zoom(12.0), 20);
        assert_eq!(marker_size_for_zoom(13.0), 24);
        assert_eq!(marker_size_for_zoom(11.3), 17);
        assert_eq!(marker_size_for_zoom(5.0), 7);
    }

    #[test]
    fn default_style_is_offered() {
        assert!(is_known_map_style(DEFAULT_MAP_STYLE));
        assert!(!is_known_map_style("satellite"));
    }
}
