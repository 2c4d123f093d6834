//! Render configuration.

use artlife_universe::record::Species;
use serde::{Deserialize, Serialize};

use crate::surface::Color;
use crate::RenderError;

/// Configuration for the render loop.
///
/// The surface is sized to the field scaled by
/// [`display_scale`](Self::display_scale); the field itself is drawn in
/// simulation units, so the margin to the right and below the field stays
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface size as a multiple of the field size. Default: 1.2.
    pub display_scale: f64,
    /// Radius of every population point, in simulation units. Default: 5.
    pub point_radius: f64,
    /// Stroke color of the field outline. Default: black.
    pub field_color: Color,
    /// Stroke color of the population path. Default: black.
    pub population_color: Color,
    /// Straight segments per full circle when a surface has to tessellate
    /// arcs. Default: 24.
    pub arc_segments: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            display_scale: 1.2,
            point_radius: 5.0,
            field_color: Color::BLACK,
            population_color: Color::BLACK,
            arc_segments: 24,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] for malformed JSON or out-of-range
    /// values.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Stroke the population in `species`' display color.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidColor`] if the species color does not
    /// parse.
    pub fn with_species_color(mut self, species: Species) -> Result<Self, RenderError> {
        self.population_color = Color::parse_hex(species.color())?;
        Ok(self)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.display_scale.is_finite() && self.display_scale > 0.0) {
            return Err(RenderError::Config(format!(
                "display_scale must be positive and finite, got {}",
                self.display_scale
            )));
        }
        if !(self.point_radius.is_finite() && self.point_radius > 0.0) {
            return Err(RenderError::Config(format!(
                "point_radius must be positive and finite, got {}",
                self.point_radius
            )));
        }
        if self.arc_segments < 3 {
            return Err(RenderError::Config(format!(
                "arc_segments must be at least 3, got {}",
                self.arc_segments
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert!((config.display_scale - 1.2).abs() < f64::EPSILON);
        assert!((config.point_radius - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.field_color, Color::BLACK);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_and_defaults() {
        let config =
            RenderConfig::from_json(r##"{"point_radius": 2.5, "population_color": "#02ab83"}"##)
                .unwrap();
        assert!((config.point_radius - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.population_color.to_hex(), "#02ab83");
        assert!((config.display_scale - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn species_color_replaces_population_color_only() {
        for species in [Species::Plant, Species::Herbivore, Species::Carnivore] {
            let config = RenderConfig::default().with_species_color(species).unwrap();
            assert_eq!(config.population_color.to_hex(), species.color());
            assert_eq!(config.field_color, Color::BLACK);
        }
    }

    #[test]
    fn json_rejects_bad_color() {
        let err = RenderConfig::from_json(r#"{"field_color": "black"}"#).unwrap_err();
        assert!(matches!(err, RenderError::Config(_)), "got {err:?}");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let bad = [
            RenderConfig {
                display_scale: 0.0,
                ..Default::default()
            },
            RenderConfig {
                point_radius: f64::NAN,
                ..Default::default()
            },
            RenderConfig {
                arc_segments: 2,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be invalid");
        }
    }
}
