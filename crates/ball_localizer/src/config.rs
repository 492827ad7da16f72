use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use toml::{Table, Value};

use crate::error::{Error, Result};

/// A configuration that lives in a TOML file relative to a config root.
///
/// Every robot can provide an overlay root containing a file with the same name, any key set in
/// the overlay replaces the value from the main file.
pub trait Config: DeserializeOwned {
    /// Path of the config file, relative to the config root.
    const PATH: &'static str;

    /// Load the configuration from `root`.
    fn load(root: impl AsRef<Path>) -> Result<Self> {
        let table = read_table(&root.as_ref().join(Self::PATH))?;

        Ok(Value::Table(table).try_into()?)
    }

    /// Load the configuration from `root`, with the values in `overlay_root` applied on top.
    ///
    /// A missing overlay file is not an error, the main config is used as is.
    fn load_with_overlay(root: impl AsRef<Path>, overlay_root: impl AsRef<Path>) -> Result<Self> {
        let main = read_table(&root.as_ref().join(Self::PATH))?;

        let overlay_path: PathBuf = overlay_root.as_ref().join(Self::PATH);
        let table = if overlay_path.exists() {
            merge_tables(main, read_table(&overlay_path)?)
        } else {
            main
        };

        Ok(Value::Table(table).try_into()?)
    }

    /// Parse the configuration from a TOML string.
    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

fn read_table(path: &Path) -> Result<Table> {
    Ok(fs::read_to_string(path)?.parse::<Table>()?)
}

/// Merges `overlay` into `main`.
///
/// Nested tables are merged recursively, any other value in the overlay replaces the one in
/// `main`. Keys that only exist in the overlay are ignored.
#[must_use]
pub fn merge_tables(main: Table, mut overlay: Table) -> Table {
    main.into_iter()
        .map(|(key, value)| {
            let merged = match (value, overlay.remove(&key)) {
                (Value::Table(main_table), Some(Value::Table(overlay_table))) => {
                    Value::Table(merge_tables(main_table, overlay_table))
                }
                (_, Some(overlay_value)) => overlay_value,
                (value, None) => value,
            };

            (key, merged)
        })
        .collect()
}

/// Configuration for the ball localizer and the physical world it tracks balls in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
#[serde(deny_unknown_fields)]
pub struct BallLocalizerConfig {
    pub ball_localizer: TrackingConfig,
    pub ball: BallConfig,
    pub field: FieldConfig,
    pub goal: GoalConfig,
}

impl Config for BallLocalizerConfig {
    const PATH: &'static str = "ball_localizer.toml";
}

/// Parameters of the tracking engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingConfig {
    /// Fraction of the speed a ball keeps after bouncing off a wall.
    pub elasticity: f32,
    /// Amount of measurements averaged into the position of a track.
    pub position_averages: NonZeroUsize,
    /// Deceleration applied to extrapolated balls, per axis, in units/s².
    pub drag: f32,
    /// Time in seconds a track survives without a new measurement.
    pub purge_lifetime: f32,
    /// Tracks moving faster than this (units/s) are considered bogus.
    pub max_velocity: f32,
    /// Maximum distance between a detection and a track to be considered the same ball.
    pub max_identity_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BallConfig {
    pub radius: f32,
}

/// Dimensions of the playing field, which is centred on the origin.
///
/// ```markdown
///              <------------- width ------------->
///            ^ .---------------------------------.
///            | |                                 |
///        .---| |                                 |---.
///        | Y | |                 o               | B |
///        .---| |                                 |---.
///     height | |                                 |
///            v .---------------------------------.
/// ```
///
/// `Y` and `B` are the yellow and blue goal, see [`GoalConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Extent of the field along the x axis.
    pub width: f32,
    /// Extent of the field along the y axis.
    pub height: f32,
}

/// Dimensions of the goals, which sit behind the field lines at both ends of the x axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalConfig {
    /// Opening of the goal, along the y axis.
    pub width: f32,
    /// How far the goal extends behind the field line.
    pub depth: f32,
}

impl BallLocalizerConfig {
    /// Loads the config from `root` with an optional robot specific overlay and validates it.
    pub fn load_validated(root: impl AsRef<Path>, overlay_root: Option<&Path>) -> Result<Self> {
        let config = match overlay_root {
            Some(overlay_root) => Self::load_with_overlay(root, overlay_root)?,
            None => Self::load(root)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is in a range the tracker can work with.
    pub fn validate(&self) -> Result<()> {
        let tracking = &self.ball_localizer;

        check(
            "ball_localizer.elasticity",
            (0.0..=1.0).contains(&tracking.elasticity),
            "must be between 0 and 1",
        )?;
        check_non_negative("ball_localizer.drag", tracking.drag)?;
        check_positive("ball_localizer.purge_lifetime", tracking.purge_lifetime)?;
        check_positive("ball_localizer.max_velocity", tracking.max_velocity)?;
        check_non_negative(
            "ball_localizer.max_identity_distance",
            tracking.max_identity_distance,
        )?;
        check_non_negative("ball.radius", self.ball.radius)?;
        check_positive("field.width", self.field.width)?;
        check_positive("field.height", self.field.height)?;
        check(
            "ball.radius",
            2.0 * self.ball.radius < self.field.width.min(self.field.height),
            "the ball must fit on the field",
        )?;
        check_non_negative("goal.width", self.goal.width)?;
        check_non_negative("goal.depth", self.goal.depth)
    }
}

const DEFAULT_POSITION_AVERAGES: NonZeroUsize = NonZeroUsize::new(3).unwrap();

impl Default for BallLocalizerConfig {
    fn default() -> Self {
        Self {
            ball_localizer: TrackingConfig {
                elasticity: 0.3,
                position_averages: DEFAULT_POSITION_AVERAGES,
                drag: 0.2,
                purge_lifetime: 2.0,
                max_velocity: 10.0,
                max_identity_distance: 0.4,
            },
            ball: BallConfig { radius: 0.0215 },
            field: FieldConfig {
                width: 4.5,
                height: 3.0,
            },
            goal: GoalConfig {
                width: 0.7,
                depth: 0.25,
            },
        }
    }
}

fn check(field: &'static str, valid: bool, reason: &'static str) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidConfig { field, reason })
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<()> {
    check(
        field,
        value.is_finite() && value >= 0.0,
        "must be a finite, non-negative number",
    )
}

fn check_positive(field: &'static str, value: f32) -> Result<()> {
    check(
        field,
        value.is_finite() && value > 0.0,
        "must be a finite, positive number",
    )
}

#[cfg(test)]
mod tests {
    use std::{fs, num::NonZeroUsize};

    use tempfile::tempdir;
    use toml::Table;

    use super::*;

    const MAIN: &str = r#"
        [ball_localizer]
        elasticity = 0.5
        position_averages = 4
        drag = 0.3
        purge_lifetime = 1.5
        max_velocity = 6.0
        max_identity_distance = 0.5

        [ball]
        radius = 0.02

        [field]
        width = 4.5
        height = 3.0

        [goal]
        width = 0.7
        depth = 0.25
    "#;

    #[test]
    fn merge_overlay() {
        let main: Table = MAIN.parse().unwrap();
        let overlay: Table = r#"
            unknown = 1

            [ball_localizer]
            drag = 0.8

            [field]
            width = 9.0
        "#
        .parse()
        .unwrap();

        let merged = merge_tables(main, overlay);
        assert!(!merged.contains_key("unknown"));

        let config: BallLocalizerConfig = Value::Table(merged).try_into().unwrap();
        assert_eq!(config.ball_localizer.drag, 0.8);
        assert_eq!(config.ball_localizer.elasticity, 0.5);
        assert_eq!(config.field.width, 9.0);
        assert_eq!(config.field.height, 3.0);
    }

    #[test]
    fn load_with_overlay() {
        let root = tempdir().unwrap();
        let overlay = root.path().join("overlay/robot");
        fs::create_dir_all(&overlay).unwrap();

        fs::write(root.path().join(BallLocalizerConfig::PATH), MAIN).unwrap();
        fs::write(
            overlay.join(BallLocalizerConfig::PATH),
            "[ball_localizer]\nposition_averages = 8\n",
        )
        .unwrap();

        let config = BallLocalizerConfig::load_validated(root.path(), Some(&overlay)).unwrap();
        assert_eq!(
            config.ball_localizer.position_averages,
            NonZeroUsize::new(8).unwrap()
        );
        assert_eq!(config.ball.radius, 0.02);

        // a robot without an overlay file gets the main config
        let config =
            BallLocalizerConfig::load_with_overlay(root.path(), root.path().join("missing"))
                .unwrap();
        assert_eq!(
            config.ball_localizer.position_averages,
            NonZeroUsize::new(4).unwrap()
        );
    }

    #[test]
    fn missing_file() {
        let root = tempdir().unwrap();
        assert!(matches!(
            BallLocalizerConfig::load(root.path()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn reject_zero_window() {
        let contents = MAIN.replace("position_averages = 4", "position_averages = 0");
        assert!(matches!(
            BallLocalizerConfig::from_toml(&contents),
            Err(Error::Deserialize(_))
        ));
    }

    #[test]
    fn reject_unknown_fields() {
        let contents = format!("{MAIN}\n[extra]\nvalue = 1\n");
        assert!(BallLocalizerConfig::from_toml(&contents).is_err());
    }

    #[test]
    fn validate() {
        let config = BallLocalizerConfig::from_toml(MAIN).unwrap();
        assert!(config.validate().is_ok());
        assert!(BallLocalizerConfig::default().validate().is_ok());

        let mut config = BallLocalizerConfig::default();
        config.ball_localizer.elasticity = 1.5;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig {
                field: "ball_localizer.elasticity",
                ..
            })
        ));

        let mut config = BallLocalizerConfig::default();
        config.ball_localizer.purge_lifetime = 0.0;
        assert!(config.validate().is_err());

        let mut config = BallLocalizerConfig::default();
        config.ball_localizer.drag = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = BallLocalizerConfig::default();
        config.ball.radius = 2.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig {
                field: "ball.radius",
                ..
            })
        ));
    }
}
