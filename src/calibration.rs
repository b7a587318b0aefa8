//! Stylus calibration profile
//!
//! One digitizer area per screen orientation, persisted as JSON. An
//! orientation without a stored area falls back to the digitizer's
//! default area.

use crate::state::Orientation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stylus input area bounds in digitizer units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StylusArea {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl StylusArea {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Find the area in calibrator output.
    ///
    /// Takes the last line mentioning `Area` that is followed by four
    /// integers, e.g. `xsetwacom set "Wacom ..." Area 117 65 27517 15475`.
    pub fn from_calibrator_output(output: &str) -> Option<Self> {
        output.lines().rev().find_map(|line| {
            let tokens: Vec<&str> = line
                .split_whitespace()
                .map(|t| t.trim_matches('"'))
                .collect();
            let start = tokens.iter().position(|t| *t == "Area")? + 1;
            let values: Vec<i32> = tokens
                .get(start..start + 4)?
                .iter()
                .map(|t| t.parse::<i32>())
                .collect::<Result<_, _>>()
                .ok()?;
            Some(Self::new(values[0], values[1], values[2], values[3]))
        })
    }
}

impl fmt::Display for StylusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Calibrated stylus areas keyed by orientation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationProfile {
    pub normal: Option<StylusArea>,
    pub inverted: Option<StylusArea>,
    pub left: Option<StylusArea>,
    pub right: Option<StylusArea>,
}

impl CalibrationProfile {
    pub fn area(&self, orientation: Orientation) -> Option<StylusArea> {
        match orientation {
            Orientation::Normal => self.normal,
            Orientation::Inverted => self.inverted,
            Orientation::Left => self.left,
            Orientation::Right => self.right,
        }
    }

    pub fn set_area(&mut self, orientation: Orientation, area: StylusArea) {
        let slot = match orientation {
            Orientation::Normal => &mut self.normal,
            Orientation::Inverted => &mut self.inverted,
            Orientation::Left => &mut self.left,
            Orientation::Right => &mut self.right,
        };
        *slot = Some(area);
    }
}

/// Calibration profile bound to the file it was loaded from
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: Option<PathBuf>,
    profile: CalibrationProfile,
}

impl CalibrationStore {
    /// Load the profile at `path`; a missing or unreadable file yields an empty profile
    pub fn load(path: &Path) -> Self {
        let profile = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(profile) => {
                    tracing::debug!("Loaded calibration profile from {:?}", path);
                    profile
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid calibration profile {:?}: {}", path, e);
                    CalibrationProfile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CalibrationProfile::default(),
            Err(e) => {
                tracing::warn!("Failed to read calibration profile {:?}: {}", path, e);
                CalibrationProfile::default()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            profile,
        }
    }

    /// A profile that is never written to disk
    pub fn in_memory(profile: CalibrationProfile) -> Self {
        Self {
            path: None,
            profile,
        }
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn area(&self, orientation: Orientation) -> Option<StylusArea> {
        self.profile.area(orientation)
    }

    /// Store an area and persist the profile
    pub fn update(&mut self, orientation: Orientation, area: StylusArea) -> std::io::Result<()> {
        self.profile.set_area(orientation, area);
        self.save()
    }

    fn save(&self) -> std::io::Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.profile)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, contents)?;
        tracing::debug!("Calibration profile saved to {:?}", path);
        Ok(())
    }
}
