use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::morphology::StructuringElement;
use crate::preprocess::bilateral_radius;

/// Largest bilateral neighbourhood radius accepted, a 101 pixel diameter.
pub const MAX_BILATERAL_RADIUS: i64 = 50;

/// What `Preprocessor::crop` does with an image whose size matches no rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    Passthrough,
    Fail,
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::Passthrough
    }
}

/// How per-pixel LBP patterns are turned into histogram codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LbpMethod {
    /// Rotation invariant uniform codes in `0..=P + 1`.
    Uniform,
    /// Raw `sum(bit_i << i)` codes; only codes below `P + 2` are counted.
    Default,
}

impl Default for LbpMethod {
    fn default() -> Self {
        LbpMethod::Uniform
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilateralParams {
    pub d: i32,
    pub sigma_color: f64,
    pub sigma_space: f64,
}

impl Default for BilateralParams {
    fn default() -> Self {
        BilateralParams {
            d: 15,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

/// Numeric configuration of the whole pipeline.
///
/// `kernels` holds the structuring element sizes in pipeline order: closing
/// and opening of the compact phase, then opening and closing of the diffuse
/// phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub distance: u32,
    pub lbp_points: u32,
    pub lbp_radius: f64,
    pub lbp_method: LbpMethod,
    pub bilateral: BilateralParams,
    pub kernels: [u32; 4],
    pub size_policy: SizePolicy,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            distance: 1,
            lbp_points: 10,
            lbp_radius: 5.0,
            lbp_method: LbpMethod::default(),
            bilateral: BilateralParams::default(),
            kernels: [9, 9, 9, 3],
            size_policy: SizePolicy::default(),
        }
    }
}

impl Params {
    /// Loads parameters from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Params> {
        let config_err = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };
        let data = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let params: Params = serde_json::from_str(&data).map_err(|e| config_err(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.distance == 0 {
            return Err(Error::InvalidParameter(
                "distance must be at least 1".to_string(),
            ));
        }
        if self.lbp_points == 0 {
            return Err(Error::InvalidParameter(
                "P must be at least 1".to_string(),
            ));
        }
        if self.lbp_method == LbpMethod::Default && self.lbp_points > 31 {
            return Err(Error::InvalidParameter(format!(
                "P = {} does not fit a raw LBP code",
                self.lbp_points
            )));
        }
        if !(self.lbp_radius > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "R must be positive, got {}",
                self.lbp_radius
            )));
        }
        let radius = bilateral_radius(self.bilateral.d, self.bilateral.sigma_space);
        if radius > MAX_BILATERAL_RADIUS {
            return Err(Error::InvalidParameter(format!(
                "bilateral radius {} (d = {}, sigma_space = {}) exceeds {}",
                radius, self.bilateral.d, self.bilateral.sigma_space, MAX_BILATERAL_RADIUS
            )));
        }
        for &size in &self.kernels {
            StructuringElement::square(size)?;
        }
        Ok(())
    }

    /// Length of the LBP block, `P + 2`.
    pub fn lbp_len(&self) -> usize {
        self.lbp_points as usize + 2
    }
}
