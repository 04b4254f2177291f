use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::GrayImage;

use crate::error::{Error, Result};
use crate::haralick::{haralick, HARALICK_LEN};
use crate::lbp::lbp;
use crate::params::Params;
use crate::preprocess::{load_grayscale, Preprocessor};
use crate::regions::{area_fractions, spatial_features, AREA_LEN, SPATIAL_LEN};
use crate::segment::PhaseSegmenter;

/// Named feature groups, in the order they appear in a row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FeatureBlock {
    Area,
    Spatial,
    Haralick,
    Lbp,
}

impl FeatureBlock {
    pub const ALL: [FeatureBlock; 4] = [
        FeatureBlock::Area,
        FeatureBlock::Spatial,
        FeatureBlock::Haralick,
        FeatureBlock::Lbp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureBlock::Area => "area",
            FeatureBlock::Spatial => "spatial",
            FeatureBlock::Haralick => "haralick",
            FeatureBlock::Lbp => "lbp",
        }
    }

    pub fn len(&self, params: &Params) -> usize {
        match self {
            FeatureBlock::Area => AREA_LEN,
            FeatureBlock::Spatial => SPATIAL_LEN,
            FeatureBlock::Haralick => HARALICK_LEN,
            FeatureBlock::Lbp => params.lbp_len(),
        }
    }
}

impl fmt::Display for FeatureBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<FeatureBlock> {
        FeatureBlock::ALL
            .iter()
            .copied()
            .find(|b| b.name() == s.trim())
            .ok_or_else(|| Error::InvalidParameter(format!("unknown feature name: {}", s)))
    }
}

/// Which blocks go into a row. Row order is always area, spatial, haralick,
/// lbp, whatever order the blocks were enabled in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockSelection {
    enabled: [bool; 4],
}

impl BlockSelection {
    pub fn all() -> BlockSelection {
        BlockSelection { enabled: [true; 4] }
    }

    pub fn none() -> BlockSelection {
        BlockSelection { enabled: [false; 4] }
    }

    pub fn with(mut self, block: FeatureBlock) -> BlockSelection {
        self.enabled[block as usize] = true;
        self
    }

    pub fn contains(&self, block: FeatureBlock) -> bool {
        self.enabled[block as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.enabled.iter().any(|&e| e)
    }

    pub fn blocks(&self) -> impl Iterator<Item = FeatureBlock> + '_ {
        FeatureBlock::ALL.iter().copied().filter(move |b| self.contains(*b))
    }

    /// Row width for these parameters.
    pub fn width(&self, params: &Params) -> usize {
        self.blocks().map(|b| b.len(params)).sum()
    }

    /// `area_0`, ..., `lbp_{P+1}` for the enabled blocks.
    pub fn column_names(&self, params: &Params) -> Vec<String> {
        self.blocks()
            .flat_map(|b| (0..b.len(params)).map(move |i| format!("{}_{}", b.name(), i)))
            .collect()
    }

    /// `1`/`0` per block, e.g. `1011` for everything but spatial.
    pub fn flags(&self) -> String {
        self.enabled.iter().map(|&e| if e { '1' } else { '0' }).collect()
    }
}

impl FromStr for BlockSelection {
    type Err = Error;

    /// Comma separated block names, e.g. `area,lbp`.
    fn from_str(s: &str) -> Result<BlockSelection> {
        s.split(',')
            .filter(|name| !name.trim().is_empty())
            .try_fold(BlockSelection::none(), |sel, name| -> Result<BlockSelection> {
                Ok(sel.with(name.parse()?))
            })
    }
}

/// Feature values of one image, labelled by the image's file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub filename: String,
    pub values: Vec<f64>,
}

/// Single-image pipeline: crop, then segmentation blocks from the denoised
/// image and texture blocks from the cropped one.
pub struct FeatureExtractor {
    params: Params,
    selection: BlockSelection,
    preprocessor: Preprocessor,
    segmenter: PhaseSegmenter,
}

impl FeatureExtractor {
    pub fn new(params: Params, selection: BlockSelection) -> Result<FeatureExtractor> {
        if selection.is_empty() {
            return Err(Error::EmptySelection);
        }
        params.validate()?;
        let segmenter = PhaseSegmenter::from_params(&params)?;
        Ok(FeatureExtractor {
            preprocessor: Preprocessor::new(params.size_policy),
            params,
            selection,
            segmenter,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn selection(&self) -> BlockSelection {
        self.selection
    }

    pub fn width(&self) -> usize {
        self.selection.width(&self.params)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.selection.column_names(&self.params)
    }

    pub fn assemble(&self, img: &GrayImage) -> Result<Vec<f64>> {
        let cropped = self.preprocessor.crop(img)?;
        let mut row = Vec::with_capacity(self.width());

        if self.selection.contains(FeatureBlock::Area) || self.selection.contains(FeatureBlock::Spatial) {
            let denoised = self.preprocessor.denoise(&cropped, &self.params.bilateral);
            let segmentation = self.segmenter.segment(&denoised);
            if self.selection.contains(FeatureBlock::Area) {
                row.extend_from_slice(&area_fractions(&segmentation.mask_a, &segmentation.mask_b));
            }
            if self.selection.contains(FeatureBlock::Spatial) {
                row.extend_from_slice(&spatial_features(&segmentation));
            }
        }
        if self.selection.contains(FeatureBlock::Haralick) {
            row.extend_from_slice(&haralick(&cropped, self.params.distance));
        }
        if self.selection.contains(FeatureBlock::Lbp) {
            row.extend(lbp(
                &cropped,
                self.params.lbp_points,
                self.params.lbp_radius,
                self.params.lbp_method,
            ));
        }

        debug_assert_eq!(row.len(), self.width());
        Ok(row)
    }

    pub fn extract_file(&self, path: &Path) -> Result<FeatureRow> {
        let img = load_grayscale(path)?;
        let values = self.assemble(&img)?;
        Ok(FeatureRow {
            filename: base_name(path),
            values,
        })
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn widths_and_names() {
        let params = Params::default();
        let sel = BlockSelection::all();
        assert_eq!(sel.width(&params), 3 + 14 + 13 + 12);
        let names = sel.column_names(&params);
        assert_eq!(names.len(), 42);
        assert_eq!(names[0], "area_0");
        assert_eq!(names[3], "spatial_0");
        assert_eq!(names[17], "haralick_0");
        assert_eq!(names[41], "lbp_11");
    }

    #[test]
    fn lbp_width_follows_points() {
        let mut params = Params::default();
        params.lbp_points = 8;
        assert_eq!(BlockSelection::none().with(FeatureBlock::Lbp).width(&params), 10);
    }

    #[test]
    fn parse_selection_keeps_canonical_order() {
        let sel: BlockSelection = "lbp, area".parse().unwrap();
        let blocks: Vec<_> = sel.blocks().collect();
        assert_eq!(blocks, vec![FeatureBlock::Area, FeatureBlock::Lbp]);
        assert_eq!(sel.flags(), "1001");
        assert!("area,colour".parse::<BlockSelection>().is_err());
    }

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(
            FeatureExtractor::new(Params::default(), BlockSelection::none()),
            Err(Error::EmptySelection)
        ));
    }

    #[test]
    fn disabled_blocks_are_omitted() {
        let img = GrayImage::from_fn(48, 48, |x, y| Luma([((x * 5 + y * 3) % 200) as u8 + 20]));
        let sel = BlockSelection::none().with(FeatureBlock::Haralick).with(FeatureBlock::Lbp);
        let extractor = FeatureExtractor::new(Params::default(), sel).unwrap();
        let row = extractor.assemble(&img).unwrap();
        assert_eq!(row.len(), 25);
        assert_eq!(&row[..13], &haralick(&img, 1)[..]);
    }

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name(Path::new("/data/run1/img 002.tif")), "img 002.tif");
    }
}
