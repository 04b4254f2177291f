use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};
use wasm_bindgen::prelude::*;

pub mod batch;
pub mod error;
pub mod export;
pub mod features;
pub mod haralick;
pub mod kmeans;
pub mod lbp;
pub mod mask;
pub mod morphology;
pub mod params;
pub mod preprocess;
pub mod regions;
pub mod segment;

pub use batch::{discover_images, BatchExtractor, BatchReport, CancelToken, Failure, FeatureMatrix};
pub use error::Error;
pub use export::{default_output_name, save_csv, write_csv};
pub use features::{BlockSelection, FeatureBlock, FeatureExtractor, FeatureRow};
pub use mask::Mask;
pub use params::{BilateralParams, LbpMethod, Params, SizePolicy};
pub use preprocess::{load_grayscale, Preprocessor};
pub use segment::{render_overlay, segment_file, PhaseSegmenter, Segmentation};

fn js_error<E: ToString>(e: E) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

fn parse_params(json: &str) -> Result<Params, JsValue> {
    if json.trim().is_empty() {
        return Ok(Params::default());
    }
    let params: Params = serde_json::from_str(json).map_err(js_error)?;
    params.validate().map_err(js_error)?;
    Ok(params)
}

/// Browser handle on one decoded micrograph.
#[wasm_bindgen]
pub struct WasmExtractor {
    img: GrayImage,
}

#[wasm_bindgen]
impl WasmExtractor {
    #[wasm_bindgen]
    pub fn new(bytes: &[u8]) -> Result<WasmExtractor, JsValue> {
        let img = image::load_from_memory(bytes).map_err(js_error)?.into_luma8();
        let (width, height) = img.dimensions();
        if Preprocessor::crop_height(width, height).is_none() {
            web_sys::console::log_1(&JsValue::from_str(&format!(
                "unrecognised image size {}x{}, no footer is cropped",
                width, height
            )));
        }
        Ok(WasmExtractor { img })
    }

    /// Feature row for comma separated block names (empty for all blocks)
    /// and a JSON parameter object (empty for defaults).
    #[wasm_bindgen]
    pub fn features(&self, blocks: &str, params_json: &str) -> Result<Vec<f64>, JsValue> {
        let selection = if blocks.trim().is_empty() {
            BlockSelection::all()
        } else {
            blocks.parse().map_err(js_error)?
        };
        let extractor = FeatureExtractor::new(parse_params(params_json)?, selection).map_err(js_error)?;
        extractor.assemble(&self.img).map_err(js_error)
    }

    /// Phase overlay encoded as PNG.
    #[wasm_bindgen]
    pub fn segmentation(&self, params_json: &str) -> Result<Vec<u8>, JsValue> {
        let params = parse_params(params_json)?;
        let preprocessor = Preprocessor::new(params.size_policy);
        let segmenter = PhaseSegmenter::from_params(&params).map_err(js_error)?;

        let cropped = preprocessor.crop(&self.img).map_err(js_error)?;
        let denoised = preprocessor.denoise(&cropped, &params.bilateral);
        let res = render_overlay(&segmenter.segment(&denoised));

        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&res, res.width(), res.height(), ExtendedColorType::Rgb8)
            .map_err(js_error)?;
        Ok(out)
    }
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}
