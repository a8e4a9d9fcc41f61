//! Loading and running the text recognition model. The model is an
//! opaque ONNX graph supplied at startup; this module feeds it pixels
//! and decodes its CTC output, nothing more.

use crate::config::MODEL_INPUT_HEIGHT;
use anyhow::{anyhow, bail, Context, Result};
use image::GenericImageView;
use ort::session::Session;
use ort::value::Value;
use std::sync::Mutex;
use tracing::info;

/// Text recognition over raw image bytes. An empty string means the
/// model saw no text.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<String>;
}

/// A CTC-style recognition model behind an ONNX Runtime session
pub struct CtcClassifier {
    session: Mutex<Session>,
    input_name: String,
    charset: Vec<String>,
}

impl CtcClassifier {
    /// Load the model and its charset. The charset file holds one
    /// entry per line; line 0 is the CTC blank.
    pub fn new(model_file: &str, charset_file: &str) -> Result<Self> {
        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(model_file)
            .context("failed to load recognition model")?;
        let input_name = session
            .inputs
            .first()
            .ok_or_else(|| anyhow!("recognition model declares no inputs"))?
            .name
            .clone();

        let raw = std::fs::read_to_string(charset_file).context("failed to read charset file")?;
        let charset = parse_charset(&raw)?;

        info!(
            "loaded recognition model {model_file:?} ({} charset entries)",
            charset.len()
        );
        Ok(CtcClassifier {
            session: Mutex::new(session),
            input_name,
            charset,
        })
    }
}

impl Classifier for CtcClassifier {
    fn classify(&self, image: &[u8]) -> Result<String> {
        let (shape, pixels) = preprocess(image)?;
        let input = Value::from_array((shape, pixels))?;

        let (dims, logits) = {
            let mut session = self.session.lock().unwrap();
            let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
            let name = outputs
                .keys()
                .next()
                .ok_or_else(|| anyhow!("recognition model produced no outputs"))?;
            let (shape, data) = outputs[name].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            (dims, data.to_vec())
        };

        // Accept the common CTC output layouts: [S, 1, C], [1, S, C]
        // or [S, C]
        let (steps, classes) = match dims.as_slice() {
            [steps, 1, classes] => (*steps, *classes),
            [1, steps, classes] => (*steps, *classes),
            [steps, classes] => (*steps, *classes),
            other => bail!("unexpected logits shape {other:?}"),
        };
        if logits.len() != steps * classes {
            bail!("logits shape {dims:?} does not match {} values", logits.len());
        }

        Ok(ctc_decode(&self.charset, &logits, steps, classes))
    }
}

/// Decode the image, scale it to the model's input height keeping the
/// aspect ratio, grayscale, and normalize to [-1, 1]. Returns the
/// [1, 1, H, W] tensor shape and the flattened pixels.
fn preprocess(image: &[u8]) -> Result<([usize; 4], Vec<f32>)> {
    let img = image::load_from_memory(image).context("could not decode image bytes")?;
    let (width, height) = img.dimensions();
    let scaled_w =
        ((width as u64 * MODEL_INPUT_HEIGHT as u64) / height.max(1) as u64).max(1) as u32;
    let gray = img
        .resize_exact(
            scaled_w,
            MODEL_INPUT_HEIGHT,
            image::imageops::FilterType::Triangle,
        )
        .to_luma8();

    let (w, h) = (scaled_w as usize, MODEL_INPUT_HEIGHT as usize);
    let mut pixels = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let value = gray.get_pixel(x as u32, y as u32)[0] as f32 / 255.0;
            pixels.push((value - 0.5) / 0.5);
        }
    }
    Ok(([1, 1, h, w], pixels))
}

/// Greedy CTC decode: argmax per timestep, collapse repeats, drop the
/// blank (charset index 0).
fn ctc_decode(charset: &[String], logits: &[f32], steps: usize, classes: usize) -> String {
    let mut text = String::new();
    let mut previous = 0;
    for step in 0..steps {
        let row = &logits[step * classes..(step + 1) * classes];
        let best = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap_or(0);
        if best != 0 && best != previous {
            if let Some(entry) = charset.get(best) {
                text.push_str(entry);
            }
        }
        previous = best;
    }
    text
}

/// One charset entry per line; line 0 is the CTC blank.
fn parse_charset(raw: &str) -> Result<Vec<String>> {
    let entries: Vec<String> = raw.lines().map(|line| line.to_string()).collect();
    if entries.len() < 2 {
        bail!("charset must list the blank plus at least one character");
    }
    Ok(entries)
}
