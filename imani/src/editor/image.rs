//! Raster image editing on top of the `image` and `imageproc` crates.
//!
//! Every transformation is a plain function from a borrowed buffer to a new buffer. [`ImageEditor`]
//! only adds the original/edited pair needed to support [`ImageEditor::reset`].
//!
//! Decoding always produces 8-bit RGB, so an edited buffer that has been reset compares equal to a
//! fresh decode of the same source. The `edge` filter is the one operation that yields a
//! single-channel buffer; later operations keep working on it as grayscale.

use std::{fmt, path::Path, str::FromStr};

use image::{imageops::FilterType, DynamicImage, GrayImage, ImageError, ImageReader, Luma, Rgb, RgbImage};
use imageproc::{
    edges::canny,
    filter::{median_filter, separable_filter_equal},
    geometric_transformations::{rotate_about_center, Interpolation},
};
use tracing::{debug, instrument};

use super::errors::{EditError, Result};
use super::ocr::OcrBackend;
use super::text;

/// Side length of the square kernels used by the smoothing filters.
pub const KERNEL_SIZE: usize = 5;

/// Canny hysteresis thresholds used by the `edge` filter.
pub const EDGE_LOW_THRESHOLD: f32 = 100.0;
pub const EDGE_HIGH_THRESHOLD: f32 = 200.0;

/// OCR input size. Aspect ratio is deliberately not preserved here.
pub const OCR_INPUT_SIZE: (u32, u32) = (1024, 1024);

/// The fixed menu of filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Blur,
    Gaussian,
    Median,
    Edge,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [FilterKind::Blur, FilterKind::Gaussian, FilterKind::Median, FilterKind::Edge];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Gaussian => "gaussian",
            FilterKind::Median => "median",
            FilterKind::Edge => "edge",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EditError::invalid("Unsupported filter type. Choose from 'blur', 'gaussian', 'median', 'edge'."))
    }
}

/// Decode the image at `path` into an RGB buffer.
#[instrument(skip_all, fields(path = %path.display()), err)]
pub fn decode(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(EditError::not_found(path));
    }

    let unsupported = |detail: String| EditError::UnsupportedFormat {
        path: path.to_path_buf(),
        detail,
    };

    let decoded = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| unsupported(e.to_string()))?;

    debug!(width = decoded.width(), height = decoded.height(), "Image decoded");
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Resize to `width` x `height`. When one dimension is missing it is derived from the other so
/// that the aspect ratio of `image` is kept, truncating towards zero.
pub fn resize(image: &DynamicImage, width: Option<u32>, height: Option<u32>) -> Result<DynamicImage> {
    let (current_width, current_height) = (image.width() as f64, image.height() as f64);

    let (width, height) = match (width, height) {
        (None, None) => return Err(EditError::invalid("Either width or height must be provided.")),
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => (width, (current_height * (width as f64 / current_width)) as u32),
        (None, Some(height)) => ((current_width * (height as f64 / current_height)) as u32, height),
    };

    if width == 0 || height == 0 {
        return Err(EditError::invalid(format!(
            "Resize to {width}x{height} is not possible: both dimensions must be at least 1 pixel."
        )));
    }

    Ok(image.resize_exact(width, height, FilterType::Triangle))
}

/// Rotate about the image center by `angle` degrees, counter-clockwise for positive angles.
///
/// The canvas keeps its size: corners that leave it are clipped and uncovered areas are black.
pub fn rotate(image: &DynamicImage, angle: f32) -> DynamicImage {
    // imageproc rotates clockwise for positive angles
    let theta = -angle.to_radians();

    map_buffers(
        image,
        |gray| rotate_about_center(gray, theta, Interpolation::Bilinear, Luma([0])),
        |rgb| rotate_about_center(rgb, theta, Interpolation::Bilinear, Rgb([0, 0, 0])),
    )
}

/// Apply one of the fixed filters.
pub fn apply_filter(image: &DynamicImage, kind: FilterKind) -> DynamicImage {
    let radius = (KERNEL_SIZE / 2) as u32;

    match kind {
        FilterKind::Blur => convolve(image, &box_kernel(KERNEL_SIZE)),
        FilterKind::Gaussian => convolve(image, &gaussian_kernel(KERNEL_SIZE)),
        FilterKind::Median => map_buffers(
            image,
            |gray| median_filter(gray, radius, radius),
            |rgb| median_filter(rgb, radius, radius),
        ),
        FilterKind::Edge => DynamicImage::ImageLuma8(canny(&image.to_luma8(), EDGE_LOW_THRESHOLD, EDGE_HIGH_THRESHOLD)),
    }
}

/// Encode `image` to `path`, picking the format from the file extension.
#[instrument(skip(image), fields(path = %path.display()), err)]
pub fn save(image: &DynamicImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| match e {
        ImageError::IoError(io) => EditError::Io(io),
        other => EditError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: other.to_string(),
        },
    })
}

/// Squash the image to the fixed OCR input size.
pub fn prepare_for_ocr(image: &DynamicImage) -> DynamicImage {
    let (width, height) = OCR_INPUT_SIZE;
    image.resize_exact(width, height, FilterType::Triangle)
}

/// One decoded image plus the edits applied to it during a request.
#[derive(Debug, Clone)]
pub struct ImageEditor {
    original: DynamicImage,
    edited: DynamicImage,
}

impl ImageEditor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        decode(path.as_ref()).map(Self::from_image)
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            edited: image.clone(),
            original: image,
        }
    }

    pub fn original(&self) -> &DynamicImage {
        &self.original
    }

    pub fn edited(&self) -> &DynamicImage {
        &self.edited
    }

    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) -> Result<&mut Self> {
        self.edited = resize(&self.edited, width, height)?;
        Ok(self)
    }

    pub fn rotate(&mut self, angle: f32) -> &mut Self {
        self.edited = rotate(&self.edited, angle);
        self
    }

    pub fn apply_filter(&mut self, kind: FilterKind) -> &mut Self {
        self.edited = apply_filter(&self.edited, kind);
        self
    }

    /// Throw away every edit.
    pub fn reset(&mut self) -> &mut Self {
        self.edited = self.original.clone();
        self
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save(&self.edited, path.as_ref())
    }

    /// OCR the *original* image (edits are ignored) and normalise the whitespace of the result.
    #[instrument(skip_all, fields(backend = backend.name()), err)]
    pub fn extract_text(&self, backend: &dyn OcrBackend) -> Result<String> {
        let prepared = prepare_for_ocr(&self.original);
        let raw = backend.recognize(&prepared)?;
        let text = text::normalize(&raw);
        debug!(chars = text.len(), "Text extracted from image");
        Ok(text)
    }
}

/// Run `gray` on single-channel buffers and `rgb` on everything else.
fn map_buffers(
    image: &DynamicImage,
    gray: impl FnOnce(&GrayImage) -> GrayImage,
    rgb: impl FnOnce(&RgbImage) -> RgbImage,
) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(buffer) => DynamicImage::ImageLuma8(gray(buffer)),
        DynamicImage::ImageRgb8(buffer) => DynamicImage::ImageRgb8(rgb(buffer)),
        other => DynamicImage::ImageRgb8(rgb(&other.to_rgb8())),
    }
}

/// Separable convolution with the same 1-D kernel horizontally and vertically.
fn convolve(image: &DynamicImage, kernel: &[f32]) -> DynamicImage {
    map_buffers(
        image,
        |gray| separable_filter_equal(gray, kernel),
        |rgb| separable_filter_equal(rgb, kernel),
    )
}

fn box_kernel(size: usize) -> Vec<f32> {
    vec![1.0 / size as f32; size]
}

/// Normalised 1-D Gaussian with sigma derived from the kernel size.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;

    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();

    weights.into_iter().map(|w| w / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{textured_image, write_png};
    use std::sync::Mutex;

    struct RecordingBackend {
        seen: Mutex<Option<(u32, u32)>>,
        reply: &'static str,
    }

    impl OcrBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<String> {
            *self.seen.lock().unwrap() = Some((image.width(), image.height()));
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn resize_with_width_only_keeps_aspect_ratio() {
        let image = textured_image(200, 100);
        let resized = resize(&image, Some(50), None).unwrap();
        assert_eq!((resized.width(), resized.height()), (50, 25));
    }

    #[test]
    fn resize_with_height_only_keeps_aspect_ratio() {
        let image = textured_image(300, 200);
        let resized = resize(&image, None, Some(50)).unwrap();
        assert_eq!((resized.width(), resized.height()), (75, 50));
    }

    #[test]
    fn resize_derived_dimension_truncates() {
        // 333 * (100 / 200) = 166.5
        let image = textured_image(200, 333);
        let resized = resize(&image, Some(100), None).unwrap();
        assert_eq!((resized.width(), resized.height()), (100, 166));
    }

    #[test]
    fn resize_uses_the_current_edited_buffer() {
        let mut editor = ImageEditor::from_image(textured_image(200, 100));
        editor.resize(Some(100), Some(100)).unwrap();
        editor.resize(Some(40), None).unwrap();
        assert_eq!((editor.edited().width(), editor.edited().height()), (40, 40));
        assert_eq!((editor.original().width(), editor.original().height()), (200, 100));
    }

    #[test]
    fn resize_without_dimensions_is_rejected() {
        let image = textured_image(20, 20);
        let err = resize(&image, None, None).unwrap_err();
        assert!(matches!(err, EditError::InvalidArgument { .. }));
    }

    #[test]
    fn resize_to_zero_is_rejected() {
        let image = textured_image(400, 10);
        assert!(matches!(resize(&image, Some(0), Some(5)), Err(EditError::InvalidArgument { .. })));
        // 10 * (10 / 400) truncates to 0
        assert!(matches!(resize(&image, Some(10), None), Err(EditError::InvalidArgument { .. })));
    }

    #[test]
    fn rotate_keeps_canvas_size_and_clips_corners() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 60, Rgb([255, 255, 255])));
        let rotated = rotate(&white, 45.0);

        assert_eq!((rotated.width(), rotated.height()), (100, 60));
        let rgb = rotated.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(99, 59), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(50, 30), &Rgb([255, 255, 255]));
    }

    #[test]
    fn rotate_is_counter_clockwise_for_positive_angles() {
        // Left half white, right half black. A quarter turn counter-clockwise moves the white half
        // to the bottom.
        let mut square = RgbImage::new(64, 64);
        for (x, _, pixel) in square.enumerate_pixels_mut() {
            *pixel = if x < 32 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) };
        }
        let rotated = rotate(&DynamicImage::ImageRgb8(square), 90.0).to_rgb8();

        assert_eq!(rotated.get_pixel(32, 56), &Rgb([255, 255, 255]));
        assert_eq!(rotated.get_pixel(32, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = "bogus".parse::<FilterKind>().unwrap_err();
        assert!(matches!(err, EditError::InvalidArgument { .. }));
        assert!(err.to_string().contains("blur"));
    }

    #[test]
    fn filter_names_round_trip() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.as_str().parse::<FilterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn every_filter_changes_the_buffer() {
        let image = textured_image(64, 48);
        for kind in FilterKind::ALL {
            let filtered = apply_filter(&image, kind);
            assert_eq!((filtered.width(), filtered.height()), (64, 48), "{kind}");
            assert_ne!(filtered.as_bytes(), image.as_bytes(), "{kind} left the buffer untouched");
        }
    }

    #[test]
    fn edge_filter_yields_single_channel_output() {
        let filtered = apply_filter(&textured_image(32, 32), FilterKind::Edge);
        assert!(matches!(filtered, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn filters_keep_working_on_grayscale_buffers() {
        let edges = apply_filter(&textured_image(32, 32), FilterKind::Edge);
        let blurred = apply_filter(&edges, FilterKind::Blur);
        assert!(matches!(blurred, DynamicImage::ImageLuma8(_)));
        assert!(matches!(rotate(&edges, 30.0), DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn gaussian_kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel(KERNEL_SIZE);
        assert_eq!(kernel.len(), KERNEL_SIZE);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[4]).abs() < 1e-6);
        assert!(kernel[2] > kernel[1] && kernel[1] > kernel[0]);
    }

    #[test]
    fn reset_reproduces_a_fresh_decode() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(dir.path(), "source.png", 80, 60);

        let mut editor = ImageEditor::open(&source).unwrap();
        editor.resize(Some(40), None).unwrap();
        editor.rotate(33.0).apply_filter(FilterKind::Edge).apply_filter(FilterKind::Median);
        editor.reset();

        let after_reset = dir.path().join("after_reset.png");
        let fresh = dir.path().join("fresh.png");
        editor.save(&after_reset).unwrap();
        ImageEditor::open(&source).unwrap().save(&fresh).unwrap();

        assert_eq!(std::fs::read(after_reset).unwrap(), std::fs::read(fresh).unwrap());
    }

    #[test]
    fn decode_missing_file_is_not_found() {
        let err = decode(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, EditError::NotFound { .. }));
    }

    #[test]
    fn decode_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"this is not an image").unwrap();

        let err = decode(&path).unwrap_err();
        assert!(matches!(err, EditError::UnsupportedFormat { .. }));
    }

    #[test]
    fn save_with_unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = save(&textured_image(4, 4), &dir.path().join("out.unknown")).unwrap_err();
        assert!(matches!(err, EditError::UnsupportedFormat { .. }));
    }

    #[test]
    fn extract_text_squashes_the_original_and_normalises() {
        let mut editor = ImageEditor::from_image(textured_image(300, 100));
        editor.resize(Some(30), None).unwrap();

        let backend = RecordingBackend {
            seen: Mutex::new(None),
            reply: "  INVOICE\n\n  total:   42 \n",
        };
        let text = editor.extract_text(&backend).unwrap();

        assert_eq!(text, "INVOICE total: 42");
        assert_eq!(*backend.seen.lock().unwrap(), Some(OCR_INPUT_SIZE));
        assert_eq!((editor.original().width(), editor.original().height()), (300, 100));
    }
}
