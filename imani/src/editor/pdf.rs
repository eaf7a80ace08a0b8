//! PDF page operations.
//!
//! Structural work (split, merge, text extraction) is done with `lopdf`. Rasterising pages needs a
//! real renderer, which is pdfium bound at runtime through `pdfium-render`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use image::ImageFormat;
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::errors::{EditError, Result};
use super::text;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page trees deeper than this are treated as malformed.
const MAX_PAGE_TREE_DEPTH: usize = 64;

pub const DEFAULT_RENDER_DPI: u32 = 200;

/// How pages are rasterised.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    /// Directory containing the pdfium shared library. The system library is used when unset.
    pub library_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_RENDER_DPI,
            library_dir: None,
        }
    }
}

impl RenderSettings {
    fn bind(&self, path: &Path) -> Result<Pdfium> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library()),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| EditError::Render {
            path: path.to_path_buf(),
            detail: format!("failed to bind to the pdfium library: {e:?}"),
        })?;

        Ok(Pdfium::new(bindings))
    }
}

/// Split a list of paths where each entry may itself hold several comma separated paths.
/// Entries are trimmed and blanks dropped.
pub fn normalize_paths<S: AsRef<str>>(paths: &[S]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// A PDF on disk. The file is re-read by every operation.
#[derive(Debug, Clone)]
pub struct PdfEditor {
    path: PathBuf,
}

impl PdfEditor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EditError::not_found(path));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn load(&self) -> Result<Document> {
        Document::load(&self.path).map_err(|e| EditError::pdf(&self.path, e))
    }

    /// Render every page to `output_dir/page_{n}.jpg`, numbered from 1.
    #[instrument(skip(self, settings), fields(path = %self.path.display(), dpi = settings.dpi), err)]
    pub fn convert_to_images(&self, output_dir: &Path, settings: &RenderSettings) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;

        let render_error = |detail: String| EditError::Render {
            path: self.path.clone(),
            detail,
        };

        let pdfium = settings.bind(&self.path)?;
        let document = pdfium
            .load_pdf_from_file(&self.path, None)
            .map_err(|e| EditError::pdf(&self.path, format!("{e:?}")))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(settings.dpi as f32 / 72.0);

        let mut written = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| render_error(format!("page {}: {e:?}", index + 1)))?;
            let rendered = bitmap.as_image().to_rgb8();

            let target = output_dir.join(format!("page_{}.jpg", index + 1));
            rendered
                .save_with_format(&target, ImageFormat::Jpeg)
                .map_err(|e| render_error(format!("page {}: {e}", index + 1)))?;

            debug!(page = index + 1, width = rendered.width(), height = rendered.height(), "Page rendered");
            written.push(target);
        }

        info!(pages = written.len(), "PDF converted to images");
        Ok(written)
    }

    /// Write every page as its own single-page document `output_dir/page_{n}.pdf`.
    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    pub fn split_pages(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;

        let document = self.load()?;
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

        let mut written = Vec::with_capacity(page_numbers.len());
        for (index, keep) in page_numbers.iter().enumerate() {
            let others: Vec<u32> = page_numbers.iter().copied().filter(|n| n != keep).collect();

            let mut single = document.clone();
            single.delete_pages(&others);
            single.prune_objects();
            single.renumber_objects();
            single.compress();

            let target = output_dir.join(format!("page_{}.pdf", index + 1));
            single.save(&target).map_err(|e| EditError::pdf(&target, e))?;
            written.push(target);
        }

        info!(pages = written.len(), "PDF split into pages");
        Ok(written)
    }

    /// Concatenate the pages of `paths`, in order, into a new document at `output_path`.
    ///
    /// Every input must exist before anything is written.
    #[instrument(skip(paths), fields(output = %output_path.display()), err)]
    pub fn merge_pdfs<S: AsRef<str>>(paths: &[S], output_path: &Path) -> Result<usize> {
        let paths = normalize_paths(paths);
        if paths.is_empty() {
            return Err(EditError::invalid("No PDF paths provided to merge."));
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(EditError::not_found(missing));
        }

        let mut max_id = 1;
        let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        for path in &paths {
            let mut document = Document::load(path).map_err(|e| EditError::pdf(path, e))?;
            document.renumber_objects_with(max_id);
            max_id = document.max_id + 1;

            for page_id in document.get_pages().into_values() {
                let mut page = document
                    .get_dictionary(page_id)
                    .map_err(|e| EditError::pdf(path, e))?
                    .clone();
                for key in INHERITABLE_ATTRIBUTES {
                    if !page.has(key) {
                        if let Some(value) = inherited_attribute(&document, page_id, key) {
                            page.set(key, value);
                        }
                    }
                }
                pages.push((page_id, page));
            }
            objects.extend(document.objects);
        }

        let mut merged = Document::with_version("1.5");
        let mut catalog: Option<(ObjectId, Dictionary)> = None;
        let mut page_tree: Option<(ObjectId, Dictionary)> = None;

        for (object_id, object) in objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" => {
                    if catalog.is_none() {
                        if let Ok(dict) = object.as_dict() {
                            catalog = Some((object_id, dict.clone()));
                        }
                    }
                }
                b"Pages" => {
                    if page_tree.is_none() {
                        if let Ok(dict) = object.as_dict() {
                            page_tree = Some((object_id, dict.clone()));
                        }
                    }
                }
                // Pages are re-inserted below, outlines would point at stale destinations
                b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }

        let (Some((catalog_id, mut catalog)), Some((page_tree_id, mut page_tree))) = (catalog, page_tree) else {
            return Err(EditError::pdf(output_path, "inputs have no document catalog or page tree"));
        };

        let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
        let page_count = pages.len();
        for (page_id, mut page) in pages {
            page.set("Parent", Object::Reference(page_tree_id));
            merged.objects.insert(page_id, Object::Dictionary(page));
        }

        page_tree.remove(b"Parent");
        page_tree.set("Kids", Object::Array(kids));
        page_tree.set("Count", Object::Integer(page_count as i64));
        merged.objects.insert(page_tree_id, Object::Dictionary(page_tree));

        catalog.set("Pages", Object::Reference(page_tree_id));
        catalog.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(catalog));

        merged.trailer.set("Root", Object::Reference(catalog_id));
        merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
        merged.renumber_objects();
        merged.compress();

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        merged.save(output_path).map_err(|e| EditError::pdf(output_path, e))?;

        info!(inputs = paths.len(), pages = page_count, "PDFs merged");
        Ok(page_count)
    }

    /// Text of every page in order, whitespace collapsed, one line per non-empty page.
    ///
    /// A page whose text cannot be decoded contributes nothing.
    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    pub fn extract_text(&self) -> Result<String> {
        let document = self.load()?;

        let pages = document.get_pages().into_keys().map(|number| match document.extract_text(&[number]) {
            Ok(raw) => text::normalize(&raw),
            Err(e) => {
                warn!(page = number, error = %e, "Could not extract text from page");
                String::new()
            }
        });

        Ok(text::join_lines(pages))
    }
}

/// Walk up the page tree from `page_id` looking for `key`.
fn inherited_attribute(document: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = document.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
    }
    None
}
