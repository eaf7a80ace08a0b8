//! Fixtures shared by the unit and HTTP tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use sqlx::SqlitePool;

use crate::{storage::StoragePaths, Application, Config};

/// An RGB image with enough variation that every filter visibly changes it.
pub fn textured_image(width: u32, height: u32) -> DynamicImage {
    let buffer = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 7 + y * 3) % 256) as u8,
            ((x * x + y * 11) % 256) as u8,
            (((x ^ y) * 5) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(buffer)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    textured_image(width, height)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes.into_inner()
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).expect("Failed to create fixture directory");
    let path = dir.join(name);
    textured_image(width, height).save(&path).expect("Failed to write PNG");
    path
}

/// Write a PDF with one page per entry of `pages`, each showing that text in Courier. An empty
/// entry gives a page without any text. Resources and MediaBox live on the page tree node so the
/// pages inherit them.
pub fn write_pdf(path: &Path, pages: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("Failed to encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    doc.save(path).expect("Failed to write PDF");
    path.to_path_buf()
}

/// Configuration with storage and OCR models under `root`.
pub fn create_test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.images_dir = root.join("uploaded_images");
    config.storage.pdf_output_dir = root.join("processed_pdfs");
    config.ocr.model_dir = Some(root.join("models"));
    config
}

/// Test server over the full router, plus the storage layout it writes to.
pub async fn create_test_app(pool: SqlitePool, root: &Path) -> (axum_test::TestServer, StoragePaths) {
    let config = create_test_config(root);
    let storage = config.storage_paths();
    let app = Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");
    (app.into_test_server(), storage)
}
