#![allow(dead_code)]

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A noisy gradient, so encoders have something to work with.
pub fn sample_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let noise = ((x * 31 + y * 17) % 23) as u8;
        Rgb([
            (x * 255 / width.max(1)) as u8 ^ noise,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

pub fn encode_sample(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    sample_image(width, height)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

pub fn sample_png() -> Vec<u8> {
    encode_sample(64, 48, ImageFormat::Png)
}

pub fn sample_jpeg() -> Vec<u8> {
    encode_sample(64, 48, ImageFormat::Jpeg)
}

/// Writes a real PNG, a real JPEG, a corrupt PNG and a text file into `dir`.
pub fn create_test_image_files(dir: &Path) -> Vec<PathBuf> {
    let files = vec![
        (dir.join("a.png"), sample_png()),
        (dir.join("b.jpg"), sample_jpeg()),
        (dir.join("c.png"), b"definitely not a png".to_vec()),
        (dir.join("notes.txt"), b"not an image".to_vec()),
    ];

    files
        .into_iter()
        .map(|(path, bytes)| {
            fs::write(&path, bytes).unwrap();
            path
        })
        .collect()
}

pub fn create_nested_directory_structure(dir: &Path) -> PathBuf {
    let subdir = dir.join("subdir");
    fs::create_dir(&subdir).unwrap();
    fs::write(subdir.join("nested.png"), sample_png()).unwrap();
    fs::write(subdir.join("nested.txt"), b"nested text").unwrap();
    subdir
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
