#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Create a file with dummy contents, making parent directories as needed
pub fn create_file(path: &Path, contents: &[u8]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = File::create(path).unwrap();
    file.write_all(contents).unwrap();
    path.to_path_buf()
}

/// Build a photo tree under `base/photos`:
///
/// ```text
/// photos/
///   cover.jpg
///   notes.txt
///   lisbon/IMG_20210305_tram.jpeg
///   lisbon/IMG_19650101.png
///   paris/2019/deep_20190501.jpg
/// ```
pub fn create_photo_tree(base: &Path) -> PathBuf {
    let source = base.join("photos");
    create_file(&source.join("cover.jpg"), b"COVER");
    create_file(&source.join("notes.txt"), b"NOT AN IMAGE");
    create_file(&source.join("lisbon").join("IMG_20210305_tram.jpeg"), b"TRAM");
    create_file(&source.join("lisbon").join("IMG_19650101.png"), b"OLD");
    create_file(
        &source.join("paris").join("2019").join("deep_20190501.jpg"),
        b"DEEP",
    );
    source
}

/// Every path under `dir`, relative to it
pub fn tree(dir: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(dir).unwrap().to_path_buf())
        .collect()
}

/// Names of the direct children of `dir`, sorted
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
