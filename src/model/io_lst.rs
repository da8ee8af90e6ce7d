//! Reader and writer for `.lst` label files.
//!
//! A list file holds one image per line:
//!
//! ```text
//! <image name><TAB><annotation><TAB><annotation>...
//! ```
//!
//! A line starting with `#` is a header carrying the base URL the image
//! names are relative to; it is not an image. Blank lines are skipped.
//! Reading applies the minimum size rules to every
//! image, so a file round-tripped through this module never carries
//! annotations too small to be useful.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::attribute::Schemas;
use super::rect::Rect;
use super::tree::AnnotationTree;
use super::Absolute;
use crate::error::FacelabelError;

/// Image file extensions looked at when scanning an image directory.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// One non-blank line of a list file, split but not yet parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// 1-based line number.
    pub line: usize,
    pub image: &'a str,
    /// Everything after the image name, still tab-separated.
    pub annotations: &'a str,
}

/// Splits list-file text into its image lines, skipping blank and header lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = RawLine<'_>> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() || raw.starts_with('#') {
            return None;
        }
        let (image, annotations) = raw.split_once('\t').unwrap_or((raw, ""));
        Some(RawLine {
            line: i + 1,
            image: image.trim(),
            annotations,
        })
    })
}

/// The base URL from the `#` header lines; the last one wins.
pub fn header_base_url(text: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix('#'))
        .last()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Labels of one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub image: String,
    pub annotations: AnnotationTree,
}

impl ListEntry {
    pub fn new(image: impl Into<String>, annotations: AnnotationTree) -> Self {
        Self {
            image: image.into(),
            annotations,
        }
    }

    /// The entry as one list-file line, without the newline.
    pub fn to_line(&self) -> String {
        if self.annotations.is_empty() {
            self.image.clone()
        } else {
            format!("{}\t{}", self.image, self.annotations)
        }
    }
}

/// Every image of a list file, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListFile {
    /// Base URL from the `#` header, written back as the first line.
    pub base_url: Option<String>,
    pub entries: Vec<ListEntry>,
}

impl ListFile {
    /// Finds an entry by image name.
    pub fn get(&self, image: &str) -> Option<&ListEntry> {
        self.entries.iter().find(|e| e.image == image)
    }

    /// Number of annotations over all images, nested ones included.
    pub fn total_annotations(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.annotations.total_annotations())
            .sum()
    }
}

/// Parses list-file text. `path` is only used in error messages.
pub fn parse_lst(text: &str, path: &Path, schemas: &Arc<Schemas>) -> Result<ListFile, FacelabelError> {
    let mut entries = Vec::new();
    for raw in split_lines(text) {
        let mut annotations = AnnotationTree::parse_line_with(raw.annotations, Arc::clone(schemas))
            .map_err(|source| FacelabelError::ListParse {
                path: path.to_path_buf(),
                line: raw.line,
                source: Box::new(source),
            })?;
        let removed = annotations.remove_too_small();
        if !removed.is_empty() {
            log::debug!(
                "{}:{}: dropped {} undersized annotation(s) on '{}'",
                path.display(),
                raw.line,
                removed.len(),
                raw.image
            );
        }
        entries.push(ListEntry::new(raw.image, annotations));
    }
    Ok(ListFile {
        base_url: header_base_url(text),
        entries,
    })
}

#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_list_line(input: &str) -> Result<(), FacelabelError> {
    let list = parse_lst(input, Path::new("<fuzz>"), &Schemas::builtin())?;
    let _ = to_lst_string(&list);
    Ok(())
}

/// Parses list-file text with the built-in schemas.
pub fn from_lst_str(text: &str) -> Result<ListFile, FacelabelError> {
    parse_lst(text, Path::new("<string>"), &Schemas::builtin())
}

/// Reads and parses a list file.
pub fn read_lst(path: &Path, schemas: &Arc<Schemas>) -> Result<ListFile, FacelabelError> {
    let text = fs::read_to_string(path).map_err(FacelabelError::Io)?;
    let list = parse_lst(&text, path, schemas)?;
    log::debug!(
        "read {} image(s) and {} annotation(s) from {}",
        list.entries.len(),
        list.total_annotations(),
        path.display()
    );
    Ok(list)
}

/// Serializes a list file, one line per entry.
pub fn to_lst_string(list: &ListFile) -> String {
    let mut out = String::new();
    if let Some(url) = &list.base_url {
        out.push('#');
        out.push_str(url);
        out.push('\n');
    }
    for entry in &list.entries {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out
}

/// Writes a list file.
pub fn write_lst(path: &Path, list: &ListFile) -> Result<(), FacelabelError> {
    fs::write(path, to_lst_string(list)).map_err(FacelabelError::Io)
}

/// Image sizes found under a directory, keyed by both the path relative to
/// the directory (with `/` separators) and the bare file name.
#[derive(Clone, Debug, Default)]
pub struct ImageSizes {
    sizes: HashMap<String, (u32, u32)>,
}

impl ImageSizes {
    /// Scans `dir` recursively for images and reads their headers.
    pub fn scan(dir: &Path) -> Result<Self, FacelabelError> {
        let mut sizes = HashMap::new();
        for path in collect_images(dir)? {
            let size = read_image_dimensions(&path)?;
            let rel = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                sizes.entry(name.to_string()).or_insert(size);
            }
            sizes.insert(rel, size);
        }
        log::debug!("read {} image size(s) under {}", sizes.len(), dir.display());
        Ok(Self { sizes })
    }

    pub fn insert(&mut self, image: impl Into<String>, size: (u32, u32)) {
        self.sizes.insert(image.into(), size);
    }

    /// Size of `image`, matched by full name first and file name second.
    pub fn get(&self, image: &str) -> Option<(u32, u32)> {
        self.sizes.get(image).copied().or_else(|| {
            Path::new(image)
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.sizes.get(n).copied())
        })
    }

    /// The image frame, `(0, 0, width, height)`.
    pub fn frame(&self, image: &str) -> Option<Rect<Absolute>> {
        self.get(image)
            .map(|(w, h)| Rect::new(0.0, 0.0, f64::from(w), f64::from(h)))
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// `path` itself if it is a file, otherwise every `.lst` file under it.
pub fn collect_list_files(path: &Path) -> Result<Vec<PathBuf>, FacelabelError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| FacelabelError::Io(e.into()))?;
        let is_list = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("lst"));
        if entry.file_type().is_file() && is_list {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

fn collect_images(root: &Path) -> Result<Vec<PathBuf>, FacelabelError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| FacelabelError::ImageDimensionRead {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Reads the width and height from an image header.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), FacelabelError> {
    let size = imagesize::size(path).map_err(|source| FacelabelError::ImageDimensionRead {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| FacelabelError::ImageDimensionRead {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| FacelabelError::ImageDimensionRead {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;
    Ok((width, height))
}
