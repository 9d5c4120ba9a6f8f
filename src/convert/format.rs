// src/convert/format.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::model::FormatConfig;

/// A named file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub name: String,
    /// Extension without the leading dot.
    pub extension: String,
    /// Whether the display layer can load files of this format directly.
    pub loadable: bool,
}

impl From<&FormatConfig> for Format {
    fn from(cfg: &FormatConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            extension: cfg.extension.clone(),
            loadable: cfg.loadable,
        }
    }
}

/// Ordered registry of known formats.
///
/// Order matters: it breaks ties when several loadable formats are equally
/// close in the conversion graph.
#[derive(Debug, Clone, Default)]
pub struct Formats {
    formats: Vec<Format>,
}

/// Leading bytes identifying a format, checked in order.
const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF", "pdf"),
    (b"\xC5\xD0\xD3\xC6", "eps"),
    (b"\x89PNG\r\n\x1a\n", "png"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"\xFF\xD8\xFF", "jpg"),
    (b"BM", "bmp"),
    (b"II*\0", "tiff"),
    (b"MM\0*", "tiff"),
];

const SNIFF_LEN: usize = 512;

impl Formats {
    pub fn new(formats: Vec<Format>) -> Self {
        Self { formats }
    }

    pub fn from_config(cfg: &[FormatConfig]) -> Self {
        Self::new(cfg.iter().map(Format::from).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.name == name)
    }

    /// Look a format up by file extension (case-insensitive).
    pub fn by_extension(&self, ext: &str) -> Option<&Format> {
        let find = |ext: &str| {
            self.formats
                .iter()
                .find(|f| f.extension.eq_ignore_ascii_case(ext))
        };
        let alias = match ext.to_ascii_lowercase().as_str() {
            "jpeg" => "jpg",
            "jpg" => "jpeg",
            "tiff" => "tif",
            "tif" => "tiff",
            _ => return find(ext),
        };
        find(ext).or_else(|| find(alias))
    }

    pub fn extension(&self, name: &str) -> Option<&str> {
        self.get(name).map(|f| f.extension.as_str())
    }

    pub fn is_loadable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|f| f.loadable)
    }

    /// Loadable formats in registry order.
    pub fn loadable(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().filter(|f| f.loadable)
    }

    /// Determine the format of `path`: content first, then extension.
    ///
    /// Only formats present in the registry are returned.
    pub fn sniff(&self, path: &Path) -> Option<&Format> {
        if let Some(name) = read_head(path).and_then(|head| sniff_bytes(&head)) {
            if let Some(fmt) = self.get(name) {
                return Some(fmt);
            }
        }

        let ext = path.extension()?.to_str()?;
        self.by_extension(ext)
    }
}

/// Whether `path` starts with the gzip magic `1f 8b`.
pub fn is_gzipped(path: &Path) -> bool {
    read_head(path).is_some_and(|head| head.starts_with(&[0x1f, 0x8b]))
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    Some(head)
}

fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(b"%!") {
        let first_line = head.split(|b| *b == b'\n').next().unwrap_or(head);
        let is_eps = first_line.windows(4).any(|w| w == b"EPSF");
        return Some(if is_eps { "eps" } else { "ps" });
    }

    if let Some((_, name)) = MAGIC.iter().find(|(magic, _)| head.starts_with(magic)) {
        return Some(name);
    }

    // Netpbm: P1..P6 followed by whitespace.
    if head.len() >= 3 && head[0] == b'P' && head[2].is_ascii_whitespace() {
        match head[1] {
            b'1' | b'4' => return Some("pbm"),
            b'2' | b'5' => return Some("pgm"),
            b'3' | b'6' => return Some("ppm"),
            _ => {}
        }
    }

    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg")) {
        return Some("svg");
    }

    None
}
