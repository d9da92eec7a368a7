//! Binary region-set reader and writer.
//!
//! The format is a big-endian stream: an `i32` region count, then for each
//! region a UTF class tag (`u16` byte length followed by UTF-8 bytes) and a
//! tag-specific payload. Payload lengths are implicit, so any unknown tag
//! makes the rest of the stream unreadable.

use std::fs;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::coord::Coord;
use super::region::Region;
use crate::error::SlideSetError;

pub const POINT_TAG: &str = "net.imagej.overlay.PointOverlay";
pub const LINE_TAG: &str = "net.imagej.overlay.LineOverlay";
pub const POLYGON_TAG: &str = "net.imagej.overlay.PolygonOverlay";
pub const PATH_TAG: &str = "net.imagej.overlay.GeneralPathOverlay";
pub const ELLIPSE_TAG: &str = "net.imagej.overlay.EllipseOverlay";
pub const RECTANGLE_TAG: &str = "net.imagej.overlay.RectangleOverlay";

/// Read a binary region-set file.
pub fn read_region_set(path: &Path) -> Result<Vec<Region>, SlideSetError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SlideSetError::DataUnavailable {
            path: path.to_path_buf(),
        },
        _ => SlideSetError::Io(source),
    })?;
    decode(&bytes, path)
}

/// Write a region set to a binary file, creating parent directories.
pub fn write_region_set(path: &Path, regions: &[Region]) -> Result<(), SlideSetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = encode(regions, path)?;
    fs::write(path, bytes).map_err(SlideSetError::Io)
}

/// Decode a region set from bytes.
pub fn from_region_set_slice(bytes: &[u8]) -> Result<Vec<Region>, SlideSetError> {
    decode(bytes, Path::new("<bytes>"))
}

/// Encode a region set to bytes.
pub fn to_region_set_bytes(regions: &[Region]) -> Result<Vec<u8>, SlideSetError> {
    encode(regions, Path::new("<bytes>"))
}

struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
    path: &'a Path,
}

impl Decoder<'_> {
    fn error(&self, message: impl Into<String>) -> SlideSetError {
        SlideSetError::RegionSetFormat {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn io(&self, source: std::io::Error) -> SlideSetError {
        match source.kind() {
            ErrorKind::UnexpectedEof => self.error(format!(
                "stream truncated at byte {}",
                self.cursor.position()
            )),
            _ => self.error(source.to_string()),
        }
    }

    fn count(&mut self, what: &str) -> Result<usize, SlideSetError> {
        let n = self
            .cursor
            .read_i32::<BigEndian>()
            .map_err(|e| self.io(e))?;
        usize::try_from(n).map_err(|_| self.error(format!("negative {what} count {n}")))
    }

    fn f64(&mut self) -> Result<f64, SlideSetError> {
        self.cursor.read_f64::<BigEndian>().map_err(|e| self.io(e))
    }

    fn f64s(&mut self, n: usize) -> Result<Vec<f64>, SlideSetError> {
        (0..n).map(|_| self.f64()).collect()
    }

    fn coords(&mut self, n: usize) -> Result<Vec<Coord>, SlideSetError> {
        (0..n)
            .map(|_| Ok(Coord::new(self.f64()?, self.f64()?)))
            .collect()
    }

    fn utf(&mut self) -> Result<String, SlideSetError> {
        let len = self
            .cursor
            .read_u16::<BigEndian>()
            .map_err(|e| self.io(e))?;
        let mut buf = vec![0u8; usize::from(len)];
        self.cursor.read_exact(&mut buf).map_err(|e| self.io(e))?;
        String::from_utf8(buf).map_err(|_| self.error("class tag is not valid UTF-8"))
    }

    fn region(&mut self) -> Result<Region, SlideSetError> {
        let tag = self.utf()?;
        let region = match tag.as_str() {
            POINT_TAG => {
                let n = self.count("dimension")?;
                Region::point(self.f64s(n)?)
            }
            LINE_TAG => {
                let n = self.count("dimension")?;
                Region::line(self.f64s(n)?, self.f64s(n)?)
            }
            POLYGON_TAG => {
                let v = self.count("vertex")?;
                Region::polygon(self.coords(v)?)
            }
            PATH_TAG => {
                let s = self.count("subpath")?;
                let mut subpaths = Vec::new();
                for _ in 0..s {
                    let v = self.count("vertex")?;
                    subpaths.push(self.coords(v)?);
                }
                Region::path(subpaths)
            }
            ELLIPSE_TAG => {
                let n = self.count("dimension")?;
                Region::ellipse(self.f64s(n)?, self.f64s(n)?)
            }
            RECTANGLE_TAG => {
                let n = self.count("dimension")?;
                Region::rectangle(self.f64s(n)?, self.f64s(n)?)
            }
            other => return Err(self.error(format!("unknown region tag '{other}'"))),
        };
        Ok(region)
    }
}

fn decode(bytes: &[u8], path: &Path) -> Result<Vec<Region>, SlideSetError> {
    let mut decoder = Decoder {
        cursor: Cursor::new(bytes),
        path,
    };
    let count = decoder.count("region")?;
    let mut regions = Vec::new();
    for _ in 0..count {
        regions.push(decoder.region()?);
    }
    if decoder.cursor.position() != bytes.len() as u64 {
        return Err(decoder.error(format!(
            "{} trailing byte(s) after the last region",
            bytes.len() as u64 - decoder.cursor.position()
        )));
    }
    Ok(regions)
}

fn encode(regions: &[Region], path: &Path) -> Result<Vec<u8>, SlideSetError> {
    let mut out = Vec::new();
    let too_large = |what: &str, n: usize| SlideSetError::RegionSetFormat {
        path: PathBuf::from(path),
        message: format!("{what} count {n} does not fit the format"),
    };
    let count = |n: usize, what: &str| i32::try_from(n).map_err(|_| too_large(what, n));

    out.write_i32::<BigEndian>(count(regions.len(), "region")?)?;
    for region in regions {
        match region {
            Region::Point { position } => {
                write_utf(&mut out, POINT_TAG)?;
                out.write_i32::<BigEndian>(count(position.len(), "dimension")?)?;
                write_f64s(&mut out, position)?;
            }
            Region::Line { start, end } => {
                write_utf(&mut out, LINE_TAG)?;
                out.write_i32::<BigEndian>(count(start.len(), "dimension")?)?;
                write_f64s(&mut out, start)?;
                write_padded(&mut out, end, start.len())?;
            }
            Region::Polygon { vertices } => {
                write_utf(&mut out, POLYGON_TAG)?;
                out.write_i32::<BigEndian>(count(vertices.len(), "vertex")?)?;
                write_coords(&mut out, vertices)?;
            }
            Region::Path { subpaths } => {
                write_utf(&mut out, PATH_TAG)?;
                out.write_i32::<BigEndian>(count(subpaths.len(), "subpath")?)?;
                for subpath in subpaths {
                    out.write_i32::<BigEndian>(count(subpath.len(), "vertex")?)?;
                    write_coords(&mut out, subpath)?;
                }
            }
            Region::Ellipse { center, radii } => {
                write_utf(&mut out, ELLIPSE_TAG)?;
                out.write_i32::<BigEndian>(count(center.len(), "dimension")?)?;
                write_f64s(&mut out, center)?;
                write_padded(&mut out, radii, center.len())?;
            }
            Region::Rectangle { origin, extent } => {
                write_utf(&mut out, RECTANGLE_TAG)?;
                out.write_i32::<BigEndian>(count(origin.len(), "dimension")?)?;
                write_f64s(&mut out, origin)?;
                write_padded(&mut out, extent, origin.len())?;
            }
        }
    }
    Ok(out)
}

fn write_utf(out: &mut impl Write, s: &str) -> std::io::Result<()> {
    // Tags are short constants; the u16 length always fits.
    out.write_u16::<BigEndian>(s.len() as u16)?;
    out.write_all(s.as_bytes())
}

fn write_f64s(out: &mut impl Write, values: &[f64]) -> std::io::Result<()> {
    values
        .iter()
        .try_for_each(|v| out.write_f64::<BigEndian>(*v))
}

/// Writes exactly `n` values, padding missing ones with zero.
fn write_padded(out: &mut impl Write, values: &[f64], n: usize) -> std::io::Result<()> {
    (0..n).try_for_each(|d| out.write_f64::<BigEndian>(values.get(d).copied().unwrap_or(0.0)))
}

fn write_coords(out: &mut impl Write, coords: &[Coord]) -> std::io::Result<()> {
    coords.iter().try_for_each(|c| {
        out.write_f64::<BigEndian>(c.x)?;
        out.write_f64::<BigEndian>(c.y)
    })
}
