//! SVG region-set reader.
//!
//! Every `rect`, `circle`, `ellipse`, `line`, `polygon`, `polyline` and
//! `path` element in the document becomes one [`Region`], in document
//! order. The `transform` attributes of the element and all of its
//! ancestors are honored.
//!
//! A malformed document is an error. A single element that cannot be
//! converted (bad attribute, unsupported arc, skewed ellipse) is logged as
//! a warning and skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::coord::Coord;
use super::region::Region;
use super::svg_path::{interpret_path, PathShape};
use super::transform::{parse_number_list, parse_transform_list, Affine};
use crate::error::SlideSetError;
use crate::report::{LogCode, LogContext, RunLog};

/// Pixels per unit for the absolute length suffixes (90 dpi user space).
const UNIT_SCALES: [(&str, f64); 6] = [
    ("px", 1.0),
    ("in", 90.0),
    ("cm", 90.0 / 2.54),
    ("mm", 9.0 / 2.54),
    ("pt", 1.25),
    ("pc", 15.0),
];

const SHAPE_TAGS: [&str; 7] = [
    "rect", "circle", "ellipse", "line", "polygon", "polyline", "path",
];

/// Read an SVG file into a region set.
pub fn read_svg_regions(path: &Path, log: &mut RunLog) -> Result<Vec<Region>, SlideSetError> {
    let xml = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SlideSetError::DataUnavailable {
            path: path.to_path_buf(),
        },
        _ => SlideSetError::Io(source),
    })?;
    parse_svg_str(&xml, path, log)
}

/// Parse SVG from a string.
pub fn from_svg_str(xml: &str, log: &mut RunLog) -> Result<Vec<Region>, SlideSetError> {
    parse_svg_str(xml, Path::new("<string>"), log)
}

/// Parse SVG from bytes (must be valid UTF-8).
pub fn from_svg_slice(bytes: &[u8], log: &mut RunLog) -> Result<Vec<Region>, SlideSetError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| SlideSetError::SvgParse {
        path: PathBuf::from("<bytes>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_svg_str(xml, Path::new("<bytes>"), log)
}

fn parse_svg_str(xml: &str, path: &Path, log: &mut RunLog) -> Result<Vec<Region>, SlideSetError> {
    let document = Document::parse(xml).map_err(|source| SlideSetError::SvgParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let mut walker = Walker {
        regions: Vec::new(),
        position: 0,
        log,
    };
    walker.visit(document.root_element(), Affine::IDENTITY);

    log::debug!(
        "parsed {} region(s) from {}",
        walker.regions.len(),
        path.display()
    );
    Ok(walker.regions)
}

struct Walker<'l> {
    regions: Vec<Region>,
    /// Index of the next shape element in document order.
    position: usize,
    log: &'l mut RunLog,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_, '_>, parent: Affine) {
        let tag = node.tag_name().name();
        let is_shape = SHAPE_TAGS.contains(&tag);
        let position = self.position;
        if is_shape {
            self.position += 1;
        }

        let transform = match node.attribute("transform") {
            Some(raw) => match parse_transform_list(raw) {
                Ok(own) => parent.then_inner(&own),
                Err(err) => {
                    // Nothing below a broken transform can be placed.
                    self.skip(tag, position, err);
                    return;
                }
            },
            None => parent,
        };

        if is_shape {
            match shape_to_region(node, tag, &transform) {
                Ok(region) => self.regions.push(region),
                Err(err) => self.skip(tag, position, err),
            }
        }

        for child in node.children().filter(Node::is_element) {
            self.visit(child, transform);
        }
    }

    fn skip(&mut self, tag: &str, position: usize, err: SlideSetError) {
        self.log.warn(
            LogCode::SvgNodeSkipped,
            err.to_string(),
            LogContext::Node {
                tag: tag.to_string(),
                position,
            },
        );
    }
}

fn shape_to_region(node: Node<'_, '_>, tag: &str, t: &Affine) -> Result<Region, SlideSetError> {
    match tag {
        "rect" => {
            let x = length_attr(node, "x")?;
            let y = length_attr(node, "y")?;
            let w = required_length_attr(node, "width")?;
            let h = required_length_attr(node, "height")?;
            Ok(rect_region(t, x, y, w, h))
        }
        "circle" => {
            let r = required_length_attr(node, "r")?;
            transformed_ellipse(
                t,
                Coord::new(length_attr(node, "cx")?, length_attr(node, "cy")?),
                r,
                r,
            )
        }
        "ellipse" => transformed_ellipse(
            t,
            Coord::new(length_attr(node, "cx")?, length_attr(node, "cy")?),
            required_length_attr(node, "rx")?,
            required_length_attr(node, "ry")?,
        ),
        "line" => {
            let a = t.apply(Coord::new(length_attr(node, "x1")?, length_attr(node, "y1")?));
            let b = t.apply(Coord::new(length_attr(node, "x2")?, length_attr(node, "y2")?));
            Ok(Region::line(a.to_vec(), b.to_vec()))
        }
        "polygon" => Ok(Region::polygon(points_attr(node, t)?)),
        "polyline" => Ok(Region::path(vec![points_attr(node, t)?])),
        "path" => {
            let d = required_attr(node, "d")?;
            match interpret_path(d)? {
                PathShape::Subpaths(subpaths) => Ok(Region::path(
                    subpaths
                        .into_iter()
                        .map(|s| s.into_iter().map(|c| t.apply(c)).collect())
                        .collect(),
                )),
                PathShape::Ellipse { center, rx, ry } => transformed_ellipse(t, center, rx, ry),
            }
        }
        other => Err(SlideSetError::SvgShape(format!("<{other}> is not a shape"))),
    }
}

fn rect_region(t: &Affine, x: f64, y: f64, w: f64, h: f64) -> Region {
    let corners = [
        Coord::new(x, y),
        Coord::new(x + w, y),
        Coord::new(x + w, y + h),
        Coord::new(x, y + h),
    ];
    if t.is_axis_aligned() {
        let a = t.apply(corners[0]);
        let b = t.apply(corners[2]);
        Region::rectangle(
            vec![a.x.min(b.x), a.y.min(b.y)],
            vec![(b.x - a.x).abs(), (b.y - a.y).abs()],
        )
    } else {
        Region::polygon(corners.iter().map(|c| t.apply(*c)).collect::<Vec<_>>())
    }
}

/// Maps an axis-aligned ellipse through `t`.
///
/// The four cardinal points must stay level with (or plumb under) the
/// transformed centre to within two ULPs; anything else would need a
/// rotated ellipse, which regions cannot express.
fn transformed_ellipse(
    t: &Affine,
    center: Coord,
    rx: f64,
    ry: f64,
) -> Result<Region, SlideSetError> {
    let c = t.apply(center);
    let east = t.apply(Coord::new(center.x + rx, center.y));
    let west = t.apply(Coord::new(center.x - rx, center.y));
    let north = t.apply(Coord::new(center.x, center.y - ry));
    let south = t.apply(Coord::new(center.x, center.y + ry));

    let level = |p: Coord| (p.y - c.y).abs() <= 2.0 * ulp(c.y);
    let plumb = |p: Coord| (p.x - c.x).abs() <= 2.0 * ulp(c.x);
    if !(level(east) && level(west) && plumb(north) && plumb(south)) {
        return Err(SlideSetError::SvgShape(
            "ellipse transform does not keep its axes aligned".to_string(),
        ));
    }

    Ok(Region::ellipse(
        c.to_vec(),
        vec![(east.x - west.x).abs() / 2.0, (south.y - north.y).abs() / 2.0],
    ))
}

/// Distance from `v` to the next representable float away from zero.
fn ulp(v: f64) -> f64 {
    let v = v.abs();
    if !v.is_finite() {
        return f64::NAN;
    }
    f64::from_bits(v.to_bits() + 1) - v
}

/// Parses an SVG length into user units.
pub fn parse_length(raw: &str) -> Result<f64, SlideSetError> {
    let trimmed = raw.trim();
    let (number, scale) = UNIT_SCALES
        .iter()
        .find_map(|(suffix, scale)| trimmed.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((trimmed, 1.0));
    let value = number.trim_end().parse::<f64>().map_err(|_| {
        SlideSetError::SvgShape(format!("invalid length '{raw}'"))
    })?;
    Ok(value * scale)
}

fn required_attr<'a>(node: Node<'a, '_>, attr: &str) -> Result<&'a str, SlideSetError> {
    node.attribute(attr).ok_or_else(|| {
        SlideSetError::SvgShape(format!(
            "missing '{attr}' attribute on <{}>",
            node.tag_name().name()
        ))
    })
}

/// A coordinate attribute; absent means 0.
fn length_attr(node: Node<'_, '_>, attr: &str) -> Result<f64, SlideSetError> {
    node.attribute(attr).map_or(Ok(0.0), parse_length)
}

fn required_length_attr(node: Node<'_, '_>, attr: &str) -> Result<f64, SlideSetError> {
    parse_length(required_attr(node, attr)?)
}

fn points_attr(node: Node<'_, '_>, t: &Affine) -> Result<Vec<Coord>, SlideSetError> {
    let numbers = parse_number_list(required_attr(node, "points")?)?;
    if numbers.is_empty() || numbers.len() % 2 != 0 {
        return Err(SlideSetError::SvgShape(format!(
            "'points' needs a non-empty list of coordinate pairs, got {} number(s)",
            numbers.len()
        )));
    }
    Ok(numbers
        .chunks_exact(2)
        .map(|pair| t.apply(Coord::new(pair[0], pair[1])))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> (Vec<Region>, RunLog) {
        let xml = format!(r#"<svg xmlns="http://www.w3.org/2000/svg">{body}</svg>"#);
        let mut log = RunLog::new();
        let regions = from_svg_str(&xml, &mut log).unwrap();
        (regions, log)
    }

    #[test]
    fn rect_becomes_rectangle() {
        let (regions, log) = parse(r#"<rect x="1" y="2" width="3" height="4"/>"#);
        assert!(log.is_clean());
        assert_eq!(regions, vec![Region::rectangle(vec![1.0, 2.0], vec![3.0, 4.0])]);
    }

    #[test]
    fn rotated_rect_becomes_polygon() {
        let (regions, _) = parse(r#"<rect width="2" height="2" transform="rotate(45)"/>"#);
        assert!(matches!(&regions[0], Region::Polygon { vertices } if vertices.len() == 4));
    }

    #[test]
    fn group_transforms_compose_outer_to_inner() {
        let (regions, _) = parse(
            r#"<g transform="translate(10,0)"><g transform="scale(2)">
                 <line x1="1" y1="1" x2="2" y2="1"/>
               </g></g>"#,
        );
        assert_eq!(regions, vec![Region::line(vec![12.0, 2.0], vec![14.0, 2.0])]);
    }

    #[test]
    fn units_are_converted_to_pixels() {
        assert_eq!(parse_length("1in").unwrap(), 90.0);
        assert_eq!(parse_length("2pt").unwrap(), 2.5);
        assert_eq!(parse_length("1pc").unwrap(), 15.0);
        assert!((parse_length("2.54cm").unwrap() - 90.0).abs() < 1e-9);
        assert!((parse_length("25.4mm").unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(parse_length(" 7px ").unwrap(), 7.0);
        assert!(parse_length("5em").is_err());
        assert!(parse_length("10%").is_err());
    }

    #[test]
    fn circle_and_ellipse() {
        let (regions, _) = parse(
            r#"<circle cx="5" cy="5" r="2"/><ellipse cx="1" cy="2" rx="3" ry="4" transform="translate(1,1)"/>"#,
        );
        assert_eq!(
            regions,
            vec![
                Region::ellipse(vec![5.0, 5.0], vec![2.0, 2.0]),
                Region::ellipse(vec![2.0, 3.0], vec![3.0, 4.0]),
            ]
        );
    }

    #[test]
    fn skewed_ellipse_is_skipped_with_warning() {
        let (regions, log) = parse(
            r#"<ellipse cx="0" cy="0" rx="3" ry="1" transform="skewX(30)"/><circle r="1"/>"#,
        );
        assert_eq!(regions.len(), 1);
        assert_eq!(log.count_code(LogCode::SvgNodeSkipped), 1);
    }

    #[test]
    fn ellipse_and_two_arc_path_agree() {
        let (regions, log) = parse(
            r#"<ellipse cx="15" cy="20" rx="5" ry="3"/>
               <path d="M 10 20 A 5 3 0 1 0 20 20 A 5 3 0 1 0 10 20 Z"/>"#,
        );
        assert!(log.is_clean());
        assert_eq!(regions[0], regions[1]);
    }

    #[test]
    fn polyline_is_open_path_and_polygon_is_closed() {
        let (regions, _) =
            parse(r#"<polyline points="0,0 5,0 5,5"/><polygon points="0 0 5 0 5 5"/>"#);
        assert!(matches!(&regions[0], Region::Path { subpaths } if subpaths[0].len() == 3));
        assert!(matches!(&regions[1], Region::Polygon { vertices } if vertices.len() == 3));
    }

    #[test]
    fn bad_nodes_are_skipped_in_order() {
        let (regions, log) = parse(
            r#"<rect width="1"/><path d="M 0 0 A 1 1 0 0 1 2 0"/><line x2="3"/>"#,
        );
        assert_eq!(regions, vec![Region::line(vec![0.0, 0.0], vec![3.0, 0.0])]);
        assert_eq!(log.warning_count(), 2);
        let positions: Vec<String> = log.entries.iter().map(|e| e.context.to_string()).collect();
        assert!(positions[0].contains("#0"));
        assert!(positions[1].contains("#1"));
    }

    #[test]
    fn malformed_document_is_fatal() {
        let mut log = RunLog::new();
        let err = from_svg_str("<svg><rect></svg>", &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::SvgParse { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let mut log = RunLog::new();
        let err = read_svg_regions(Path::new("/no/such/file.svg"), &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::DataUnavailable { .. }));
    }
}
