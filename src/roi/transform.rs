//! 2-D affine transforms and the SVG `transform` attribute grammar.

use super::coord::Coord;
use crate::error::SlideSetError;

/// An affine map `(x, y) -> (a x + c y + e, b x + d y + f)`, in SVG's
/// `matrix(a b c d e f)` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees` about the origin.
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// `self ∘ inner`: applies `inner` first, then `self`.
    pub fn then_inner(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn apply(&self, p: Coord) -> Coord {
        Coord::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// True when the map keeps axis-aligned boxes axis-aligned without
    /// swapping axes.
    pub fn is_axis_aligned(&self) -> bool {
        self.b == 0.0 && self.c == 0.0
    }
}

/// Parses an SVG transform list such as `translate(10,5) rotate(30)`.
///
/// The functions compose left to right, so the rightmost one is applied to
/// the geometry first.
pub fn parse_transform_list(raw: &str) -> Result<Affine, SlideSetError> {
    let mut total = Affine::IDENTITY;
    let mut rest = raw.trim();

    while !rest.is_empty() {
        let open = rest
            .find('(')
            .ok_or_else(|| shape_error(format!("transform '{raw}' is missing '('")))?;
        let close = rest[open..]
            .find(')')
            .map(|i| i + open)
            .ok_or_else(|| shape_error(format!("transform '{raw}' is missing ')'")))?;

        let name = rest[..open].trim().trim_start_matches(',').trim();
        let args = parse_number_list(&rest[open + 1..close])?;
        total = total.then_inner(&transform_function(name, &args)?);

        rest = rest[close + 1..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }

    Ok(total)
}

fn transform_function(name: &str, args: &[f64]) -> Result<Affine, SlideSetError> {
    let affine = match (name, args) {
        ("matrix", [a, b, c, d, e, f]) => Affine::new(*a, *b, *c, *d, *e, *f),
        ("translate", [tx]) => Affine::translate(*tx, 0.0),
        ("translate", [tx, ty]) => Affine::translate(*tx, *ty),
        ("scale", [s]) => Affine::scale(*s, *s),
        ("scale", [sx, sy]) => Affine::scale(*sx, *sy),
        ("rotate", [angle]) => Affine::rotate(*angle),
        ("rotate", [angle, cx, cy]) => Affine::translate(*cx, *cy)
            .then_inner(&Affine::rotate(*angle))
            .then_inner(&Affine::translate(-cx, -cy)),
        ("skewX", [angle]) => Affine::skew_x(*angle),
        ("skewY", [angle]) => Affine::skew_y(*angle),
        _ => {
            return Err(shape_error(format!(
                "unsupported transform {name} with {} argument(s)",
                args.len()
            )))
        }
    };
    Ok(affine)
}

/// Parses a comma/whitespace separated list of plain numbers.
pub fn parse_number_list(raw: &str) -> Result<Vec<f64>, SlideSetError> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| shape_error(format!("invalid number '{s}'")))
        })
        .collect()
}

fn shape_error(message: String) -> SlideSetError {
    SlideSetError::SvgShape(message)
}
