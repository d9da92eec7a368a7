//! Interpreter for SVG path data (`<path d="...">`).
//!
//! The supported commands are `M L H V C S Q T Z` in absolute and relative
//! form. Curves are flattened into [`CURVE_SEGMENTS`] straight segments.
//! Elliptical arcs (`A`) are accepted only in the one shape editors emit
//! for a closed ellipse: two half-ellipse arcs between diametrically
//! opposite points, the second one returning to the start.

use super::coord::Coord;
use crate::error::SlideSetError;

/// Number of straight segments each Bézier curve is flattened into.
pub const CURVE_SEGMENTS: usize = 16;

/// Relative tolerance for the arc radius versus the half-diameter.
const ARC_RADIUS_TOLERANCE: f64 = 1e-6;

/// Geometry described by one path element, in untransformed user units.
#[derive(Clone, Debug, PartialEq)]
pub enum PathShape {
    /// Flattened subpaths. A closed subpath ends with its start vertex.
    Subpaths(Vec<Vec<Coord>>),
    /// A closed ellipse written as two arcs.
    Ellipse { center: Coord, rx: f64, ry: f64 },
}

/// Interprets the `d` attribute of a path element.
///
/// # Errors
/// Returns [`SlideSetError::SvgShape`] for malformed data, unsupported arc
/// usage, or a path without any vertices.
pub fn interpret_path(d: &str) -> Result<PathShape, SlideSetError> {
    let tokens = tokenize(d)?;
    let mut machine = PathMachine::default();
    let mut pos = 0;
    let mut command: Option<char> = None;

    while pos < tokens.len() {
        let cmd = match tokens[pos] {
            Token::Command(c) => {
                pos += 1;
                c
            }
            Token::Number(_) => match command {
                // Extra coordinate pairs after a moveto are implicit linetos.
                Some('M') => 'L',
                Some('m') => 'l',
                Some('Z') | Some('z') | None => {
                    return Err(shape_error(format!(
                        "path data '{d}' has a number where a command is expected"
                    )))
                }
                Some(c) => c,
            },
        };
        command = Some(cmd);

        let arity = arity(cmd)
            .ok_or_else(|| shape_error(format!("unsupported path command '{cmd}'")))?;
        let args = take_numbers(&tokens, &mut pos, arity, cmd)?;
        machine.step(cmd, &args)?;
    }

    machine.finish()
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn arity(cmd: char) -> Option<usize> {
    match cmd.to_ascii_uppercase() {
        'M' | 'L' | 'T' => Some(2),
        'H' | 'V' => Some(1),
        'C' => Some(6),
        'S' | 'Q' => Some(4),
        'A' => Some(7),
        'Z' => Some(0),
        _ => None,
    }
}

fn take_numbers(
    tokens: &[Token],
    pos: &mut usize,
    count: usize,
    cmd: char,
) -> Result<Vec<f64>, SlideSetError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        match tokens.get(*pos) {
            Some(Token::Number(n)) => {
                out.push(*n);
                *pos += 1;
            }
            _ => {
                return Err(shape_error(format!(
                    "command '{cmd}' expects {count} number(s)"
                )))
            }
        }
    }
    Ok(out)
}

/// Splits path data into commands and numbers.
///
/// Numbers may run together as in `10-5` or `.5.5`; separators are
/// whitespace and commas.
fn tokenize(d: &str) -> Result<Vec<Token>, SlideSetError> {
    let bytes = d.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() || c == ',' {
            i += 1;
        } else if c.is_ascii_alphabetic() && c != 'e' && c != 'E' {
            tokens.push(Token::Command(c));
            i += 1;
        } else if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            let start = i;
            i += 1;
            let mut seen_dot = c == '.';
            let mut seen_exp = false;
            while i < bytes.len() {
                let n = bytes[i] as char;
                if n.is_ascii_digit() {
                    i += 1;
                } else if n == '.' && !seen_dot && !seen_exp {
                    seen_dot = true;
                    i += 1;
                } else if (n == 'e' || n == 'E') && !seen_exp {
                    seen_exp = true;
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
                        i += 1;
                    }
                } else {
                    break;
                }
            }
            let raw = &d[start..i];
            let value = raw
                .parse::<f64>()
                .map_err(|_| shape_error(format!("invalid number '{raw}' in path data")))?;
            tokens.push(Token::Number(value));
        } else {
            return Err(shape_error(format!(
                "unexpected character '{c}' in path data"
            )));
        }
    }

    Ok(tokens)
}

#[derive(Clone, Copy, Debug)]
struct Arc {
    from: Coord,
    to: Coord,
    rx: f64,
    ry: f64,
    rotation: f64,
    sweep: bool,
}

#[derive(Default)]
struct PathMachine {
    current: Coord,
    subpath_start: Coord,
    /// Second control point of the previous C/S segment.
    last_cubic: Option<Coord>,
    /// Control point of the previous Q/T segment.
    last_quad: Option<Coord>,
    open: Vec<Coord>,
    subpaths: Vec<Vec<Coord>>,
    arcs: Vec<Arc>,
    drawn_segments: usize,
}

impl PathMachine {
    fn step(&mut self, cmd: char, args: &[f64]) -> Result<(), SlideSetError> {
        let relative = cmd.is_ascii_lowercase();
        let base = if relative {
            self.current
        } else {
            Coord::default()
        };
        let at = |i: usize| Coord::new(base.x + args[i], base.y + args[i + 1]);

        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        match cmd.to_ascii_uppercase() {
            'M' => {
                self.flush();
                let p = at(0);
                self.open.push(p);
                self.subpath_start = p;
                self.current = p;
            }
            'L' => self.line_to(at(0)),
            'H' => {
                let x = if relative {
                    self.current.x + args[0]
                } else {
                    args[0]
                };
                self.line_to(Coord::new(x, self.current.y));
            }
            'V' => {
                let y = if relative {
                    self.current.y + args[0]
                } else {
                    args[0]
                };
                self.line_to(Coord::new(self.current.x, y));
            }
            'C' => {
                let (c1, c2, p) = (at(0), at(2), at(4));
                self.cubic_to(c1, c2, p);
                cubic_ctrl = Some(c2);
            }
            'S' => {
                let c1 = reflect(self.last_cubic, self.current);
                let (c2, p) = (at(0), at(2));
                self.cubic_to(c1, c2, p);
                cubic_ctrl = Some(c2);
            }
            'Q' => {
                let (c, p) = (at(0), at(2));
                self.quad_to(c, p);
                quad_ctrl = Some(c);
            }
            'T' => {
                let c = reflect(self.last_quad, self.current);
                self.quad_to(c, at(0));
                quad_ctrl = Some(c);
            }
            'A' => {
                let to = at(5);
                self.arcs.push(Arc {
                    from: self.current,
                    to,
                    rx: args[0].abs(),
                    ry: args[1].abs(),
                    rotation: args[2],
                    sweep: args[4] != 0.0,
                });
                self.current = to;
            }
            'Z' => {
                if !self.open.is_empty() {
                    if self.open.last() != Some(&self.subpath_start) {
                        self.open.push(self.subpath_start);
                    }
                    self.flush();
                }
                self.current = self.subpath_start;
            }
            _ => return Err(shape_error(format!("unsupported path command '{cmd}'"))),
        }

        self.last_cubic = cubic_ctrl;
        self.last_quad = quad_ctrl;
        Ok(())
    }

    fn begin_if_needed(&mut self) {
        if self.open.is_empty() {
            self.open.push(self.current);
            self.subpath_start = self.current;
        }
    }

    fn line_to(&mut self, p: Coord) {
        self.begin_if_needed();
        self.open.push(p);
        self.current = p;
        self.drawn_segments += 1;
    }

    fn cubic_to(&mut self, c1: Coord, c2: Coord, p: Coord) {
        self.begin_if_needed();
        let p0 = self.current;
        for i in 1..=CURVE_SEGMENTS {
            let t = i as f64 / CURVE_SEGMENTS as f64;
            let mt = 1.0 - t;
            let w0 = mt * mt * mt;
            let w1 = 3.0 * mt * mt * t;
            let w2 = 3.0 * mt * t * t;
            let w3 = t * t * t;
            self.open.push(Coord::new(
                w0 * p0.x + w1 * c1.x + w2 * c2.x + w3 * p.x,
                w0 * p0.y + w1 * c1.y + w2 * c2.y + w3 * p.y,
            ));
        }
        // Land exactly on the endpoint.
        if let Some(last) = self.open.last_mut() {
            *last = p;
        }
        self.current = p;
        self.drawn_segments += 1;
    }

    fn quad_to(&mut self, c: Coord, p: Coord) {
        self.begin_if_needed();
        let p0 = self.current;
        for i in 1..=CURVE_SEGMENTS {
            let t = i as f64 / CURVE_SEGMENTS as f64;
            let mt = 1.0 - t;
            self.open.push(Coord::new(
                mt * mt * p0.x + 2.0 * mt * t * c.x + t * t * p.x,
                mt * mt * p0.y + 2.0 * mt * t * c.y + t * t * p.y,
            ));
        }
        if let Some(last) = self.open.last_mut() {
            *last = p;
        }
        self.current = p;
        self.drawn_segments += 1;
    }

    fn flush(&mut self) {
        if self.open.len() > 1 {
            self.subpaths.push(std::mem::take(&mut self.open));
        } else {
            self.open.clear();
        }
    }

    fn finish(mut self) -> Result<PathShape, SlideSetError> {
        if !self.arcs.is_empty() {
            if self.drawn_segments > 0 || self.arcs.len() != 2 {
                return Err(shape_error(
                    "arcs are only supported as two arcs forming a closed ellipse".to_string(),
                ));
            }
            return arcs_to_ellipse(self.arcs[0], self.arcs[1]);
        }

        self.flush();
        if self.subpaths.is_empty() {
            return Err(shape_error("path has no drawable segments".to_string()));
        }
        Ok(PathShape::Subpaths(self.subpaths))
    }
}

/// Reflection of the previous control point about the current point; the
/// current point itself when the previous segment was not of the same kind.
fn reflect(previous: Option<Coord>, current: Coord) -> Coord {
    match previous {
        Some(c) => Coord::new(2.0 * current.x - c.x, 2.0 * current.y - c.y),
        None => current,
    }
}

fn same_point(a: Coord, b: Coord) -> bool {
    let scale = 1.0 + a.x.abs().max(a.y.abs()).max(b.x.abs()).max(b.y.abs());
    (a.x - b.x).abs() <= 1e-9 * scale && (a.y - b.y).abs() <= 1e-9 * scale
}

fn arcs_to_ellipse(first: Arc, second: Arc) -> Result<PathShape, SlideSetError> {
    if first.rx != second.rx || first.ry != second.ry {
        return Err(shape_error("ellipse arcs have different radii".to_string()));
    }
    if first.rotation != 0.0 || second.rotation != 0.0 {
        return Err(shape_error("rotated ellipse arcs are not supported".to_string()));
    }
    // Opposite sweeps retrace the first half instead of closing the ellipse.
    if first.sweep != second.sweep {
        return Err(shape_error(
            "ellipse arcs must sweep in the same direction".to_string(),
        ));
    }
    if !same_point(second.to, first.from) {
        return Err(shape_error(
            "ellipse arcs do not return to their start point".to_string(),
        ));
    }

    let dx = first.to.x - first.from.x;
    let dy = first.to.y - first.from.y;
    let scale = 1.0 + dx.abs().max(dy.abs());
    let (mut rx, mut ry) = (first.rx, first.ry);

    if dy.abs() <= 1e-9 * scale && dx != 0.0 {
        let half = dx.abs() / 2.0;
        if (rx - half).abs() > ARC_RADIUS_TOLERANCE * half {
            return Err(shape_error(format!(
                "arc radius {rx} does not match half-diameter {half}"
            )));
        }
        rx = half;
    } else if dx.abs() <= 1e-9 * scale && dy != 0.0 {
        let half = dy.abs() / 2.0;
        if (ry - half).abs() > ARC_RADIUS_TOLERANCE * half {
            return Err(shape_error(format!(
                "arc radius {ry} does not match half-diameter {half}"
            )));
        }
        ry = half;
    } else {
        return Err(shape_error(
            "ellipse arcs must join points opposite along one axis".to_string(),
        ));
    }

    Ok(PathShape::Ellipse {
        center: Coord::new(
            (first.from.x + first.to.x) / 2.0,
            (first.from.y + first.to.y) / 2.0,
        ),
        rx,
        ry,
    })
}

fn shape_error(message: String) -> SlideSetError {
    SlideSetError::SvgShape(message)
}
