//! Adobe `.cube` 3D colour lookup tables.
//!
//! Supported keywords: `TITLE`, `LUT_3D_SIZE`, `DOMAIN_MIN`, `DOMAIN_MAX`.
//! Lines starting with `#` are comments. Keywords must precede the table.

use std::path::Path;

use crate::error::DeferredError;
use crate::gpu::texture::Texture3D;

/// Largest edge length accepted from a file.
pub const MAX_LUT_SIZE: u32 = 256;

/// A parsed 3D LUT with entries in red-fastest order.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeLut {
    title: Option<String>,
    size: u32,
    domain_min: [f32; 3],
    domain_max: [f32; 3],
    table: Vec<[f32; 3]>,
}

fn lut_error(line: usize, msg: impl std::fmt::Display) -> DeferredError {
    DeferredError::Lut(format!("line {line}: {msg}"))
}

fn parse_triple<'a>(
    line: usize,
    mut fields: impl Iterator<Item = &'a str>,
) -> Result<[f32; 3], DeferredError> {
    let mut out = [0.0; 3];
    for v in &mut out {
        let field = fields
            .next()
            .ok_or_else(|| lut_error(line, "expected three values"))?;
        *v = field
            .parse()
            .map_err(|_| lut_error(line, format!("'{field}' is not a number")))?;
    }
    if fields.next().is_some() {
        return Err(lut_error(line, "expected three values"));
    }
    Ok(out)
}

impl CubeLut {
    /// Identity table of edge length `size`.
    #[must_use]
    pub fn identity(size: u32) -> Self {
        let size = size.max(2);
        let max = (size - 1) as f32;
        let mut table = Vec::with_capacity((size * size * size) as usize);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    table.push([r as f32 / max, g as f32 / max, b as f32 / max]);
                }
            }
        }
        Self {
            title: None,
            size,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
            table,
        }
    }

    /// Parse `.cube` text.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Lut`] for unknown keywords, 1D tables,
    /// malformed numbers, a missing or out-of-range `LUT_3D_SIZE`, an empty
    /// domain, or an entry count other than `size³`.
    pub fn parse(text: &str) -> Result<Self, DeferredError> {
        let mut title = None;
        let mut size = None;
        let mut domain_min = [0.0; 3];
        let mut domain_max = [1.0; 3];
        let mut table = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(head) = fields.next() else { continue };

            match head {
                "TITLE" => {
                    let rest = line["TITLE".len()..].trim();
                    title = Some(rest.trim_matches('"').to_owned());
                }
                "LUT_3D_SIZE" => {
                    let value = fields
                        .next()
                        .ok_or_else(|| lut_error(line_no, "LUT_3D_SIZE needs a value"))?;
                    let n: u32 = value.parse().map_err(|_| {
                        lut_error(line_no, format!("bad LUT_3D_SIZE '{value}'"))
                    })?;
                    if !(2..=MAX_LUT_SIZE).contains(&n) {
                        return Err(lut_error(
                            line_no,
                            format!("LUT_3D_SIZE {n} outside 2..={MAX_LUT_SIZE}"),
                        ));
                    }
                    size = Some(n);
                }
                "DOMAIN_MIN" => domain_min = parse_triple(line_no, fields)?,
                "DOMAIN_MAX" => domain_max = parse_triple(line_no, fields)?,
                "LUT_1D_SIZE" => {
                    return Err(lut_error(line_no, "1D LUTs are not supported"));
                }
                _ if head.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                    return Err(lut_error(line_no, format!("unknown keyword '{head}'")));
                }
                _ => {
                    if size.is_none() {
                        return Err(lut_error(line_no, "table data before LUT_3D_SIZE"));
                    }
                    table.push(parse_triple(line_no, line.split_whitespace())?);
                }
            }
        }

        let size = size.ok_or_else(|| DeferredError::Lut("missing LUT_3D_SIZE".to_owned()))?;
        if (0..3).any(|c| domain_min[c] >= domain_max[c]) {
            return Err(DeferredError::Lut(format!(
                "empty domain {domain_min:?}..{domain_max:?}"
            )));
        }
        let expected = (size * size * size) as usize;
        if table.len() != expected {
            return Err(DeferredError::Lut(format!(
                "expected {expected} entries for size {size}, found {}",
                table.len()
            )));
        }
        Ok(Self {
            title,
            size,
            domain_min,
            domain_max,
            table,
        })
    }

    /// Read and parse a `.cube` file.
    ///
    /// # Errors
    ///
    /// [`DeferredError::Io`] if unreadable, otherwise see
    /// [`parse`](Self::parse).
    pub fn from_path(path: &Path) -> Result<Self, DeferredError> {
        let text = std::fs::read_to_string(path)?;
        let lut = Self::parse(&text)?;
        log::info!(
            "loaded LUT {} ({}³, title {:?})",
            path.display(),
            lut.size,
            lut.title
        );
        Ok(lut)
    }

    /// `TITLE`, if present.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Edge length.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw entries in red-fastest order.
    pub fn table(&self) -> &[[f32; 3]] {
        &self.table
    }

    /// `(DOMAIN_MIN, DOMAIN_MAX)`: the input colour range the lattice
    /// spans. Entries are outputs and are not rescaled by it.
    pub fn domain(&self) -> ([f32; 3], [f32; 3]) {
        (self.domain_min, self.domain_max)
    }

    /// Entry at integer lattice coordinates.
    pub fn entry(&self, r: u32, g: u32, b: u32) -> Option<[f32; 3]> {
        if r >= self.size || g >= self.size || b >= self.size {
            return None;
        }
        let index = (b * self.size + g) * self.size + r;
        self.table.get(index as usize).copied()
    }

    /// Upload the entries as an RGBA8 3D texture. The shader maps input
    /// colours through [`domain`](Self::domain) before sampling.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Texture3D {
        let label = self.title.as_deref().unwrap_or("Colour LUT");
        Texture3D::from_rgb(device, queue, label, self.size, &self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "\
# two-point lut
TITLE \"Invert\"
LUT_3D_SIZE 2

1 1 1
0 1 1
1 0 1
0 0 1
1 1 0
0 1 0
1 0 0
0 0 0
";

    #[test]
    fn parses_title_size_and_order() {
        let lut = CubeLut::parse(TINY).unwrap();
        assert_eq!(lut.title(), Some("Invert"));
        assert_eq!(lut.size(), 2);
        assert_eq!(lut.table().len(), 8);
        // red varies fastest
        assert_eq!(lut.entry(1, 0, 0), Some([0.0, 1.0, 1.0]));
        assert_eq!(lut.entry(0, 0, 1), Some([1.0, 1.0, 0.0]));
        assert_eq!(lut.entry(2, 0, 0), None);
    }

    #[test]
    fn domain_bounds_inputs_and_leaves_entries_alone() {
        let text = "LUT_3D_SIZE 2\nDOMAIN_MIN 0 0 0\nDOMAIN_MAX 2 2 2\n"
            .to_owned()
            + &"0.5 0.25 1\n".repeat(8);
        let lut = CubeLut::parse(&text).unwrap();
        assert_eq!(lut.domain(), ([0.0; 3], [2.0; 3]));
        assert!(lut.table().iter().all(|e| *e == [0.5, 0.25, 1.0]));
        assert_eq!(CubeLut::identity(2).domain(), ([0.0; 3], [1.0; 3]));
    }

    #[test]
    fn identity_maps_lattice_to_itself() {
        let lut = CubeLut::identity(4);
        assert_eq!(lut.entry(3, 0, 3), Some([1.0, 0.0, 1.0]));
        assert_eq!(lut.table().len(), 64);
    }

    #[test]
    fn rejects_malformed_files() {
        let cases = [
            "1 1 1\n",
            "LUT_3D_SIZE 2\n0 0 0\n",
            "LUT_3D_SIZE 1\n",
            "LUT_1D_SIZE 16\n",
            "LUT_3D_SIZE 2\nFOO 1\n",
            "LUT_3D_SIZE 2\n0 0 x\n",
            "LUT_3D_SIZE 2\nDOMAIN_MIN 1 0 0\nDOMAIN_MAX 1 1 1\n",
            "",
        ];
        for case in cases {
            assert!(
                matches!(CubeLut::parse(case), Err(DeferredError::Lut(_))),
                "accepted {case:?}"
            );
        }
    }
}
