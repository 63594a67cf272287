//! 2D barcode encoding
//!
//! The module matrix is computed here and handed to the document either as
//! an inline SVG or as a compact row bit-string painted by the embedded
//! canvas script.

use std::fmt::Write;

use qrcode::{Color, QrCode};
use thiserror::Error;

use crate::runtime_config::EcLevel;

#[derive(Debug, Error)]
#[error("Barcode encoding failed: {0}")]
pub struct BarcodeError(String);

/// Square module matrix, row-major, `true` = dark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    width: usize,
    modules: Vec<bool>,
}

impl Matrix {
    pub fn encode(data: &str, ec_level: EcLevel) -> Result<Self, BarcodeError> {
        let level = match ec_level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        };
        let code = QrCode::with_error_correction_level(data, level)
            .map_err(|e| BarcodeError(e.to_string()))?;

        let width = code.width();
        let mut modules = Vec::with_capacity(width * width);
        for y in 0..width {
            for x in 0..width {
                modules.push(code[(x, y)] == Color::Dark);
            }
        }
        Ok(Self { width, modules })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    /// Rows of `0`/`1`, comma separated
    pub fn to_bitstring(&self) -> String {
        let mut out = String::with_capacity(self.width * (self.width + 1));
        for y in 0..self.width {
            if y > 0 {
                out.push(',');
            }
            for x in 0..self.width {
                out.push(if self.is_dark(x, y) { '1' } else { '0' });
            }
        }
        out
    }

    /// Inline SVG with a quiet zone of `margin` modules
    ///
    /// `scale` only sets the intrinsic pixel size; the page CSS stretches the
    /// image to the barcode box.
    pub fn to_svg(&self, margin: u32, scale: u32) -> String {
        let margin = margin as usize;
        let total = self.width + 2 * margin;
        let px = total * scale.max(1) as usize;

        let mut path = String::new();
        for y in 0..self.width {
            for x in 0..self.width {
                if self.is_dark(x, y) {
                    // Writing into a String cannot fail
                    let _ = write!(path, "M{} {}h1v1h-1z", x + margin, y + margin);
                }
            }
        }

        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" class="qr" width="{px}" height="{px}" "#,
                r#"viewBox="0 0 {total} {total}" shape-rendering="crispEdges">"#,
                r##"<rect width="{total}" height="{total}" fill="#fff"/>"##,
                r##"<path fill="#000" d="{path}"/></svg>"##
            ),
            px = px,
            total = total,
            path = path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_version_1() {
        let m = Matrix::encode("B1_O1_5", EcLevel::M).unwrap();
        assert_eq!(m.width(), 21);
        // Finder pattern corners are dark
        assert!(m.is_dark(0, 0));
        assert!(m.is_dark(20, 0));
        assert!(m.is_dark(0, 20));
    }

    #[test]
    fn test_higher_ec_grows_matrix() {
        let data = "X".repeat(40);
        let low = Matrix::encode(&data, EcLevel::L).unwrap();
        let high = Matrix::encode(&data, EcLevel::H).unwrap();
        assert!(high.width() > low.width());
    }

    #[test]
    fn test_bitstring_shape() {
        let m = Matrix::encode("hello", EcLevel::L).unwrap();
        let bits = m.to_bitstring();
        let rows: Vec<&str> = bits.split(',').collect();
        assert_eq!(rows.len(), m.width());
        assert!(rows.iter().all(|r| r.len() == m.width()));
        assert!(rows[0].starts_with("1111111"));
    }

    #[test]
    fn test_svg_margin() {
        let m = Matrix::encode("hello", EcLevel::L).unwrap();
        let svg = m.to_svg(2, 3);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 25 25""#));
        assert!(svg.contains(r#"width="75""#));
        assert!(svg.contains("M2 2h1v1h-1z"));
    }
}
