//! Printable document generator
//!
//! Produces one self-contained HTML document from the `label_document.html`
//! template: `@page` sized in cm, every layout region sized by a CSS custom
//! property taken from the config, one `.page` section per label with a
//! forced page break between sections. Label text is escaped by the
//! template.

use askama::Template;
use tracing::warn;

use super::barcode::Matrix;
use super::label::LabelModel;
use crate::runtime_config::RuntimeConfig;

/// Paints every `canvas[data-matrix]` from its row bit-string
const MATRIX_PAINTER: &str = r#"(function(){
document.querySelectorAll('canvas[data-matrix]').forEach(function(c){
var rows=c.getAttribute('data-matrix').split(','),n=rows.length;
var m=+c.getAttribute('data-margin')||0,s=+c.getAttribute('data-scale')||4,t=n+2*m;
c.width=c.height=t*s;var g=c.getContext('2d');
g.fillStyle='#fff';g.fillRect(0,0,c.width,c.height);g.fillStyle='#000';
for(var y=0;y<n;y++){for(var x=0;x<n;x++){if(rows[y].charAt(x)==='1'){g.fillRect((x+m)*s,(y+m)*s,s,s);}}}
});
})();"#;

const DEFAULT_TITLE: &str = "PASSCARD";

/// Rendering switches for one call
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Screen-only print/close toolbar (preview)
    pub with_toolbar: bool,
    pub title: Option<&'a str>,
    /// Embed pre-rendered SVG barcodes instead of the painter script
    pub skip_barcode_script: bool,
}

/// Canvas painted client-side from a row bit-string
struct CanvasMatrix {
    bits: String,
    margin: u32,
    scale: u32,
}

enum Barcode {
    Blank,
    Svg(String),
    Canvas(CanvasMatrix),
}

struct PageView<'a> {
    label: &'a LabelModel,
    barcode: Barcode,
}

#[derive(Template)]
#[template(path = "label_document.html")]
struct DocumentTemplate<'a> {
    title: &'a str,
    page_w: String,
    page_h: String,
    /// `--{name}` custom properties on `:root`
    layout: Vec<(&'static str, String)>,
    with_toolbar: bool,
    with_script: bool,
    painter: &'static str,
    pages: Vec<PageView<'a>>,
}

/// Custom properties for one page size and geometry
///
/// Page height already has the feed compensation taken off.
pub fn layout_properties(
    width_microns: u32,
    height_microns: u32,
    cfg: &RuntimeConfig,
) -> Vec<(&'static str, String)> {
    let geo = &cfg.geometry;
    let width_cm = width_microns as f64 / 10_000.0;
    let height_cm = page_height_cm(height_microns, cfg);
    let unit = |v: f64| format!("{}cm", cm(v));

    vec![
        ("page-w", unit(width_cm)),
        ("page-h", unit(height_cm)),
        ("pad-l", unit(geo.pad_left_cm)),
        ("pad-r", unit(geo.pad_right_cm)),
        ("right-inset", unit(geo.right_inset_cm)),
        ("line-w", unit(geo.line_w_cm)),
        ("top-pad", unit(geo.top_pad())),
        ("top-shift", unit(geo.top_shift_cm)),
        ("key-col-w", unit(geo.key_col_w_cm)),
        ("col-split", unit(geo.col_split(width_cm))),
        ("row-header-h", unit(geo.header_h(height_cm))),
        ("row-meta-h", unit(geo.meta_h(height_cm))),
        ("row-footer-h", unit(geo.footer_h(height_cm))),
        ("zoom", cm(cfg.preview_zoom_pct as f64 / 100.0)),
    ]
}

fn page_height_cm(height_microns: u32, cfg: &RuntimeConfig) -> f64 {
    (height_microns as f64 / 10_000.0 - cfg.geometry.feed_comp_mm / 10.0).max(0.1)
}

/// Render `models` into one document, one page per model
pub fn render(
    models: &[LabelModel],
    width_microns: u32,
    height_microns: u32,
    cfg: &RuntimeConfig,
    opts: &RenderOptions<'_>,
) -> askama::Result<String> {
    let inline_svg = opts.skip_barcode_script;
    DocumentTemplate {
        title: opts.title.unwrap_or(DEFAULT_TITLE),
        page_w: format!("{}cm", cm(width_microns as f64 / 10_000.0)),
        page_h: format!("{}cm", cm(page_height_cm(height_microns, cfg))),
        layout: layout_properties(width_microns, height_microns, cfg),
        with_toolbar: opts.with_toolbar,
        with_script: !inline_svg,
        painter: MATRIX_PAINTER,
        pages: models
            .iter()
            .map(|label| PageView {
                label,
                barcode: barcode(label, cfg, inline_svg),
            })
            .collect(),
    }
    .render()
}

fn barcode(model: &LabelModel, cfg: &RuntimeConfig, inline_svg: bool) -> Barcode {
    if model.payload.is_empty() {
        return Barcode::Blank;
    }
    let matrix = match Matrix::encode(&model.payload, cfg.barcode.ec_level) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, payload = %model.payload, "Barcode left blank");
            return Barcode::Blank;
        }
    };
    if inline_svg {
        Barcode::Svg(matrix.to_svg(cfg.barcode.margin, cfg.barcode.scale))
    } else {
        Barcode::Canvas(CanvasMatrix {
            bits: matrix.to_bitstring(),
            margin: cfg.barcode.margin,
            scale: cfg.barcode.scale,
        })
    }
}

/// Up to three decimals, trailing zeros dropped
fn cm(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
