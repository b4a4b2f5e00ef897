//! SVG rendering of a [`ChartSpec`] with `plotters`.

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, bail};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::report::charts::{ChartKind, ChartSpec, Point};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 650;
const PANEL_SIZE: u32 = 360;
const POINT_SIZE: u32 = 3;

/// Parse a `#rrggbb` colour.
pub fn parse_colour(hex: &str) -> Result<RGBColor> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("Invalid colour '{hex}', expected #rrggbb");
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .with_context(|| format!("Invalid colour '{hex}'"))
    };
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn colour_of(spec: &ChartSpec, class: &str) -> Result<RGBColor> {
    match spec.colours.get(class) {
        Some(hex) => parse_colour(hex),
        None => Ok(BLACK),
    }
}

/// Data range padded by 5% on both sides; `0..1` when there is no data.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
    (lo - pad)..(hi + pad)
}

///
/// Render `spec` to an SVG file at `path`.
///
/// # Arguments
/// - spec: the chart
/// - path: output file, overwritten
///
pub fn render_svg(spec: &ChartSpec, path: &Path) -> Result<()> {
    match spec.kind {
        ChartKind::Scatter => {
            let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
            root.fill(&WHITE)?;
            let points: Vec<&Point> = spec.points.iter().collect();
            let x = padded_range(points.iter().map(|p| p.x).chain(spec.x_markers.iter().copied()));
            let y = padded_range(points.iter().map(|p| p.y));
            draw_scatter(&root, spec, &points, &spec.title, 24.0, x, y, true)?;
            root.present()?;
        }
        ChartKind::StratifiedScatter => render_stratified(spec, path)?,
        ChartKind::Bar => {
            let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
            root.fill(&WHITE)?;
            draw_bars(&root, spec)?;
            root.present()?;
        }
    }
    log::info!("wrote {}", path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_scatter(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    points: &[&Point],
    caption: &str,
    caption_size: f64,
    x: Range<f64>,
    y: Range<f64>,
    legend: bool,
) -> Result<()> {
    let (y_lo, y_hi) = (y.start, y.end);
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", caption_size))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x, y)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()?;

    for &marker in &spec.x_markers {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(marker, y_lo), (marker, y_hi)],
            BLACK.mix(0.5),
        )))?;
    }

    for class in spec.classes() {
        let colour = colour_of(spec, class)?;
        let series = chart.draw_series(
            points
                .iter()
                .filter(|p| p.class == class)
                .map(|p| Circle::new((p.x, p.y), POINT_SIZE, colour.filled())),
        )?;
        if legend {
            series
                .label(class)
                .legend(move |(x, y)| Circle::new((x, y), 4, colour.filled()));
        }
    }

    if legend && !points.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn render_stratified(spec: &ChartSpec, path: &Path) -> Result<()> {
    let mut strata: Vec<usize> = spec.points.iter().filter_map(|p| p.stratum).collect();
    strata.sort_unstable();
    strata.dedup();
    if strata.is_empty() {
        log::warn!("{}: no stratified points", spec.title);
    }

    let n = strata.len().max(1);
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);

    let root = SVGBackend::new(path, (PANEL_SIZE * cols as u32, PANEL_SIZE * rows as u32 + 50))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled(&spec.title, ("sans-serif", 24.0))?;

    // shared axes so panels compare directly
    let x = padded_range(spec.points.iter().map(|p| p.x).chain(spec.x_markers.iter().copied()));
    let y = padded_range(spec.points.iter().map(|p| p.y));

    for (panel, stratum) in body.split_evenly((rows, cols)).iter().zip(&strata) {
        let points: Vec<&Point> = spec
            .points
            .iter()
            .filter(|p| p.stratum == Some(*stratum))
            .collect();
        let caption = format!("A-value bin {stratum} (n = {})", points.len());
        draw_scatter(panel, spec, &points, &caption, 16.0, x.clone(), y.clone(), false)?;
    }
    root.present()?;
    Ok(())
}

fn draw_bars(area: &DrawingArea<SVGBackend<'_>, Shift>, spec: &ChartSpec) -> Result<()> {
    let n = spec.bars.len().max(1);
    let y_max = spec
        .bars
        .iter()
        .map(|b| b.value)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.15;

    let mut chart = ChartBuilder::on(area)
        .caption(&spec.title, ("sans-serif", 24.0))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)?;

    let labels: Vec<&str> = spec.bars.iter().map(|b| b.label.as_str()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).map(|l| l.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()?;

    for (i, bar) in spec.bars.iter().enumerate() {
        let colour = colour_of(spec, &bar.class)?;
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), bar.value),
            ],
            colour.filled(),
        );
        rect.set_margin(0, 0, 6, 6);
        chart.draw_series(std::iter::once(rect))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}", bar.value),
            (SegmentValue::CenterOf(i), bar.value + 0.02 * y_max),
            ("sans-serif", 14.0),
        )))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::charts::Bar;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::collections::BTreeMap;
    use std::fs;

    fn chart(kind: ChartKind) -> ChartSpec {
        let mut colours = BTreeMap::new();
        colours.insert("Up".to_string(), "#b2182b".to_string());
        colours.insert("Down".to_string(), "#2166ac".to_string());
        ChartSpec {
            kind,
            title: "test".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            points: (0..12)
                .map(|i| Point {
                    x: i as f64 / 10.0,
                    y: (i as f64 - 6.0) / 2.0,
                    class: if i < 6 { "Down" } else { "Up" }.to_string(),
                    stratum: Some(1 + i % 3),
                    label: None,
                })
                .collect(),
            bars: vec![
                Bar { label: "[0,0.3]".to_string(), value: 40.0, class: "Down".to_string() },
                Bar { label: "(0.3,Inf)".to_string(), value: 60.0, class: "Up".to_string() },
            ],
            x_markers: vec![0.3],
            colours,
        }
    }

    #[rstest]
    #[case("#b2182b", RGBColor(0xb2, 0x18, 0x2b))]
    #[case("000000", RGBColor(0, 0, 0))]
    fn test_parse_colour(#[case] hex: &str, #[case] expected: RGBColor) {
        let c = parse_colour(hex).unwrap();
        assert_eq!((c.0, c.1, c.2), (expected.0, expected.1, expected.2));
    }

    #[rstest]
    #[case("#12345")]
    #[case("#gggggg")]
    #[case("#ééé")]
    #[case("+12345")]
    fn test_bad_colour(#[case] hex: &str) {
        assert!(parse_colour(hex).is_err());
    }

    #[rstest]
    fn test_padded_range() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([2.0].into_iter()), 1.5..2.5);
        let r = padded_range([0.0, 10.0, f64::NAN].into_iter());
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
    }

    #[rstest]
    #[case(ChartKind::Scatter)]
    #[case(ChartKind::StratifiedScatter)]
    #[case(ChartKind::Bar)]
    fn test_render_writes_svg(#[case] kind: ChartKind) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        render_svg(&chart(kind), &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }

    #[rstest]
    fn test_render_empty_chart() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = chart(ChartKind::Scatter);
        spec.points.clear();
        spec.x_markers.clear();
        let path = dir.path().join("empty.svg");
        render_svg(&spec, &path).unwrap();
        assert!(path.exists());
    }
}
