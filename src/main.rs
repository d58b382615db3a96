use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use rasterstack::filters::{FilterParams, ParamValue};
use rasterstack::utils::codec::ExportFormat;
use rasterstack::utils::color::Pixel;
use rasterstack::utils::profiler::ScopeTimer;
use rasterstack::utils::vector::Vec2;
use rasterstack::{Document, EngineSettings};

/// Headless rasterstack driver.
///
/// Brush, layer, stroke, filter and history options are applied in the order
/// they appear on the command line; brush settings affect the strokes that
/// follow them.
#[derive(Parser, Debug)]
#[command(
    name = "rasterstack",
    about = "Paint and filter a layered image without a GUI",
    long_about = "Create or open an image, run a sequence of edits on it and save\n\
                  the flattened result.\n\n\
                  Example:\n  \
                  rasterstack --width 200 --height 100 --layer ink --color 255,0,0 \\\n    \
                  --size 5 --stroke 10:10|190:90 --filter gaussian_blur,radius=2 --out out.png"
)]
struct Args {
    /// Application settings JSON (canvas and performance sections).
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Image to open as the background layer.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["width", "height"])]
    open: Option<PathBuf>,

    /// Width of a new canvas (defaults to the settings).
    #[arg(long, value_name = "PX")]
    width: Option<usize>,

    /// Height of a new canvas (defaults to the settings).
    #[arg(long, value_name = "PX")]
    height: Option<usize>,

    /// Output image; the format follows the extension (png, jpg, tiff, bmp).
    #[arg(short, long, value_name = "FILE")]
    out: PathBuf,

    /// Brush diameter for the strokes that follow.
    #[arg(long, value_name = "PX")]
    size: Vec<f32>,

    /// Brush opacity (0-1) for the strokes that follow.
    #[arg(long, value_name = "0-1")]
    opacity: Vec<f32>,

    /// Brush colour for the strokes that follow.
    #[arg(long, value_name = "R,G,B[,A]", value_parser = parse_color)]
    color: Vec<Pixel>,

    /// Add a layer on top and select it.
    #[arg(long, value_name = "NAME")]
    layer: Vec<String>,

    /// Select a layer by index.
    #[arg(long, value_name = "INDEX")]
    select: Vec<usize>,

    /// Paint on the active layer.
    #[arg(long, value_name = "X:Y|X:Y...", value_parser = parse_path, allow_hyphen_values = true)]
    stroke: Vec<PointPath>,

    /// Erase on the active layer.
    #[arg(long, value_name = "X:Y|X:Y...", value_parser = parse_path, allow_hyphen_values = true)]
    erase: Vec<PointPath>,

    /// Apply a filter to the active layer, e.g. gaussian_blur,radius=3.
    #[arg(long, value_name = "NAME[,KEY=VALUE...]", value_parser = parse_filter)]
    filter: Vec<FilterSpec>,

    /// Undo this many steps.
    #[arg(long, value_name = "STEPS")]
    undo: Vec<usize>,

    /// Redo this many steps.
    #[arg(long, value_name = "STEPS")]
    redo: Vec<usize>,
}

#[derive(Debug, Clone)]
struct PointPath(Vec<Vec2>);

#[derive(Debug, Clone)]
struct FilterSpec {
    name: String,
    params: FilterParams,
}

#[derive(Debug)]
enum Op {
    Size(f32),
    Opacity(f32),
    Color(Pixel),
    AddLayer(String),
    Select(usize),
    Stroke(Vec<Vec2>),
    Erase(Vec<Vec2>),
    Filter(FilterSpec),
    Undo(usize),
    Redo(usize),
}

/// Brush settings in effect when a stroke runs.
#[derive(Debug, Clone, Copy)]
struct Brush {
    size: f32,
    opacity: f32,
    color: Pixel,
}

fn parse_points(text: &str) -> Result<Vec<Vec2>, String> {
    text.split('|')
        .filter(|s| !s.is_empty())
        .map(|pair| -> Result<Vec2, String> {
            let (x, y) = pair
                .split_once(':')
                .ok_or_else(|| format!("point '{pair}' is not X:Y"))?;
            let coord = |v: &str| v.trim().parse::<f32>().map_err(|e| format!("point '{pair}': {e}"));
            Ok(Vec2::new(coord(x)?, coord(y)?))
        })
        .collect()
}

fn parse_path(text: &str) -> Result<PointPath, String> {
    parse_points(text).map(PointPath)
}

fn parse_color(text: &str) -> Result<Pixel, String> {
    let channels = text
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("colour '{text}': {e}"))?;
    match channels.as_slice() {
        [r, g, b] => Ok(Pixel::rgb(*r, *g, *b)),
        [r, g, b, a] => Ok(Pixel::rgba(*r, *g, *b, *a)),
        _ => Err(format!("colour '{text}' must be R,G,B or R,G,B,A")),
    }
}

fn parse_filter(text: &str) -> Result<FilterSpec, String> {
    let mut parts = text.split(',');
    let name = parts.next().unwrap_or_default().trim().to_string();
    let mut params = FilterParams::new();
    for kv in parts {
        let (key, value) = kv
            .split_once('=')
            .ok_or_else(|| format!("filter parameter '{kv}' is not KEY=VALUE"))?;
        let value = if value.contains(':') {
            ParamValue::Points(parse_points(value)?)
        } else if let Ok(i) = value.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(f) = value.parse::<f64>() {
            ParamValue::Float(f)
        } else {
            ParamValue::Str(value.to_string())
        };
        params.insert(key.trim(), value);
    }
    Ok(FilterSpec { name, params })
}

/// Pair each value of option `id` with its position on the command line.
fn positioned<T>(matches: &ArgMatches, id: &str, values: Vec<T>, op: impl Fn(T) -> Op) -> Vec<(usize, Op)> {
    match matches.indices_of(id) {
        Some(indices) => indices.zip(values).map(|(i, v)| (i, op(v))).collect(),
        None => Vec::new(),
    }
}

/// Every edit option, in command-line order.
fn ordered_ops(matches: &ArgMatches, args: Args) -> Vec<Op> {
    let mut ops = Vec::new();
    ops.extend(positioned(matches, "size", args.size, Op::Size));
    ops.extend(positioned(matches, "opacity", args.opacity, Op::Opacity));
    ops.extend(positioned(matches, "color", args.color, Op::Color));
    ops.extend(positioned(matches, "layer", args.layer, Op::AddLayer));
    ops.extend(positioned(matches, "select", args.select, Op::Select));
    ops.extend(positioned(matches, "stroke", args.stroke, |p| Op::Stroke(p.0)));
    ops.extend(positioned(matches, "erase", args.erase, |p| Op::Erase(p.0)));
    ops.extend(positioned(matches, "filter", args.filter, Op::Filter));
    ops.extend(positioned(matches, "undo", args.undo, Op::Undo));
    ops.extend(positioned(matches, "redo", args.redo, Op::Redo));
    ops.sort_by_key(|(index, _)| *index);
    ops.into_iter().map(|(_, op)| op).collect()
}

fn load_settings(path: Option<&Path>) -> Result<EngineSettings, Box<dyn Error>> {
    match path {
        Some(path) => Ok(EngineSettings::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(EngineSettings::default()),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;
    let format = ExportFormat::from_path(&args.out)
        .ok_or_else(|| format!("cannot pick an image format for {}", args.out.display()))?;
    let mut settings = load_settings(args.settings.as_deref())?;
    let out = args.out.clone();

    let mut doc = match &args.open {
        Some(path) => Document::open(&std::fs::read(path)?, settings)?,
        None => {
            settings.default_width = args.width.unwrap_or(settings.default_width);
            settings.default_height = args.height.unwrap_or(settings.default_height);
            Document::new(settings)?
        }
    };
    log::info!("document is {}x{}", doc.width(), doc.height());

    let mut brush = Brush {
        size: 10.0,
        opacity: 1.0,
        color: Pixel::BLACK,
    };
    let _timer = ScopeTimer::new("ops");
    for op in ordered_ops(&matches, args) {
        log::debug!("{op:?}");
        match op {
            Op::Size(size) => brush.size = size,
            Op::Opacity(opacity) => brush.opacity = opacity,
            Op::Color(color) => brush.color = color,
            Op::AddLayer(name) => {
                doc.add_layer(&name)?;
            }
            Op::Select(index) => doc.set_active(index)?,
            Op::Stroke(points) => doc.paint_stroke(&points, brush.size, brush.opacity, brush.color)?,
            Op::Erase(points) => doc.erase_stroke(&points, brush.size, brush.opacity)?,
            Op::Filter(spec) => doc.apply_filter(&spec.name, &spec.params)?,
            Op::Undo(steps) => {
                for _ in 0..steps {
                    if !doc.undo() {
                        log::warn!("nothing to undo");
                        break;
                    }
                }
            }
            Op::Redo(steps) => {
                for _ in 0..steps {
                    if !doc.redo() {
                        log::warn!("nothing to redo");
                        break;
                    }
                }
            }
        }
    }

    std::fs::write(&out, doc.save(format)?)?;
    log::info!("wrote {} as {}", out.display(), format.label());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops_for(argv: &[&str]) -> Vec<Op> {
        let matches = Args::command().try_get_matches_from(argv).unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        ordered_ops(&matches, args)
    }

    #[test]
    fn definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn ops_keep_command_line_order() {
        let ops = ops_for(&[
            "rasterstack", "--out", "a.png", "--size", "3", "--stroke", "1:1|5:5",
            "--size", "9", "--layer", "ink", "--stroke", "2:2|6:6", "--undo", "1",
        ]);
        let kinds: Vec<String> = ops
            .iter()
            .map(|op| match op {
                Op::Size(s) => format!("size {s}"),
                Op::Stroke(p) => format!("stroke {}", p.len()),
                Op::AddLayer(n) => format!("layer {n}"),
                Op::Undo(n) => format!("undo {n}"),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, ["size 3", "stroke 2", "size 9", "layer ink", "stroke 2", "undo 1"]);
    }

    #[test]
    fn typed_values_are_checked_by_the_parser() {
        let bad = [
            vec!["rasterstack", "--out", "a.png", "--color", "300,0,0"],
            vec!["rasterstack", "--out", "a.png", "--stroke", "1:x"],
            vec!["rasterstack", "--out", "a.png", "--filter", "gaussian_blur,radius"],
            vec!["rasterstack", "--out", "a.png", "--open", "in.png", "--width", "5"],
            vec!["rasterstack", "--size", "3"],
        ];
        for argv in bad {
            assert!(Args::command().try_get_matches_from(&argv).is_err(), "{argv:?}");
        }
    }

    #[test]
    fn filter_values_are_typed() {
        let spec = parse_filter("smudge,size=4,strength=0.5,points=1:1|9:1").unwrap();
        assert_eq!(spec.name, "smudge");
        assert_eq!(spec.params.get("size"), Some(&ParamValue::Int(4)));
        assert_eq!(spec.params.get("strength"), Some(&ParamValue::Float(0.5)));
        assert_eq!(
            spec.params.get("points"),
            Some(&ParamValue::Points(vec![Vec2::new(1.0, 1.0), Vec2::new(9.0, 1.0)]))
        );
    }
}
