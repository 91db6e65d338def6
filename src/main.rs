use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use av_mvsearch::{
    AnalysisOptions, ClipResults, CostMetric, MotionVector, SearchType, analyze_clip,
};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about = "Block motion estimation between consecutive y4m frames")]
struct Args {
    /// Sets the input file to use, `-` for stdin
    input: String,

    /// File to write results in
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Include every frame pair's vector field in the results
    #[arg(long)]
    vectors: bool,

    /// Stop after this many frames
    #[arg(long)]
    limit: Option<usize>,

    /// Block width and height
    #[arg(long, short, default_value_t = 8)]
    blksize: usize,

    /// Overlap between neighboring blocks, at most half the block size
    #[arg(long, default_value_t = 0)]
    overlap: usize,

    /// Sub-pixel precision: 1, 2 or 4
    #[arg(long, default_value_t = 2)]
    pel: usize,

    /// Maximum number of pyramid levels, 0 for as many as fit
    #[arg(long, default_value_t = 0)]
    levels: usize,

    /// Search strategy: 0 onetime, 1 n-step, 2 diamond, 3 exhaustive,
    /// 4 hex, 5 umh, 6 horizontal, 7 vertical
    #[arg(long, short, default_value_t = 4)]
    search: u8,

    /// Search radius of the intermediate levels
    #[arg(long, default_value_t = 2)]
    search_param: i32,

    /// Search radius of the finest level, in pel units
    #[arg(long, default_value_t = 0)]
    pel_search: i32,

    /// Bias vectors towards their neighbors
    #[arg(long)]
    true_motion: bool,

    /// Use SATD instead of SAD as the luma cost
    #[arg(long)]
    satd: bool,

    /// Ignore chroma when matching blocks
    #[arg(long)]
    no_chroma: bool,

    /// Use the previous pair's vectors as predictors
    #[arg(long)]
    temporal: bool,
}

impl Args {
    fn analysis_options(&self) -> Result<AnalysisOptions> {
        let base = if self.true_motion {
            AnalysisOptions::true_motion()
        } else {
            AnalysisOptions::default()
        };
        let search_type = SearchType::from_index(self.search)
            .with_context(|| format!("unknown search type {}", self.search))?;

        Ok(AnalysisOptions {
            blk_size_x: self.blksize,
            blk_size_y: self.blksize,
            overlap_x: self.overlap,
            overlap_y: self.overlap,
            pel: self.pel,
            levels: self.levels,
            search_type,
            search_param: self.search_param,
            pel_search: self.pel_search,
            chroma: !self.no_chroma,
            metric: if self.satd {
                CostMetric::Satd
            } else {
                CostMetric::Sad
            },
            temporal: self.temporal,
            ..base
        })
    }
}

/// Per-pair statistics without the vector fields.
#[derive(Serialize)]
struct PairSummary {
    global: MotionVector,
    plane_sad: f64,
    mean_cost: f32,
    mean_luma_change: f32,
    scene_change: bool,
}

#[derive(Serialize)]
struct Summary {
    pairs: Vec<PairSummary>,
    frame_count: usize,
    speed: f64,
}

impl From<&ClipResults> for Summary {
    fn from(results: &ClipResults) -> Self {
        Self {
            pairs: results
                .pairs
                .iter()
                .map(|pair| PairSummary {
                    global: pair.global,
                    plane_sad: pair.plane_sad,
                    mean_cost: pair.field.mean_cost(),
                    mean_luma_change: pair.mean_luma_change,
                    scene_change: pair.scene_change,
                })
                .collect(),
            frame_count: results.frame_count,
            speed: results.speed,
        }
    }
}

#[cfg(feature = "devel")]
fn init_logger() -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => console::style("error").red(),
                log::Level::Warn => console::style("warn").yellow(),
                log::Level::Info => console::style("info").green(),
                log::Level::Debug => console::style("debug").cyan(),
                log::Level::Trace => console::style("trace").dim(),
            };
            out.finish(format_args!("[{}] {}: {}", level, record.target(), message))
        })
        .level(log::LevelFilter::Debug)
        .chain(io::stderr())
        .apply()
        .context("failed to install logger")
}

fn main() -> Result<()> {
    #[cfg(feature = "devel")]
    init_logger()?;

    #[cfg(feature = "tracing")]
    let _guard = {
        use tracing_subscriber::prelude::*;

        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
        tracing_subscriber::registry().with(chrome_layer).init();
        guard
    };

    let args = Args::parse();
    let opts = args.analysis_options()?;

    let input = match args.input.as_str() {
        "-" => Box::new(io::stdin()) as Box<dyn Read>,
        f => Box::new(File::open(f).with_context(|| format!("failed to open {}", f))?)
            as Box<dyn Read>,
    };
    let mut reader = BufReader::new(input);
    let mut dec = y4m::Decoder::new(&mut reader).context("failed to parse y4m header")?;

    let results: ClipResults = match dec.get_bit_depth() {
        8 => analyze_clip::<_, u8>(&mut dec, &opts, args.limit, None)?,
        _ => analyze_clip::<_, u16>(&mut dec, &opts, args.limit, None)?,
    };
    eprintln!(
        "{} frames, {} scene changes, {:.2} fps",
        results.frame_count,
        results.pairs.iter().filter(|pair| pair.scene_change).count(),
        results.speed
    );

    let output = if args.vectors {
        serde_json::to_string_pretty(&results)
    } else {
        serde_json::to_string_pretty(&Summary::from(&results))
    }
    .context("failed to serialize results")?;
    match args.output {
        Some(path) => File::create(&path)
            .and_then(|mut file| file.write_all(output.as_bytes()))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", output),
    }

    Ok(())
}
