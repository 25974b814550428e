//! Command-line access to the clearance queries: dump the builtin scenarios, and measure how far a
//! point, a placed footprint, or a rectangle is from obstacles.

#[macro_use]
extern crate log;

mod logger;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;

use clearance::{
    distance_region_to_region, min_clearance, retry_once, ConvexPolygon, DistanceResult, Pt2D,
    Rectangle, Scenario, SolverSettings,
};

#[derive(StructOpt)]
#[structopt(name = "clearance", about = "Distances between convex regions")]
struct Args {
    /// The path to a JSON file with solver settings. Missing fields keep their defaults.
    #[structopt(long)]
    settings: Option<String>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Print a builtin scenario as JSON
    DumpScenario {
        /// One of the builtin scenarios, like "maze" or "s_path"
        #[structopt()]
        name: String,
    },
    /// Measure the distance from a point to every obstacle in a scenario
    Point {
        /// The name of a builtin scenario, or a path to a JSON scenario
        #[structopt(long, default_value = "maze")]
        scenario: String,
        #[structopt(long, allow_hyphen_values = true)]
        x: f64,
        #[structopt(long, allow_hyphen_values = true)]
        y: f64,
    },
    /// Place a footprint at a pose and measure its distance to every obstacle in a scenario
    Footprint {
        /// The name of a builtin scenario, or a path to a JSON scenario
        #[structopt(long, default_value = "maze")]
        scenario: String,
        #[structopt(long, allow_hyphen_values = true)]
        x: f64,
        #[structopt(long, allow_hyphen_values = true)]
        y: f64,
        /// Radians, counter-clockwise from +x
        #[structopt(long, allow_hyphen_values = true)]
        heading: f64,
        /// The footprint's vertices in its own frame, like "0.14,0;-0.03,0.05;-0.03,-0.05". If
        /// omitted, use a 0.15 by 0.06 rectangle with the rear axle 0.1 from the back.
        #[structopt(long, allow_hyphen_values = true)]
        vertices: Option<String>,
    },
    /// Measure the distance between two rectangles
    Pair {
        /// The first rectangle, as "left,right,down,up"
        #[structopt(long, allow_hyphen_values = true)]
        a: String,
        /// The second rectangle, as "left,right,down,up"
        #[structopt(long, allow_hyphen_values = true)]
        b: String,
    },
}

fn main() -> Result<()> {
    let args = Args::from_args();

    // Keep the output clean for piping
    if !matches!(args.cmd, Command::DumpScenario { .. }) {
        logger::setup();
    }

    let settings = match args.settings {
        Some(path) => load_settings(&path)?,
        None => SolverSettings::default(),
    };

    match args.cmd {
        Command::DumpScenario { name } => match Scenario::builtin(&name) {
            Some(scenario) => println!("{}", scenario?.to_json()?),
            None => bail!(
                "unknown scenario {}; try one of {:?}",
                name,
                Scenario::builtin_names()
            ),
        },
        Command::Point { scenario, x, y } => {
            let scenario = Scenario::load_or_builtin(&scenario)?;
            let pt = Pt2D::checked(x, y)?;
            let results = retry_once(&settings, |settings| {
                clearance::clearances_from_point(pt, &scenario.obstacles, settings)
            })?;
            print_clearances(&scenario, &results);
        }
        Command::Footprint {
            scenario,
            x,
            y,
            heading,
            vertices,
        } => {
            let scenario = Scenario::load_or_builtin(&scenario)?;
            if !(x.is_finite() && y.is_finite() && heading.is_finite()) {
                bail!("bad pose ({}, {}, {})", x, y, heading);
            }
            let footprint = match vertices {
                Some(raw) => ConvexPolygon::new(parse_vertices(&raw)?)?,
                None => ConvexPolygon::rectangle_footprint(0.15, 0.06, 0.1)?,
            };
            let placed = footprint.placed(x, y, heading);
            info!("Footprint at ({}, {}, {}) is {}", x, y, heading, placed);
            let results = retry_once(&settings, |settings| {
                clearance::clearances_from_region(&placed, &scenario.obstacles, settings)
            })?;
            print_clearances(&scenario, &results);
        }
        Command::Pair { a, b } => {
            let a = parse_rectangle(&a)?;
            let b = parse_rectangle(&b)?;
            let result = retry_once(&settings, |settings| {
                distance_region_to_region(&a, &b, settings)
            })?;
            println!(
                "{} between {} and {} ({} iterations)",
                result.distance, result.closest_a, result.closest_b, result.iterations
            );
        }
    }
    Ok(())
}

fn load_settings(path: &str) -> Result<SolverSettings> {
    let raw = fs_err::read_to_string(path)?;
    let settings: SolverSettings =
        serde_json::from_str(&raw).with_context(|| format!("parsing settings {}", path))?;
    settings.validate()?;
    Ok(settings)
}

fn print_clearances(scenario: &Scenario, results: &[DistanceResult]) {
    for (idx, (obstacle, result)) in scenario.obstacles.iter().zip(results).enumerate() {
        println!(
            "{:>3}  {:<12}  {} ({} iterations)",
            idx,
            result.distance.to_string(),
            obstacle,
            result.iterations
        );
    }
    if let Some((idx, result)) = min_clearance(results) {
        println!(
            "Nearest obstacle in {} is #{}, {} away, closest at {}",
            scenario.name, idx, result.distance, result.closest_b
        );
    }
}

fn parse_numbers(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|x| {
            x.trim()
                .parse::<f64>()
                .with_context(|| format!("bad number {:?} in {:?}", x, raw))
        })
        .collect()
}

fn parse_rectangle(raw: &str) -> Result<Rectangle> {
    let nums = parse_numbers(raw)?;
    if nums.len() != 4 {
        bail!("a rectangle needs left,right,down,up, not {:?}", raw);
    }
    Ok(Rectangle::new(nums[0], nums[1], nums[2], nums[3])?)
}

fn parse_vertices(raw: &str) -> Result<Vec<Pt2D>> {
    raw.split(';')
        .map(|pair| -> Result<Pt2D> {
            let nums = parse_numbers(pair)?;
            if nums.len() != 2 {
                bail!("a vertex needs x,y, not {:?}", pair);
            }
            Ok(Pt2D::checked(nums[0], nums[1])?)
        })
        .collect()
}
