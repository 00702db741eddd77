//! Line-oriented filter scripts.
//!
//! A script lists one operation per line, each followed by optional
//! whitespace-separated arguments:
//!
//! ```text
//! # denoise, then detect edges
//! median
//! gauss 1.5
//! ced 1.4142 20
//! ```
//!
//! | keyword | arguments (defaults) |
//! |---------|----------------------|
//! | `threshold` | `[value=0]` |
//! | `uniform_noise` | `[range=32]` |
//! | `salt_n_pepper` | `[density=0.05]` |
//! | `normalize`, `equalize`, `invert`, `hflip`, `absolute` | |
//! | `median`, `average`, `nagao`, `operator_39`, `sharpening` | |
//! | `internal_contour`, `uniform_contour` | |
//! | `prewitt`, `sobel` | `[mod\|phase=mod]` |
//! | `gauss`, `dog` | `[sigma=1] [dim=0]` |
//! | `ced` | `[sigma=√2] [low=25] [high=ratio*low]` |
//!
//! Blank lines and lines starting with `#` are ignored.

use std::f64::consts::SQRT_2;
use std::str::FromStr;

use thiserror::Error;

use crate::config::Config;
use crate::error::FilterError;
use crate::filters::basic::{absolute, equalize, hflip, invert, normalize, threshold};
use crate::filters::blur::{dog, gauss, sharpen};
use crate::filters::contour::{internal_contour, uniform_contour};
use crate::filters::edge::{edges_with, operator_39, prewitt, sobel, EdgeOptions, GradientOutput};
use crate::filters::noise::{
    add_salt_pepper_noise, add_uniform_noise, average, median, nagao, SimpleRng,
};
use crate::grid::PixelGrid;

/// Errors raised while parsing or running a script. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command {keyword:?}")]
    UnknownCommand { line: usize, keyword: String },

    #[error("line {line}: {message}")]
    BadArgument { line: usize, message: String },

    #[error("line {line}: {source}")]
    Filter {
        line: usize,
        #[source]
        source: FilterError,
    },
}

/// One parsed script operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Threshold(i32),
    UniformNoise(i32),
    SaltAndPepper(f64),
    Normalize,
    Equalize,
    Invert,
    Hflip,
    Absolute,
    Median,
    Average,
    Nagao,
    Operator39,
    Sharpening,
    InternalContour,
    UniformContour,
    Prewitt(GradientOutput),
    Sobel(GradientOutput),
    Gauss { sigma: f64, dim: usize },
    Dog { sigma: f64, dim: usize },
    /// Edge pipeline; without `high` the session ratio applies.
    Ced { sigma: f64, low: i32, high: Option<i32> },
}

/// Argument list of one line.
struct Args<'a> {
    line: usize,
    keyword: &'a str,
    values: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn invalid(&self, raw: &str) -> ScriptError {
        ScriptError::BadArgument {
            line: self.line,
            message: format!("{}: invalid argument {:?}", self.keyword, raw),
        }
    }

    fn get<T: FromStr>(&self, index: usize, default: T) -> Result<T, ScriptError> {
        match self.values.get(index) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| self.invalid(raw)),
        }
    }

    fn optional<T: FromStr>(&self, index: usize) -> Result<Option<T>, ScriptError> {
        match self.values.get(index) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| self.invalid(raw)),
        }
    }

    /// Fail if more than `max` arguments were given.
    fn at_most(&self, max: usize) -> Result<(), ScriptError> {
        if self.values.len() > max {
            return Err(ScriptError::BadArgument {
                line: self.line,
                message: format!(
                    "{} takes at most {} argument(s), got {}",
                    self.keyword,
                    max,
                    self.values.len()
                ),
            });
        }
        Ok(())
    }

    fn gradient_output(&self) -> Result<GradientOutput, ScriptError> {
        match self.values.first().copied() {
            None | Some("mod") => Ok(GradientOutput::Magnitude),
            Some("phase") => Ok(GradientOutput::Phase),
            Some(other) => Err(ScriptError::BadArgument {
                line: self.line,
                message: format!("{}: expected mod or phase, got {:?}", self.keyword, other),
            }),
        }
    }
}

impl Command {
    /// Parse one non-blank, non-comment line.
    fn parse_line(line: usize, text: &str) -> Result<Command, ScriptError> {
        let mut tokens = text.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        let args = Args {
            line,
            keyword,
            values: tokens.collect(),
        };

        let (command, max_args) = match keyword {
            "threshold" => (Command::Threshold(args.get(0, 0)?), 1),
            "uniform_noise" => (Command::UniformNoise(args.get(0, 32)?), 1),
            "salt_n_pepper" => (Command::SaltAndPepper(args.get(0, 0.05)?), 1),
            "normalize" => (Command::Normalize, 0),
            "equalize" => (Command::Equalize, 0),
            "invert" => (Command::Invert, 0),
            "hflip" => (Command::Hflip, 0),
            "absolute" => (Command::Absolute, 0),
            "median" => (Command::Median, 0),
            "average" => (Command::Average, 0),
            "nagao" => (Command::Nagao, 0),
            "operator_39" => (Command::Operator39, 0),
            "sharpening" => (Command::Sharpening, 0),
            "internal_contour" => (Command::InternalContour, 0),
            "uniform_contour" => (Command::UniformContour, 0),
            "prewitt" => (Command::Prewitt(args.gradient_output()?), 1),
            "sobel" => (Command::Sobel(args.gradient_output()?), 1),
            "gauss" => (
                Command::Gauss {
                    sigma: args.get(0, 1.0)?,
                    dim: args.get(1, 0)?,
                },
                2,
            ),
            "dog" => (
                Command::Dog {
                    sigma: args.get(0, 1.0)?,
                    dim: args.get(1, 0)?,
                },
                2,
            ),
            "ced" => (
                Command::Ced {
                    sigma: args.get(0, SQRT_2)?,
                    low: args.get(1, 25)?,
                    high: args.optional(2)?,
                },
                3,
            ),
            other => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    keyword: other.to_string(),
                })
            }
        };
        args.at_most(max_args)?;
        Ok(command)
    }
}

/// State carried across the commands of a run.
pub struct Session {
    rng: SimpleRng,
    ced_threshold_ratio: f64,
    edges: EdgeOptions,
}

impl Session {
    pub fn new(seed: u64, ced_threshold_ratio: f64, edges: EdgeOptions) -> Self {
        Session {
            rng: SimpleRng::new(seed),
            ced_threshold_ratio,
            edges,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Session::new(
            config.script.seed,
            config.script.ced_threshold_ratio,
            config.edges.clone(),
        )
    }

    /// Seed for the next noise command; successive commands draw fresh noise.
    fn next_seed(&mut self) -> u64 {
        u64::from(self.rng.next_u32())
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::from_config(&Config::default())
    }
}

/// A parsed script: commands with their source line numbers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    commands: Vec<(usize, Command)>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Script, ScriptError> {
        let mut commands = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            commands.push((i + 1, Command::parse_line(i + 1, trimmed)?));
        }
        Ok(Script { commands })
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> + '_ {
        self.commands.iter().map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every command in order, each to the previous result.
    pub fn run(&self, grid: &PixelGrid, session: &mut Session) -> Result<PixelGrid, ScriptError> {
        let mut current = grid.clone();
        for (line, command) in &self.commands {
            log::info!("line {}: {:?}", line, command);
            current = apply(command, &current, session).map_err(|source| ScriptError::Filter {
                line: *line,
                source,
            })?;
        }
        Ok(current)
    }
}

fn apply(command: &Command, grid: &PixelGrid, session: &mut Session) -> Result<PixelGrid, FilterError> {
    let out = match *command {
        Command::Threshold(value) => threshold(grid, value),
        Command::UniformNoise(range) => add_uniform_noise(grid, range, session.next_seed()),
        Command::SaltAndPepper(density) => {
            add_salt_pepper_noise(grid, density, session.next_seed())?
        }
        Command::Normalize => normalize(grid),
        Command::Equalize => equalize(grid)?,
        Command::Invert => invert(grid),
        Command::Hflip => hflip(grid),
        Command::Absolute => absolute(grid),
        Command::Median => median(grid)?,
        Command::Average => average(grid)?,
        Command::Nagao => nagao(grid)?,
        Command::Operator39 => operator_39(grid)?,
        Command::Sharpening => sharpen(grid)?,
        Command::InternalContour => internal_contour(grid)?,
        Command::UniformContour => uniform_contour(grid)?,
        Command::Prewitt(output) => prewitt(grid, output)?,
        Command::Sobel(output) => sobel(grid, output)?,
        Command::Gauss { sigma, dim } => gauss(grid, sigma, dim)?,
        Command::Dog { sigma, dim } => dog(grid, sigma, dim)?,
        Command::Ced { sigma, low, high } => {
            let high = high.unwrap_or_else(|| (low as f64 * session.ced_threshold_ratio) as i32);
            let options = EdgeOptions {
                sigma,
                threshold_high: high,
                threshold_low: low,
                ..session.edges.clone()
            };
            edges_with(grid, &options)?
        }
    };
    Ok(out)
}
