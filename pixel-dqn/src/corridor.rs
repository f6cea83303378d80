//! A side-scrolling corridor rendering RGB frames.
use anyhow::Result;
use image::{Rgb, RgbImage};
use log::trace;
use pixel_dqn_core::{error::PixelDqnError, DiscreteAct, Env, Observation};
use pixel_dqn_frame::Frame;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

const SKY: Rgb<u8> = Rgb([135, 206, 235]);
const GROUND: Rgb<u8> = Rgb([120, 72, 0]);
const OBSTACLE: Rgb<u8> = Rgb([200, 30, 30]);
const PLAYER: Rgb<u8> = Rgb([20, 40, 220]);
const GOAL: Rgb<u8> = Rgb([250, 220, 0]);

/// Reward for reaching a cell never reached before in the episode.
const PROGRESS_REWARD: f32 = 1.0;
const CRASH_REWARD: f32 = -1.0;
const GOAL_REWARD: f32 = 5.0;

/// Actions of [`Corridor`].
pub const LEFT: usize = 0;
/// Moves two cells to the right, clearing one obstacle.
pub const JUMP: usize = 1;
/// Moves one cell to the right.
pub const RIGHT: usize = 2;

/// Configuration of [`Corridor`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CorridorConfig {
    /// The number of cells from the start to the goal.
    pub length: usize,

    /// Probability that a cell holds an obstacle.
    pub obstacle_rate: f64,

    /// Height of the frames in pixels.
    pub height: usize,

    /// Width of the frames in pixels.
    pub width: usize,

    /// Side of a cell in pixels.
    pub cell_size: usize,
}

impl Default for CorridorConfig {
    /// 800 × 600 frames made of 100 pixel cells.
    fn default() -> Self {
        Self {
            length: 30,
            obstacle_rate: 0.2,
            height: 600,
            width: 800,
            cell_size: 100,
        }
    }
}

impl CorridorConfig {
    /// Sets the length of the corridor.
    pub fn length(mut self, v: usize) -> Self {
        self.length = v;
        self
    }

    /// Sets the probability of obstacles.
    pub fn obstacle_rate(mut self, v: f64) -> Self {
        self.obstacle_rate = v;
        self
    }

    /// Sets the size of frames and cells in pixels.
    pub fn frame_size(mut self, height: usize, width: usize, cell_size: usize) -> Self {
        self.height = height;
        self.width = width;
        self.cell_size = cell_size;
        self
    }

    /// Constructs [`CorridorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CorridorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    fn validate(&self) -> Result<(), PixelDqnError> {
        if self.length < 2 {
            return Err(PixelDqnError::Config("length must be at least 2".into()));
        }
        if self.cell_size == 0 || self.height < 2 * self.cell_size || self.width < self.cell_size {
            return Err(PixelDqnError::Config(format!(
                "A {}x{} frame cannot show cells of {} pixels",
                self.height, self.width, self.cell_size
            )));
        }
        if !(0.0..=1.0).contains(&self.obstacle_rate) {
            return Err(PixelDqnError::Config(format!(
                "obstacle_rate must be in [0, 1], got {}",
                self.obstacle_rate
            )));
        }
        Ok(())
    }
}

/// A corridor of cells with obstacles on the ground.
///
/// The player starts at cell 0 and the goal is the last cell. Actions are
/// [`LEFT`], [`JUMP`] and [`RIGHT`]. Landing on an obstacle ends the episode.
/// The frame shows the cells around the player with the ground on the bottom row.
/// Obstacles never stand next to each other, so every layout can be cleared.
pub struct Corridor {
    config: CorridorConfig,
    obstacles: Vec<bool>,
    pos: usize,
    max_pos: usize,
    reward: f32,
    is_done: bool,
    rng: SmallRng,
}

impl Corridor {
    fn generate_obstacles(&mut self) {
        let n = self.config.length;
        let mut obstacles = vec![false; n];
        for i in 2..n.saturating_sub(1) {
            if !obstacles[i - 1] && self.rng.gen::<f64>() < self.config.obstacle_rate {
                obstacles[i] = true;
            }
        }
        self.obstacles = obstacles;
    }

    fn goal(&self) -> usize {
        self.config.length - 1
    }

    /// Position of the player.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Cells holding an obstacle.
    pub fn obstacles(&self) -> &[bool] {
        &self.obstacles
    }

    fn move_to(&mut self, pos: usize) {
        self.pos = pos.min(self.goal());
        if self.obstacles[self.pos] {
            self.reward += CRASH_REWARD;
            self.is_done = true;
            return;
        }
        if self.pos > self.max_pos {
            self.reward += PROGRESS_REWARD * (self.pos - self.max_pos) as f32;
            self.max_pos = self.pos;
        }
        if self.pos == self.goal() {
            self.reward += GOAL_REWARD;
            self.is_done = true;
        }
    }

    fn fill_cell(img: &mut RgbImage, col: usize, row: usize, size: usize, color: Rgb<u8>) {
        let (w, h) = img.dimensions();
        for y in row * size..(row + 1) * size {
            for x in col * size..(col + 1) * size {
                if (x as u32) < w && (y as u32) < h {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    /// Renders the cells around the player.
    pub fn render(&self) -> Result<Frame> {
        let size = self.config.cell_size;
        let n_cols = self.config.width / size;
        let n_rows = self.config.height / size;
        let ground_row = n_rows - 1;
        let first = self.pos.saturating_sub(n_cols / 4);
        let mut img = RgbImage::from_pixel(self.config.width as u32, self.config.height as u32, SKY);

        for col in 0..n_cols {
            Self::fill_cell(&mut img, col, ground_row, size, GROUND);
            let cell = first + col;
            if cell >= self.config.length {
                continue;
            }
            if self.obstacles[cell] {
                Self::fill_cell(&mut img, col, ground_row - 1, size, OBSTACLE);
            } else if cell == self.goal() {
                Self::fill_cell(&mut img, col, ground_row - 1, size, GOAL);
            }
            if cell == self.pos {
                Self::fill_cell(&mut img, col, ground_row - 1, size, PLAYER);
            }
        }

        Frame::from_rgb_image(&img)
    }
}

impl Env for Corridor {
    type Config = CorridorConfig;
    type Obs = Frame;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        config.validate()?;
        let mut env = Self {
            config: config.clone(),
            obstacles: vec![],
            pos: 0,
            max_pos: 0,
            reward: 0.0,
            is_done: false,
            rng: SmallRng::seed_from_u64(seed as u64),
        };
        env.generate_obstacles();
        Ok(env)
    }

    /// Starts a new episode on a new layout.
    fn reset(&mut self) -> Result<()> {
        self.generate_obstacles();
        self.pos = 0;
        self.max_pos = 0;
        self.reward = 0.0;
        self.is_done = false;
        Ok(())
    }

    fn observe(&mut self) -> Result<Observation<Frame>> {
        let reward = std::mem::replace(&mut self.reward, 0.0);
        Ok(Observation {
            obs: self.render()?,
            reward,
            is_done: self.is_done,
        })
    }

    fn apply(&mut self, act: &DiscreteAct) -> Result<()> {
        if self.is_done {
            return Ok(());
        }
        match act.index() {
            LEFT => self.move_to(self.pos.saturating_sub(1)),
            JUMP => self.move_to(self.pos + 2),
            RIGHT => self.move_to(self.pos + 1),
            a => {
                return Err(PixelDqnError::InvalidInput(format!("Unknown action {}", a)).into());
            }
        }
        trace!("pos = {}, reward = {}", self.pos, self.reward);
        Ok(())
    }

    fn n_actions(&self) -> usize {
        3
    }
}
