//! Demo session against a counting bus
//!
//! Replays the Waveshare demo loop: a producer redraws a handful of lines,
//! a rectangle and a jittered pixel in a fresh color, and every few producer
//! steps toggles inversion and rotates the panel. The consumer drains one
//! instruction per tick, so instructions still queued at a rotation are
//! discarded.

use ili9340_display::{
    BusError, ControlLine, Display, DisplayBus, DisplayError, Level, PanelConfig, Rgb565,
};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Bus that only counts traffic
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountingBus {
    data_command: Option<Level>,
    /// Write calls of any kind
    pub writes: usize,
    /// Write calls carrying pixel or parameter data
    pub data_writes: usize,
    pub command_bytes: usize,
    pub data_bytes: usize,
    /// Largest single write seen
    pub largest_write: usize,
    /// Total requested delay
    pub delay_ms: u64,
}

impl DisplayBus for CountingBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.writes += 1;
        self.largest_write = self.largest_write.max(bytes.len());
        match self.data_command {
            Some(Level::Low) => self.command_bytes += bytes.len(),
            _ => {
                self.data_writes += 1;
                self.data_bytes += bytes.len();
            }
        }
        Ok(())
    }

    fn set_control_line(&mut self, line: ControlLine, level: Level) -> Result<(), BusError> {
        if line == ControlLine::DataCommand {
            self.data_command = Some(level);
        }
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ms += u64::from(ms);
    }
}

/// Demo loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoOptions {
    /// Consumer ticks to simulate
    pub ticks: u32,
    /// Run the producer every N consumer ticks
    pub producer_every: u32,
    /// Invert and rotate every N producer steps (0 disables)
    pub rotate_every: u32,
    /// Seed for colors and pixel jitter
    pub seed: u64,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            ticks: 1_000,
            producer_every: 100,
            rotate_every: 10,
            seed: 0x9340,
        }
    }
}

/// What a session did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u32,
    pub producer_steps: u32,
    pub enqueued: usize,
    pub dropped: usize,
    pub drained: usize,
    pub discarded: usize,
    pub rotations: u32,
    pub peak_pending: usize,
    pub bus: CountingBus,
}

/// Run the demo loop and return the traffic it produced
pub fn run_demo(config: PanelConfig, options: &DemoOptions) -> Result<SessionStats, DisplayError> {
    let mut display = Display::new(CountingBus::default(), config)?;
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut stats = SessionStats::default();
    let mut inverted = false;

    display.init()?;
    let color = Rgb565(rng.gen());
    record(&mut stats, display.fill_screen(color));

    let producer_every = options.producer_every.max(1);
    for tick in 0..options.ticks {
        if display.drain_one()? {
            stats.drained += 1;
        }

        if tick % producer_every == 0 {
            stats.producer_steps += 1;
            produce(&mut display, &mut rng, &mut stats);

            if options.rotate_every > 0 && stats.producer_steps % options.rotate_every == 0 {
                inverted = !inverted;
                display.invert(inverted)?;

                stats.discarded += display.pending();
                display.rotate(display.rotation().next())?;
                stats.rotations += 1;
            }
        }

        stats.peak_pending = stats.peak_pending.max(display.pending());
        stats.ticks += 1;
    }

    debug!(
        "session ended with {} pending instructions ({} bytes)",
        display.pending(),
        display.pending_bytes()
    );
    stats.bus = display.shutdown();
    Ok(stats)
}

fn produce<B: DisplayBus>(display: &mut Display<B>, rng: &mut StdRng, stats: &mut SessionStats) {
    let color = Rgb565(rng.gen());
    let x = rng.gen_range(170..200);
    let y = rng.gen_range(170..200);

    record(stats, display.draw_pixel(x, y, color));
    for offset in [10, 30, 50] {
        record(stats, display.draw_hline(offset, offset, 100, color));
    }
    for offset in [10, 30, 50] {
        record(stats, display.draw_vline(offset, offset, 100, color));
    }
    record(stats, display.fill_rect(70, 70, 50, 50, color));
}

fn record(stats: &mut SessionStats, enqueued: bool) {
    if enqueued {
        stats.enqueued += 1;
    } else {
        stats.dropped += 1;
    }
}
