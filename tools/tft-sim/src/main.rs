//! TFT Simulator
//!
//! Host-side tooling for the ILI9340 transfer engine. Runs the engine against
//! simulated buses so the exact SPI traffic of a drawing session can be
//! inspected without a panel attached.
//!
//! # Usage
//!
//! ```bash
//! # Replay the demo loop and print transfer statistics
//! tft-sim demo --ticks 5000 --rotate-every 10
//!
//! # Show the bus trace of a single fill
//! tft-sim trace --x 230 --y 0 --w 50 --h 10 --color 0xFFFF
//!
//! # Same rectangle through the frame buffer path
//! tft-sim trace --x 230 --y 0 --w 50 --h 10 --color 0xFFFF --buffer
//!
//! # List the rotation modes of the configured panel
//! tft-sim rotations
//!
//! # Generate or check a configuration file
//! tft-sim config generate -o tft-sim.toml
//! tft-sim config check tft-sim.toml
//! ```

mod config;
mod sim;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use config::SimConfig;
use ili9340_display::display::ili9340::cmd;
use ili9340_display::{BusOp, Display, Level, RecordingBus, Rgb565, Rotation};
use sim::{run_demo, SessionStats};

/// TFT Simulator
///
/// Inspect the SPI traffic of the ILI9340 transfer engine
#[derive(Parser)]
#[command(name = "tft-sim")]
#[command(version = "0.1.0")]
#[command(about = "Simulator and protocol tracer for ILI9340 SPI panels")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the demo loop and report bus traffic
    Demo {
        /// Consumer ticks to simulate
        #[arg(short, long)]
        ticks: Option<u32>,

        /// Run the producer every N ticks
        #[arg(short, long)]
        producer_every: Option<u32>,

        /// Invert and rotate every N producer steps (0 disables)
        #[arg(short, long)]
        rotate_every: Option<u32>,

        /// Seed for colors and pixel jitter
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Print the bus trace of one filled rectangle
    Trace {
        #[arg(long)]
        x: u16,

        #[arg(long)]
        y: u16,

        #[arg(long)]
        w: u16,

        #[arg(long)]
        h: u16,

        /// RGB565 color, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_color, default_value = "0xFFFF")]
        color: u16,

        /// Draw through the frame buffer and flush instead of the queue
        #[arg(long)]
        buffer: bool,
    },

    /// List rotation modes with their dimensions and MADCTL bytes
    Rotations,

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Generate a configuration file with the defaults
    Generate {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        path: PathBuf,
    },
}

fn parse_color(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid RGB565 color '{}': {}", value, e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Demo {
            ticks,
            producer_every,
            rotate_every,
            seed,
        } => {
            let mut config = SimConfig::load_or_default(cli.config.as_deref())?;
            if let Some(ticks) = ticks {
                config.demo.ticks = ticks;
            }
            if let Some(producer_every) = producer_every {
                config.demo.producer_every = producer_every;
            }
            if let Some(rotate_every) = rotate_every {
                config.demo.rotate_every = rotate_every;
            }
            if let Some(seed) = seed {
                config.demo.seed = seed;
            }
            handle_demo(&config)
        }
        Commands::Trace {
            x,
            y,
            w,
            h,
            color,
            buffer,
        } => {
            let config = SimConfig::load_or_default(cli.config.as_deref())?;
            handle_trace(&config, x, y, w, h, Rgb565(color), buffer)
        }
        Commands::Rotations => {
            let config = SimConfig::load_or_default(cli.config.as_deref())?;
            handle_rotations(&config);
            Ok(())
        }
        Commands::Config(command) => handle_config(command),
    }
}

fn handle_demo(config: &SimConfig) -> Result<()> {
    let (width, height) = config.panel.dimensions();
    println!("{}", "=".repeat(60));
    println!("{}", "Demo Session".cyan().bold());
    println!("{}", "=".repeat(60));
    println!(
        "  Panel: {}x{} at {}°, max chunk {} bytes",
        width,
        height,
        config.panel.rotation.degrees(),
        config.panel.max_chunk
    );
    println!(
        "  Ticks: {}, producer every {}, rotate every {}",
        config.demo.ticks, config.demo.producer_every, config.demo.rotate_every
    );

    let stats = run_demo(config.panel.clone(), &config.demo).context("Demo session failed")?;
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &SessionStats) {
    println!("\n{}", "Queue:".white().bold());
    println!("  Producer steps:   {}", stats.producer_steps);
    println!("  Enqueued:         {}", stats.enqueued);
    println!("  Dropped (clip):   {}", stats.dropped);
    println!("  Drained:          {}", stats.drained);
    println!(
        "  Discarded:        {}",
        if stats.discarded > 0 {
            stats.discarded.to_string().yellow()
        } else {
            stats.discarded.to_string().normal()
        }
    );
    println!("  Rotations:        {}", stats.rotations);
    println!("  Peak pending:     {}", stats.peak_pending);

    println!("\n{}", "Bus:".white().bold());
    println!("  Write calls:      {}", stats.bus.writes);
    println!("  Data writes:      {}", stats.bus.data_writes);
    println!("  Command bytes:    {}", stats.bus.command_bytes);
    println!("  Data bytes:       {}", stats.bus.data_bytes);
    println!("  Largest write:    {}", stats.bus.largest_write);
    println!("  Delays:           {} ms", stats.bus.delay_ms);
    println!("\n{}", "=".repeat(60));
}

fn handle_trace(
    config: &SimConfig,
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    color: Rgb565,
    buffer: bool,
) -> Result<()> {
    let mut display = Display::new(RecordingBus::new(), config.panel.clone())?;

    let sent = if buffer {
        display.buffer_fill_rect(x, y, w, h, color);
        display.flush()?.is_some()
    } else {
        display.fill_rect(x, y, w, h, color);
        display.drain_one()?
    };

    println!(
        "{}",
        format!(
            "Trace: ({}, {}) {}x{} color 0x{:04X} via {}",
            x,
            y,
            w,
            h,
            color.0,
            if buffer { "frame buffer" } else { "queue" }
        )
        .cyan()
        .bold()
    );
    if !sent {
        println!(
            "  {}",
            format!(
                "Nothing sent: rectangle is outside the {}x{} panel or unchanged",
                display.width(),
                display.height()
            )
            .yellow()
        );
        return Ok(());
    }

    for op in display.bus().ops() {
        print_op(op);
    }
    println!(
        "\n  {} write calls, {} data bytes",
        display.bus().write_count(),
        display
            .bus()
            .data_writes()
            .iter()
            .map(|w| w.len())
            .sum::<usize>()
    );
    Ok(())
}

fn print_op(op: &BusOp) {
    match op {
        BusOp::Command(byte) => {
            println!("  {} 0x{:02X} {}", "CMD ".green().bold(), byte, command_name(*byte))
        }
        BusOp::Data(bytes) if bytes.len() <= 8 => {
            println!("  {} {}", "DATA".blue(), hex(bytes));
        }
        BusOp::Data(bytes) => {
            println!(
                "  {} {} bytes [{} ...]",
                "DATA".blue(),
                bytes.len(),
                hex(&bytes[..8])
            );
        }
        BusOp::Line(line, level) => {
            let level = match level {
                Level::Low => "low",
                Level::High => "high",
            };
            println!("  {} {:?} {}", "LINE".dimmed(), line, level);
        }
        BusOp::Delay(ms) => println!("  {} {} ms", "WAIT".dimmed(), ms),
    }
}

fn command_name(byte: u8) -> &'static str {
    match byte {
        cmd::CASET => "column address set",
        cmd::PASET => "page address set",
        cmd::RAMWR => "memory write",
        cmd::MADCTL => "memory access control",
        cmd::INVON => "inversion on",
        cmd::INVOFF => "inversion off",
        _ => "",
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn handle_rotations(config: &SimConfig) {
    println!("{}", "=".repeat(50));
    println!("{}", "Rotation Modes".cyan().bold());
    println!("{}", "=".repeat(50));
    println!("  {:<8} {:<12} {:<8}", "Degrees", "Size", "MADCTL");

    for rotation in Rotation::ALL {
        let (width, height) =
            rotation.dimensions(config.panel.native_width, config.panel.native_height);
        let line = format!(
            "  {:<8} {:<12} 0x{:02X}",
            rotation.degrees(),
            format!("{}x{}", width, height),
            rotation.madctl()
        );
        if rotation == config.panel.rotation {
            println!("{}", line.white().bold());
        } else {
            println!("{}", line);
        }
    }
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Generate { output } => {
            let text = SimConfig::default().generate()?;
            if let Some(path) = output {
                fs::write(&path, &text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{} Wrote {}", "✓".green(), path.display());
            } else {
                print!("{}", text);
            }
        }

        ConfigCommands::Check { path } => {
            let config = SimConfig::load(&path)?;
            let (width, height) = config.panel.dimensions();
            println!("{} {} is valid", "✓".green(), path.display());
            println!(
                "  Panel: {}x{} at {}° ({}x{} native)",
                width,
                height,
                config.panel.rotation.degrees(),
                config.panel.native_width,
                config.panel.native_height
            );
            println!(
                "  SPI: CS{} mode {} at {} Hz, max chunk {} bytes",
                config.panel.spi.chip_select,
                config.panel.spi.mode,
                config.panel.spi.clock_hz,
                config.panel.max_chunk
            );
        }
    }
    Ok(())
}
