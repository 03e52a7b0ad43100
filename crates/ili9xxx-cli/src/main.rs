//! ILI9xxx Driver Tool
//!
//! Runs the driver against an in-memory bus: inspect panel profiles, cost
//! transfers and render test images to PNG.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use ili9xxx_hw::lcd::protocol::{InitTable, INIT_DELAY_MS};
use ili9xxx_hw::lcd::{strategy, CaptureBus, DirtyRegion, Gram, StdHost};
use ili9xxx_hw::{Color, Ili9xxx, PanelModel};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Driver = Ili9xxx<CaptureBus, StdHost>;

#[derive(Parser)]
#[command(name = "ili9xxxctl")]
#[command(about = "Exercise the ILI9xxx display driver on a simulated panel")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Panel configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved panel configuration
    Info,
    /// Estimate transfer cost for a dirty rectangle
    Estimate {
        x: u16,
        y: u16,
        /// Rectangle width
        w: u16,
        /// Rectangle height
        h: u16,
    },
    /// Fill the panel with a color and save the result
    Clear {
        /// Color in hex format (e.g., #FF0000 for red)
        #[arg(long, default_value = "#000000")]
        color: String,

        /// Output file path
        #[arg(default_value = "clear.png")]
        output: PathBuf,
    },
    /// Draw a test pattern and save the result
    Demo {
        /// Output file path
        #[arg(default_value = "demo.png")]
        output: PathBuf,
    },
    /// Print a model's initialization table
    InitTable {
        /// Panel model (defaults to the configured one)
        model: Option<String>,
    },
    /// Write the effective configuration to a file
    SaveConfig {
        /// Output file path
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Info => handle_info(&config),
        Commands::Estimate { x, y, w, h } => handle_estimate(&config, x, y, w, h),
        Commands::Clear { color, output } => handle_clear(&config, &color, &output),
        Commands::Demo { output } => handle_demo(&config, &output),
        Commands::InitTable { model } => handle_init_table(&config, model.as_deref()),
        Commands::SaveConfig { output } => {
            config.save(&output)?;
            println!("Configuration saved to: {}", output.display());
            Ok(())
        }
    }
}

/// Builds and sets up a driver on a capture bus.
fn open(config: &Config) -> Result<Driver> {
    let bus = CaptureBus::new(config.data_rate);
    let mut display = Ili9xxx::new(bus, StdHost, config.driver_config()?);
    display.setup().context("Panel setup failed")?;
    display.dump_config();
    Ok(display)
}

/// Replays everything the driver sent and writes a PNG.
fn save_screenshot(display: &Driver, config: &Config, output: &Path) -> Result<()> {
    let mut gram = Gram::new(display.width(), display.height(), display.is_18bit())
        .with_offset(config.offset_x, config.offset_y);
    gram.apply(display.bus().transactions());
    gram.save_png(output)
        .context("Failed to write screenshot file")?;
    println!("Screenshot saved to: {}", output.display());
    Ok(())
}

fn handle_info(config: &Config) -> Result<()> {
    let display = open(config)?;
    let bus = display.bus();
    println!("Panel:");
    println!("  Model: {}", display.model());
    println!("  Dimensions: {}x{}", display.width(), display.height());
    println!("  Offset: {},{}", config.offset_x, config.offset_y);
    println!("  Color mode: {}", display.color_mode());
    println!("  18-bit: {}", if display.is_18bit() { "yes" } else { "no" });
    println!("  Inverted: {}", if display.is_inverted() { "yes" } else { "no" });
    println!("  Frame buffer: {} bytes", display.framebuffer().byte_len());
    println!("  Data rate: {}MHz", config.data_rate / 1_000_000);
    println!(
        "  Setup: {} commands, {} data bytes",
        bus.commands().len(),
        bus.data_bytes()
    );
    Ok(())
}

fn handle_estimate(config: &Config, x: u16, y: u16, w: u16, h: u16) -> Result<()> {
    let driver = config.driver_config()?;
    if w == 0 || h == 0 {
        anyhow::bail!("Rectangle must not be empty");
    }
    if x as u32 + w as u32 > driver.width as u32 || y as u32 + h as u32 > driver.height as u32 {
        anyhow::bail!(
            "Rectangle does not fit a {}x{} panel",
            driver.width,
            driver.height
        );
    }

    let mut region = DirtyRegion::new(driver.width, driver.height);
    region.on_pixel_changed(x, y);
    region.on_pixel_changed(x + w - 1, y + h - 1);

    let is_18bit = driver.is_18bit || driver.model.profile().is_18bit;
    let estimate = strategy::estimate(driver.width, &region, config.data_rate);
    let choice = strategy::select(driver.color_mode, is_18bit, &estimate);
    println!("Single write:   {}us", estimate.single_us);
    println!("Multiple write: {}us", estimate.multiple_us);
    println!("Selected: {}", choice);
    Ok(())
}

fn handle_clear(config: &Config, color: &str, output: &Path) -> Result<()> {
    let color = Color::from_hex(color)
        .with_context(|| format!("Invalid color: {}. Use #RRGGBB", color))?;
    let mut display = open(config)?;
    display.update(|d| d.fill(color))?;
    if let Some(report) = display.last_flush() {
        println!("Flushed with {} in {:?}", report.strategy, report.elapsed);
    }
    save_screenshot(&display, config, output)
}

/// Color bars with a white frame and a diagonal.
fn draw_pattern(display: &mut Driver) -> ili9xxx_hw::Result<()> {
    const BARS: [Color; 8] = [
        Color::WHITE,
        Color::new(255, 255, 0),
        Color::new(0, 255, 255),
        Color::GREEN,
        Color::new(255, 0, 255),
        Color::RED,
        Color::BLUE,
        Color::BLACK,
    ];
    let width = display.width() as i32;
    let height = display.height() as i32;
    let bar_width = (width / BARS.len() as i32).max(1);

    for (i, &color) in BARS.iter().enumerate() {
        let x0 = i as i32 * bar_width;
        for y in 0..height {
            for x in x0..(x0 + bar_width).min(width) {
                display.write_pixel(x, y, color)?;
            }
        }
    }
    for x in 0..width {
        display.write_pixel(x, 0, Color::WHITE)?;
        display.write_pixel(x, height - 1, Color::WHITE)?;
    }
    for y in 0..height {
        display.write_pixel(0, y, Color::WHITE)?;
        display.write_pixel(width - 1, y, Color::WHITE)?;
        display.write_pixel(y * width / height, y, Color::BLACK)?;
    }
    Ok(())
}

fn handle_demo(config: &Config, output: &Path) -> Result<()> {
    let mut display = open(config)?;

    display.update(draw_pattern)?;
    if let Some(report) = display.last_flush() {
        println!(
            "Full frame: {} ({}us vs {}us estimated) in {:?}",
            report.strategy, report.estimate.single_us, report.estimate.multiple_us, report.elapsed
        );
    }

    // A small change afterwards only sends its own rectangle.
    display.update(|d| {
        for y in 10..20 {
            for x in 10..20 {
                d.write_pixel(x, y, Color::RED)?;
            }
        }
        Ok(())
    })?;
    if let Some(report) = display.last_flush() {
        info!("Partial update bounds {:?}", report.bounds);
        println!("Partial update: {} in {:?}", report.strategy, report.elapsed);
    }

    save_screenshot(&display, config, output)
}

fn handle_init_table(config: &Config, model: Option<&str>) -> Result<()> {
    let model: PanelModel = model.unwrap_or(&config.model).parse()?;
    println!("Init table for {}:", model);
    for record in InitTable::new(model.profile().init_table) {
        let record = record?;
        let args: Vec<String> = record.args.iter().map(|b| format!("{:02X}", b)).collect();
        if record.delay {
            println!("  {:02X} [{}] +{}ms", record.command, args.join(" "), INIT_DELAY_MS);
        } else {
            println!("  {:02X} [{}]", record.command, args.join(" "));
        }
    }
    Ok(())
}
