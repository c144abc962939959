use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mos6502_core::logging::{LogCategory, LogConfig, LogLevel};
use mos6502_core::memory::{ROM_FILL, ROM_START};
use mos6502_core::{Memory, Region, Registers, Snapshot};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mos6502", about = "Inspect 6502 register and memory state")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Core log level for every category (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Per-category core log level, e.g. `--log stack=trace`
    #[arg(long = "log", global = true, value_parser = parse_category_level)]
    log: Vec<(LogCategory, LogLevel)>,

    /// Write core logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Maximum core log messages per second per category
    #[arg(long, global = true)]
    log_rate: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the power-on register file
    Regs {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load a raw binary image and show the resulting memory
    Load {
        image: PathBuf,

        /// Load address ($XXXX, 0xXXXX or bare hex)
        #[arg(long, default_value = "$8000", value_parser = parse_addr)]
        at: u16,

        /// Point the reset vector (and PC) at the load address
        #[arg(long, default_value_t = false)]
        reset: bool,

        /// Hex dump START:LEN after loading
        #[arg(long, value_parser = parse_range)]
        dump: Option<(u16, usize)>,

        /// Write a JSON snapshot to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Restore a JSON snapshot into a fresh machine
    Restore {
        file: PathBuf,

        #[arg(long, value_parser = parse_range)]
        dump: Option<(u16, usize)>,
    },
}

fn parse_addr(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix('$')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("bad address '{}': {}", s, e))
}

/// `START:LEN`; START is an address, LEN is decimal unless prefixed with `$` or `0x`.
fn parse_range(s: &str) -> Result<(u16, usize), String> {
    let (start, len) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:LEN, got '{}'", s))?;
    let start = parse_addr(start)?;
    let len = match len.strip_prefix('$').or_else(|| len.strip_prefix("0x")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => len.parse(),
    }
    .map_err(|e| format!("bad length '{}': {}", len, e))?;
    Ok((start, len))
}

fn parse_category_level(s: &str) -> Result<(LogCategory, LogLevel), String> {
    let (category, level) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=LEVEL, got '{}'", s))?;
    let level = level.parse::<LogLevel>().map_err(|e| e.to_string())?;
    Ok((category.parse::<LogCategory>()?, level))
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    for key in config.apply_env() {
        log::warn!("ignoring {}: not a log level", key);
    }
    if let Some(level) = args.log_level {
        config.set_global_level(level);
    }
    for &(category, level) in &args.log {
        config.set_level(category, level);
    }
    if let Some(rate) = args.log_rate {
        config.set_rate_limit(rate);
    }
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

fn hex_dump(mem: &Memory, start: u16, len: usize) -> String {
    let mut out = String::new();
    for (i, row) in mem.slice(start, len).chunks(16).enumerate() {
        let addr = start as usize + i * 16;
        let bytes: Vec<String> = row.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&format!("${:04X}: {}\n", addr, bytes.join(" ")));
    }
    out
}

/// Bytes in `region` that differ from their power-on value.
fn modified_bytes(mem: &Memory, region: Region) -> usize {
    let initial = if region == Region::Rom { ROM_FILL } else { 0 };
    mem.region(region).iter().filter(|&&b| b != initial).count()
}

fn print_machine(regs: &Registers, mem: &Memory) {
    println!("{}  [{}]", regs, regs.status);
    println!(
        "Vectors: NMI ${:04X}  RESET ${:04X}  IRQ/BRK ${:04X}",
        mem.nmi_vector(),
        mem.reset_vector(),
        mem.irq_vector()
    );
    for region in Region::ALL {
        println!(
            "  {:<28} {:>5} byte(s) changed",
            region.to_string(),
            modified_bytes(mem, region)
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    match &args.command {
        Command::Regs { json } => {
            let regs = Registers::new();
            if *json {
                println!("{}", serde_json::to_string_pretty(&regs)?);
            } else {
                println!("{}", regs);
            }
        }
        Command::Load {
            image,
            at,
            reset,
            dump,
            save,
        } => {
            let bytes =
                fs::read(image).with_context(|| format!("reading {}", image.display()))?;
            if bytes.is_empty() {
                bail!("{} is empty", image.display());
            }

            let mut regs = Registers::new();
            let mut mem = Memory::new();
            mem.load_program(*at, &bytes)?;
            log::info!("loaded {} ({} bytes) at ${:04X}", image.display(), bytes.len(), at);
            if *at < ROM_START {
                log::warn!("image loaded below ROM; it will be part of save states");
            }
            if *reset {
                mem.set_reset_vector(*at);
                regs.pc = mem.reset_vector();
            }

            print_machine(&regs, &mem);
            if let Some((start, len)) = dump {
                print!("{}", hex_dump(&mem, *start, *len));
            }
            if let Some(path) = save {
                let snapshot = Snapshot::capture(&regs, &mem);
                fs::write(path, serde_json::to_string_pretty(&snapshot.to_json())?)
                    .with_context(|| format!("writing {}", path.display()))?;
                log::info!("saved snapshot to {}", path.display());
            }
        }
        Command::Restore { file, dump } => {
            let text =
                fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            let snapshot = Snapshot::from_json(&value)?;

            let mut regs = Registers::new();
            let mut mem = Memory::new();
            snapshot.restore(&mut regs, &mut mem)?;

            print_machine(&regs, &mem);
            if let Some((start, len)) = dump {
                print!("{}", hex_dump(&mem, *start, *len));
            }
        }
    }

    Ok(())
}
