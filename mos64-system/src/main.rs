// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use getopts::Options;
use log::info;

use std::sync::atomic::Ordering;

use mos64_core::traits::Cpu;
use mos64_system::config::{Config, RomPaths};
use mos64_system::scheduler::Pacer;
use mos64_system::system::{RomImages, System};

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} -b BASIC -c CHARSET -k KERNAL [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_args() -> Result<Option<Config>> {
    let args: Vec<String> = std::env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.reqopt("b", "basic", "path to the BASIC ROM image", "FILE");
    opts.reqopt("c", "charset", "path to the character ROM image", "FILE");
    opts.reqopt("k", "kernal", "path to the KERNAL ROM image", "FILE");
    opts.optopt("p", "prg", "PRG image to autostart", "FILE");
    opts.optopt("d", "disk", "D64 image to attach as device 8", "FILE");
    opts.optflag("w", "warp", "run without real-time pacing");
    opts.optflag("h", "help", "print this help menu");

    let matches = opts.parse(&args[1..]).context("failed to parse arguments")?;
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return Ok(None);
    }

    let roms = RomPaths {
        basic: PathBuf::from(matches.opt_str("b").unwrap()),
        charset: PathBuf::from(matches.opt_str("c").unwrap()),
        kernal: PathBuf::from(matches.opt_str("k").unwrap()),
    };
    let mut config = Config::new(roms);
    config.prg = matches.opt_str("p").map(PathBuf::from);
    config.disk = matches.opt_str("d").map(PathBuf::from);
    config.warp_mode = matches.opt_present("w");
    Ok(Some(config))
}

fn run(config: Config) -> Result<()> {
    let basic = mos64_loader::rom::load(&config.roms.basic)
        .with_context(|| format!("loading BASIC ROM from {}", config.roms.basic.display()))?;
    let charset = mos64_loader::rom::load(&config.roms.charset)
        .with_context(|| format!("loading character ROM from {}", config.roms.charset.display()))?;
    let kernal = mos64_loader::rom::load(&config.roms.kernal)
        .with_context(|| format!("loading KERNAL ROM from {}", config.roms.kernal.display()))?;

    let mut system = System::build(
        config.model,
        RomImages {
            basic: &basic,
            charset: &charset,
            kernal: &kernal,
        },
    );
    system.reset();

    if let Some(path) = &config.disk {
        let image = mos64_loader::d64::load(path)
            .with_context(|| format!("loading D64 image from {}", path.display()))?;
        system.mount_disk(&image);
    }
    if let Some(path) = &config.prg {
        let image = mos64_loader::PrgImage::load(path)
            .with_context(|| format!("loading PRG image from {}", path.display()))?;
        system.mount_prg(image);
    }

    let debug_break = system.debug_break_flag();
    let handler_flag = debug_break.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("installing Ctrl-C handler")?;

    let mut pacer = Pacer::new(config.model.cpu_frequency(), config.warp_mode);
    info!(
        target: "system",
        "running at {} Hz{}",
        config.model.cpu_frequency(),
        if config.warp_mode { " (warp)" } else { "" }
    );
    while !debug_break.load(Ordering::Relaxed) {
        let cycles = system.step();
        pacer.gate(cycles);
        if system.is_jammed() {
            info!(
                target: "system",
                "cpu jammed at 0x{:04x} after {} cycles",
                system.cpu().get_pc(),
                system.cycles()
            );
            break;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let config = match parse_args() {
        Ok(Some(config)) => config,
        Ok(None) => process::exit(0),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(1);
        }
    };
    if let Err(err) = run(config) {
        eprintln!("error: {:#}", err);
        process::exit(1);
    }
}
