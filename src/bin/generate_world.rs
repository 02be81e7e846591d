//! World generator binary: pregenerates sectors around the origin and saves them.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --radius <N>      Sector radius around the origin in x and z (default: 4)
//!   --seed <SEED>     Random seed (default: 12345)
//!   --out <PATH>      Save file (default: worlds/world.bws)
//!   --flat            Flat grass floor instead of hills
//!   --no-enclosure    Unbounded world with underground stone and ores
//!   --jobs <N>        Parallel sector generations (default: 4)
//!
//! The world config used is written beside the save with a `.json` extension.

use std::path::PathBuf;
use std::time::Instant;

use blockworld::core::{Result, WorldConfig, logging};
use blockworld::persistence::save_world;
use blockworld::terrain::GeneratorConfig;
use blockworld::voxel::{SECTOR_SIZE, SectorCoord, World};

/// Hill tops never rise more than this above the floor.
const RELIEF: i32 = 20;

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let radius = parse_arg::<i32>(&args, "--radius").unwrap_or(4).max(0);
    let seed = parse_arg::<u32>(&args, "--seed").unwrap_or(12345);
    let out = parse_arg::<PathBuf>(&args, "--out").unwrap_or_else(|| PathBuf::from("worlds/world.bws"));
    let jobs = parse_arg::<usize>(&args, "--jobs").unwrap_or(4).max(1);
    let flat = has_flag(&args, "--flat");
    let no_enclosure = has_flag(&args, "--no-enclosure");

    // Limit rayon's thread pool to cap peak memory usage
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
        log::warn!("Could not configure thread pool: {}", e);
    }

    let mut generator = GeneratorConfig {
        seed,
        hills_enabled: !flat,
        ..Default::default()
    };
    if no_enclosure {
        generator.enclosure = None;
    }
    let config = WorldConfig::generated(generator.clone());

    println!("=== Blockworld Generator ===");
    println!("Seed:      {}", seed);
    println!("Radius:    {} sectors ({} blocks)", radius, (radius * 2 + 1) * SECTOR_SIZE);
    println!("Terrain:   {}", if flat { "flat" } else { "hills" });
    println!("Enclosure: {}", if no_enclosure { "none".to_string() } else { format!("{:?}", generator.enclosure) });
    println!("Jobs:      {} parallel", jobs);
    println!("Output:    {}", out.display());
    println!();

    // Sector layers spanning the floor up to the cloud layer
    let y_min = (generator.floor_level() - 1).div_euclid(SECTOR_SIZE);
    let y_max = (generator.floor_level() + RELIEF)
        .max(generator.cloud_level())
        .div_euclid(SECTOR_SIZE);

    let mut sectors = Vec::new();
    for x in -radius..=radius {
        for z in -radius..=radius {
            for y in y_min..=y_max {
                sectors.push(SectorCoord::new(x, y, z));
            }
        }
    }

    let mut world = World::new(config.clone())?;
    let start = Instant::now();
    let generated = world.pregenerate(&sectors);
    let elapsed = start.elapsed();
    log::info!(
        "Generated {} sectors in {:.2}s ({:.0} sectors/sec)",
        generated,
        elapsed.as_secs_f64(),
        generated as f64 / elapsed.as_secs_f64().max(1e-9)
    );

    let snapshot = world.snapshot();
    let bytes = snapshot.to_bytes()?.len();

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        save_world(&out, &snapshot).await?;
        let config_path = out.with_extension("json");
        tokio::fs::write(&config_path, config.to_json_pretty()?).await?;
        Ok::<_, blockworld::core::Error>(())
    })?;

    let stats = world.stats();
    println!();
    println!("=== Generation Complete ===");
    println!("Sectors: {} loaded ({} with blocks)", stats.loaded_sectors, world.sector_count());
    println!("Blocks:  {}", stats.blocks);
    println!("Size:    {:.1} KB on disk", bytes as f64 / 1024.0);
    println!("Output:  {}", out.display());
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
