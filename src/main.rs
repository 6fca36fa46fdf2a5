mod analysis;
mod cli_options;
mod preset;

use cutter::CutConfig;
use log::{error, info};
use rand::Rng;
use raytrace::{Scene, TraceConfig};

use cli_options::CliOptions;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match cli_options::parse_args(std::env::args().collect()) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{}\nusage: {}", msg, CliOptions::message());
            std::process::exit(1);
        }
    };
    let name = options.scene_name.as_deref().unwrap_or("shell");
    let seed = options.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let model = match preset::by_name(name, seed) {
        Some(model) => model,
        None => {
            error!(
                "unknown scene {}; choose one of {}",
                name,
                preset::names().join(", ")
            );
            std::process::exit(1);
        }
    };
    info!("scene {} (seed {})", name, seed);

    let scene = match Scene::prepare(
        model.prims,
        model.regions,
        TraceConfig::default(),
        CutConfig::default(),
    ) {
        Ok(scene) => scene,
        Err(e) => {
            error!("cannot prepare scene {}: {}", name, e);
            std::process::exit(1);
        }
    };

    let analysis = analysis::run(&scene, &options);
    println!("{}", analysis.report(&scene));
    info!("statistics:\n{}", analysis.stats);
}
