use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use snake_dqn::config::AppConfig;
use snake_dqn::modes::TrainMode;
use snake_dqn::rl::{DqnAgent, InferenceBackend, RandomAgent, SnakeEnvironment, TrainingBackend};
use snake_dqn::rl::default_device;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "snake_dqn")]
#[command(version, about = "Deep Q-learning for the Snake game")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a DQN agent
    Train {
        /// TOML configuration file; defaults are used when it is missing
        #[arg(long, default_value = "snake_dqn.toml")]
        config: PathBuf,

        /// Override training.max_episodes
        #[arg(long)]
        episodes: Option<usize>,

        /// Resume from a checkpoint file
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Seed for the game and the agent
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play uniformly random episodes for a reference score
    Baseline {
        #[arg(long, default_value = "snake_dqn.toml")]
        config: PathBuf,

        #[arg(long, default_value = "100")]
        episodes: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(cli.log_level))
        .init();

    match cli.command {
        Command::Train {
            config,
            episodes,
            resume,
            seed,
        } => {
            let mut app = AppConfig::load_or_default(&config)
                .with_context(|| format!("Failed to load config {:?}", config))?;
            if let Some(episodes) = episodes {
                app.training.max_episodes = episodes;
            }
            if resume.is_some() {
                app.training.resume_from = resume;
            }
            if let Some(seed) = seed {
                app.game.seed = Some(seed);
                app.dqn.seed = Some(seed);
            }
            app.validate().context("Invalid configuration")?;
            train(app)
        }
        Command::Baseline {
            config,
            episodes,
            seed,
        } => {
            let mut app = AppConfig::load_or_default(&config)
                .with_context(|| format!("Failed to load config {:?}", config))?;
            app.training.max_episodes = episodes;
            app.training.resume_from = None;
            if let Some(seed) = seed {
                app.game.seed = Some(seed);
            }
            app.validate().context("Invalid configuration")?;
            baseline(app, seed)
        }
        Command::Config => {
            print!("{}", AppConfig::default_toml()?);
            Ok(())
        }
    }
}

fn train(app: AppConfig) -> Result<()> {
    let device = default_device();
    let run_dir = app
        .training
        .metrics_dir
        .join(format!("run_{}", Local::now().format("%Y%m%d_%H%M")));
    info!(metrics_dir = %run_dir.display(), "run directory");

    let agent = DqnAgent::<TrainingBackend>::new(app.dqn.clone(), app.network(), device.clone())
        .context("Failed to build DQN agent")?
        .with_model_name_prefix(app.training.model_name_prefix.clone())
        .with_metrics_dir(run_dir);
    let env = SnakeEnvironment::<InferenceBackend>::new(app.game.clone(), device);

    let mut train_mode = TrainMode::new(agent, env, app.training);
    let summary = train_mode.run()?;

    if let Some(path) = summary.last_checkpoint {
        info!(checkpoint = %path.display(), "final checkpoint");
    }
    Ok(())
}

fn baseline(app: AppConfig, seed: Option<u64>) -> Result<()> {
    let env = SnakeEnvironment::<InferenceBackend>::new(app.game.clone(), default_device());
    let agent = RandomAgent::new(env.num_actions(), seed);

    let mut train_mode = TrainMode::new(agent, env, app.training);
    let summary = train_mode.run()?;

    println!(
        "random baseline over {} episodes: mean reward {:.2}, best reward {:.2}, mean length {:.1}, best score {}",
        summary.episodes_run,
        summary.mean_reward,
        summary.max_reward,
        summary.mean_length,
        summary.max_score
    );
    Ok(())
}
