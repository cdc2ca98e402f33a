use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use pixels::actions::{ActionLabel, Event};
use pixels::align::{AlignData, Window};
use pixels::behaviours::reach::Reach;
use pixels::behaviours::Behaviour;
use pixels::config::Config;
use pixels::error::PixelsError;
use pixels::experiment::Experiment;

#[derive(Parser, Debug)]
#[command(about = "Process reach task sessions for a group of mice")]
struct Args {
    /// The folder containing the raw, interim and processed folders
    #[arg(long)]
    data_dir: PathBuf,
    /// The folder containing the training metadata JSON files
    #[arg(long)]
    meta_dir: Option<PathBuf>,
    /// A JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// The IDs of the mice
    #[arg(short, long = "mouse", required = true)]
    mice: Vec<String>,
    /// Log debug messages
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the discovered sessions
    List,
    ProcessSpikes,
    SortSpikes,
    AssessNoise,
    ProcessLfp,
    /// Extract action labels from the raw behavioural data
    ProcessBehaviour,
    ExtractVideos {
        /// Extract again sessions which already have videos
        #[arg(long)]
        force: bool,
    },
    MotionTracking {
        /// The configuration of the pose estimation model
        #[arg(long)]
        dlc_config: PathBuf,
        #[arg(long)]
        no_labelled_video: bool,
    },
    DrawRois {
        #[arg(long, default_value = "1")]
        num_rois: usize,
    },
    MotionIndex {
        #[arg(long, default_value = "1")]
        num_rois: usize,
    },
    /// Print the number of units of each session by curation label
    ClusterInfo,
    /// Align trials to an event and write the table to a CSV file
    AlignTrials {
        /// Action labels joined by '|', e.g., correct_left|correct_right
        #[arg(long)]
        label: String,
        /// led_on or led_off
        #[arg(long, default_value = "led_on")]
        event: String,
        /// Start of the window relative to the event (in seconds)
        #[arg(long)]
        start: f64,
        /// End of the window relative to the event (in seconds)
        #[arg(long)]
        end: f64,
        /// Align firing rates instead of behavioural channels
        #[arg(long)]
        spikes: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn run(args: Args) -> Result<(), PixelsError> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let exp: Experiment<Reach> =
        Experiment::new(&args.mice, args.data_dir, args.meta_dir, config)?;

    match args.command {
        Command::List => println!("{}", exp),
        Command::ProcessSpikes => exp.process_spikes()?,
        Command::SortSpikes => exp.sort_spikes()?,
        Command::AssessNoise => exp.assess_noise()?,
        Command::ProcessLfp => exp.process_lfp()?,
        Command::ProcessBehaviour => exp.process_behaviour()?,
        Command::ExtractVideos { force } => exp.extract_videos(force)?,
        Command::MotionTracking {
            dlc_config,
            no_labelled_video,
        } => exp.process_motion_tracking(&dlc_config, !no_labelled_video)?,
        Command::DrawRois { num_rois } => exp.draw_motion_index_rois(num_rois)?,
        Command::MotionIndex { num_rois } => exp.process_motion_index(num_rois)?,
        Command::ClusterInfo => {
            for (session, clusters) in exp.iter().zip(exp.get_cluster_info()?) {
                let good = clusters.iter().filter(|c| c.label() == "good").count();
                println!(
                    "{}: {} clusters, {} good",
                    session.name(),
                    clusters.len(),
                    good
                );
            }
        }
        Command::AlignTrials {
            label,
            event,
            start,
            end,
            spikes,
            output,
        } => {
            let label: ActionLabel = label.parse()?;
            let event: Event = event.parse()?;
            let data = if spikes {
                AlignData::SpikeRate
            } else {
                AlignData::Behaviour
            };
            let table = exp.align_trials(label, event, data, Window::new(start, end)?, None)?;
            table.write_csv(&output)?;
            println!(
                "Wrote {} aligned columns to {}",
                table.num_columns(),
                output.display()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Could not initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
