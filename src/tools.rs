//! External processing stages.
//!
//! Spike sorting, LFP filtering, pose estimation and video extraction are performed by
//! external programs. Each stage runs the command configured for it, with placeholders
//! substituted from the session being processed:
//!
//! | placeholder   | value                             |
//! |---------------|-----------------------------------|
//! | `{name}`      | session name                      |
//! | `{raw}`       | `<data_dir>/raw/<session>`        |
//! | `{interim}`   | `<data_dir>/interim/<session>`    |
//! | `{processed}` | `<data_dir>/processed/<session>`  |
use std::fmt;
use std::process::Command;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::PixelsError;
use crate::session::Session;

/// A processing stage delegated to an external program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ProcessSpikes,
    SortSpikes,
    AssessNoise,
    ProcessLfp,
    ExtractVideos,
    MotionTracking,
    DrawMotionIndexRois,
    MotionIndex,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::ProcessSpikes => "process_spikes",
            Stage::SortSpikes => "sort_spikes",
            Stage::AssessNoise => "assess_noise",
            Stage::ProcessLfp => "process_lfp",
            Stage::ExtractVideos => "extract_videos",
            Stage::MotionTracking => "motion_tracking",
            Stage::DrawMotionIndexRois => "draw_motion_index_rois",
            Stage::MotionIndex => "motion_index",
        };
        write!(f, "{}", name)
    }
}

/// A program and its arguments, which may contain placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The arguments with the session placeholders substituted, followed by `extra_args`.
    pub fn resolve_args(&self, session: &Session, extra_args: &[String]) -> Vec<String> {
        let substitutions = [
            ("{name}", session.name().to_string()),
            ("{raw}", session.raw().display().to_string()),
            ("{interim}", session.interim().display().to_string()),
            ("{processed}", session.processed().display().to_string()),
        ];
        self.args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .chain(extra_args.iter().cloned())
            .collect()
    }
}

/// Run the command configured for `stage` on a session and wait for it to finish.
pub fn run_stage(session: &Session, stage: Stage, extra_args: &[String]) -> Result<(), PixelsError> {
    let command = session.config().tool(stage).ok_or_else(|| {
        PixelsError::MissingTool(format!("{}: no command configured for {}", session.name(), stage))
    })?;
    let args = command.resolve_args(session, extra_args);

    info!("{}: running {} {}", session.name(), command.program, args.join(" "));
    let status = Command::new(&command.program)
        .args(&args)
        .status()
        .map_err(|e| {
            PixelsError::ToolFailure(format!(
                "{}: could not start {}: {}",
                session.name(),
                command.program,
                e
            ))
        })?;
    debug!("{}: {} exited with {}", session.name(), command.program, status);

    if !status.success() {
        return Err(PixelsError::ToolFailure(format!(
            "{}: {} failed during {} ({})",
            session.name(),
            command.program,
            stage,
            status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::rc::Rc;

    use super::*;
    use crate::config::Config;

    fn session(config: Config) -> Session {
        Session::new("210304_HFR1", None, Path::new("/data"), Rc::new(config))
    }

    #[test]
    fn test_resolve_args() {
        let command = ToolCommand::new("sorter", &["--session", "{name}", "{raw}/ap.bin", "--out={processed}"]);
        let args = command.resolve_args(&session(Config::default()), &["--force".to_string()]);
        assert_eq!(
            args,
            vec![
                "--session",
                "210304_HFR1",
                "/data/raw/210304_HFR1/ap.bin",
                "--out=/data/processed/210304_HFR1",
                "--force",
            ]
        );
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            run_stage(&session(Config::default()), Stage::SortSpikes, &[]),
            Err(PixelsError::MissingTool(_))
        ));
    }

    #[test]
    fn test_program_not_found() {
        let mut config = Config::default();
        config
            .tools
            .insert(Stage::ProcessLfp, ToolCommand::new("/no/such/program", &[]));
        assert!(matches!(
            run_stage(&session(config), Stage::ProcessLfp, &[]),
            Err(PixelsError::ToolFailure(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status() {
        let mut config = Config::default();
        config.tools.insert(Stage::AssessNoise, ToolCommand::new("true", &["{name}"]));
        config.tools.insert(Stage::MotionIndex, ToolCommand::new("false", &[]));
        let session = session(config);
        assert_eq!(run_stage(&session, Stage::AssessNoise, &[]), Ok(()));
        assert!(matches!(
            run_stage(&session, Stage::MotionIndex, &[]),
            Err(PixelsError::ToolFailure(_))
        ));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::DrawMotionIndexRois.to_string(), "draw_motion_index_rois");
        let stage: Stage = serde_json::from_str("\"process_lfp\"").unwrap();
        assert_eq!(stage, Stage::ProcessLfp);
    }
}
