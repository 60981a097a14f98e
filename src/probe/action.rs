use std::{
    fs::OpenOptions,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ProbeResult;

const KIND: &str = "action";

/// A callback run with the result of a trigger.
pub type Action = Arc<dyn Fn(&ProbeResult) + Send + Sync>;

/// Built-in actions that can be attached from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfig {
    /// Write the result to the log.
    Log,
    /// Append the result to the file at the given path.
    File(String),
}

impl ActionConfig {
    /// Builds the action for the success (`true`) or failure list.
    pub fn build(&self, success: bool) -> io::Result<Action> {
        match self {
            ActionConfig::Log => Ok(log_action(success)),
            ActionConfig::File(path) => file_action(path, success),
        }
    }
}

pub fn log_action(success: bool) -> Action {
    Arc::new(move |result: &ProbeResult| {
        if success {
            log::info!("[{} / log] - {}", KIND, result.to_text(success));
        } else {
            log::warn!("[{} / log] - {}", KIND, result.to_text(success));
        }
    })
}

pub fn file_action(path: &str, success: bool) -> io::Result<Action> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("failed to open {}: {}", path, e)))?;
    let target = Mutex::new(file);
    let path = path.to_string();

    Ok(Arc::new(move |result: &ProbeResult| {
        let mut file = target.lock().unwrap_or_else(|e| e.into_inner());
        let written = writeln!(file, "Probe: {}", result.title(success))
            .and_then(|_| {
                for line in result.to_text(success).lines() {
                    writeln!(file, "{}", line)?;
                }
                Ok(())
            })
            .and_then(|_| file.flush());
        if let Err(err) = written {
            log::error!("[{} / file] - failed to write {}: {}", KIND, path, err);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProbeId;

    #[test]
    fn test_file_action() {
        let path = std::env::temp_dir().join(format!("alien-action-{}.log", std::process::id()));
        let path_str = path.to_str().unwrap().to_string();
        let _ = std::fs::remove_file(&path);

        let action = ActionConfig::File(path_str.clone()).build(false).unwrap();
        let result = ProbeResult::new(ProbeId::default(), "http://localhost/ready").with_code(500);
        action(&result);
        action(&result);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Probe: http://localhost/ready Failure").count(), 2);
        assert!(content.contains("HTTP Status Code is 500"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_action_bad_path() {
        let err = file_action("/nonexistent-dir/alien/out.log", true);
        assert!(err.is_err());
    }
}
