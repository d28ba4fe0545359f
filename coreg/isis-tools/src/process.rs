use std::{
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Location of the ISIS executables.
#[derive(Debug, Clone, Default)]
pub struct IsisBin {
    /// Directory holding the programs. When `None`, they are looked up in
    /// `PATH`.
    pub bin_dir: Option<PathBuf>,
}

/// Format an ISIS `name=value` argument.
pub(crate) fn arg<V: std::fmt::Display>(name: &str, value: V) -> String {
    format!("{name}={value}")
}

pub(crate) fn path_arg(name: &str, path: &Path) -> String {
    arg(name, path.display())
}

impl IsisBin {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn program_path(&self, program: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// Run `program` to completion, failing on a non-zero exit status.
    pub fn run(&self, program: &str, args: &[String]) -> Result<Output, ProcessError> {
        let exe = self.program_path(program);
        debug!("running {} {}", exe.display(), args.join(" "));
        let output = Command::new(&exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProcessError::Failed {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}
