//! Process-spawning capability.

use tokio::process::Command;

/// Creates (but does not start) external process commands.
///
/// The orchestrator attaches pipes and starts the returned command, so
/// implementations should only set the program, arguments and environment.
pub trait CommandFactory: Send + Sync {
    fn command(&self, program: &str, args: &[String]) -> Command;
}

/// Resolves `program` on `PATH` and passes `args` verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandFactory;

impl CommandFactory for SystemCommandFactory {
    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_factory_passes_args_verbatim() {
        let args = vec!["-c".to_string(), r#"printf '%s' "{\"a\": 1}""#.to_string()];
        let output = SystemCommandFactory
            .command("sh", &args)
            .output()
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), r#"{"a": 1}"#);
    }
}
