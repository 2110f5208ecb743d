//! Watch command - supervise a program and restart it on dependency changes.

use std::path::PathBuf;

use anyhow::Context;

use crate::config::{CrashPolicy, Settings, WatchConfig};
use crate::supervisor::{CommandLauncher, Supervisor};

/// Arguments for the watch command.
pub struct WatchArgs {
    pub debounce_ms: Option<u64>,
    pub clear_screen: Option<bool>,
    pub include: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub on_crash: Option<CrashPolicy>,
    pub program: String,
    pub args: Vec<String>,
}

/// Layer CLI flags over the `[watch]` section.
pub fn effective_config(args: &WatchArgs, config: &WatchConfig) -> WatchConfig {
    let mut watch = config.clone();
    if let Some(ms) = args.debounce_ms {
        watch.debounce_ms = ms;
    }
    if let Some(clear) = args.clear_screen {
        watch.clear_screen = clear;
    }
    if let Some(policy) = args.on_crash {
        watch.crash_policy = policy;
    }
    watch.include.extend(args.include.iter().cloned());
    watch.exclude.extend(args.exclude.iter().cloned());
    watch
}

/// Run the watch command until Ctrl-C.
pub async fn run(args: WatchArgs, config: &Settings) -> anyhow::Result<()> {
    let watch = effective_config(&args, &config.watch);
    let cwd = std::env::current_dir().context("cannot determine working directory")?;

    let launcher = CommandLauncher::new(args.program.clone())
        .args(args.args.iter().cloned())
        .cwd(cwd.clone());

    let mut builder = Supervisor::builder()
        .settings(&watch)
        .launcher(launcher)
        .cwd(cwd.clone());

    // The entry script itself always qualifies
    if let Some(entry) = args
        .args
        .first()
        .map(|arg| cwd.join(arg))
        .filter(|path| path.is_file())
    {
        builder = builder.pin(entry);
    }

    let (supervisor, handle) = builder.build().context("failed to set up watch mode")?;

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            crate::log_event!("watch", "interrupted");
        }
        shutdown.shutdown();
    });

    supervisor.run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> WatchArgs {
        WatchArgs {
            debounce_ms: None,
            clear_screen: None,
            include: Vec::new(),
            exclude: Vec::new(),
            on_crash: None,
            program: "node".to_string(),
            args: vec!["app.js".to_string()],
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args();
        args.debounce_ms = Some(20);
        args.clear_screen = Some(false);
        args.on_crash = Some(CrashPolicy::Restart);

        let watch = effective_config(&args, &WatchConfig::default());
        assert_eq!(watch.debounce_ms, 20);
        assert!(!watch.clear_screen);
        assert_eq!(watch.crash_policy, CrashPolicy::Restart);
    }

    #[test]
    fn test_lists_extend_config() {
        let mut args = args();
        args.include = vec![PathBuf::from(".env")];
        args.exclude = vec!["**/dist/**".to_string()];

        let watch = effective_config(&args, &WatchConfig::default());
        assert_eq!(watch.include, vec![PathBuf::from(".env")]);
        assert!(watch.exclude.contains(&"**/node_modules/**".to_string()));
        assert!(watch.exclude.contains(&"**/dist/**".to_string()));
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let config = WatchConfig {
            debounce_ms: 300,
            ..WatchConfig::default()
        };
        assert_eq!(effective_config(&args(), &config), config);
    }
}
