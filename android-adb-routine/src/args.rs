use crate::adb::BackendKind;
use crate::config::RunConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Play the routine until cancelled or the round limit is hit
    Run,
    /// Capture one screen to `screenshot.png` and exit
    Screenshot,
    /// Print the round plan as YAML and exit
    DumpPlan,
}

/// Config values given on the command line; they win over the config file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub device_id: Option<String>,
    pub threshold: Option<f32>,
    pub retry_attempts: Option<u32>,
    pub round_limit: Option<u32>,
    pub click_delay_ms: Option<u64>,
    pub process_delay_ms: Option<u64>,
    pub template_dir: Option<PathBuf>,
    pub backend: Option<BackendKind>,
}

impl Overrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(device_id) = &self.device_id {
            config.device_id = device_id.clone();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.retry_attempts = retry_attempts;
        }
        if let Some(round_limit) = self.round_limit {
            config.round_limit = round_limit;
        }
        if let Some(ms) = self.click_delay_ms {
            config.click_delay_ms = ms;
        }
        if let Some(ms) = self.process_delay_ms {
            config.process_delay_ms = ms;
        }
        if let Some(dir) = &self.template_dir {
            config.template_dir = dir.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub config_path: Option<PathBuf>,
    pub plan_path: Option<PathBuf>,
    pub overrides: Overrides,
}

fn parse_value<T: FromStr>(flag: &str, raw: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("❌ Invalid value for {flag}: {raw}");
            None
        }
    }
}

impl Args {
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse flags (program name already stripped). `None` means the caller
    /// should exit: help or version was printed, or a flag was invalid.
    pub fn parse_from<I, A>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let mut mode = Mode::Run;
        let mut debug_mode = false;
        let mut config_path = None;
        let mut plan_path = None;
        let mut overrides = Overrides::default();

        for arg in args {
            let arg = arg.as_ref();
            let (flag, value) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (arg, None),
            };

            match (flag, value) {
                ("--help" | "-h", None) => {
                    print_help();
                    return None;
                }
                ("--version" | "-v", None) => {
                    println!(
                        "Android ADB Routine v{} ({}) (c) {}",
                        env!("APP_VERSION_DISPLAY"),
                        env!("APP_GIT_COMMIT"),
                        env!("APP_BUILD_YEAR")
                    );
                    return None;
                }
                ("--debug", None) => debug_mode = true,
                ("--screenshot" | "-s", None) => mode = Mode::Screenshot,
                ("--dump-plan", None) => mode = Mode::DumpPlan,
                ("--config", Some(path)) => config_path = Some(PathBuf::from(path)),
                ("--plan", Some(path)) => plan_path = Some(PathBuf::from(path)),
                ("--device", Some(id)) => overrides.device_id = Some(id.to_string()),
                ("--templates", Some(dir)) => overrides.template_dir = Some(PathBuf::from(dir)),
                ("--threshold", Some(raw)) => overrides.threshold = Some(parse_value(flag, raw)?),
                ("--retries", Some(raw)) => {
                    overrides.retry_attempts = Some(parse_value(flag, raw)?)
                }
                ("--rounds", Some(raw)) => overrides.round_limit = Some(parse_value(flag, raw)?),
                ("--click-delay-ms", Some(raw)) => {
                    overrides.click_delay_ms = Some(parse_value(flag, raw)?)
                }
                ("--process-delay-ms", Some(raw)) => {
                    overrides.process_delay_ms = Some(parse_value(flag, raw)?)
                }
                ("--impl", Some(raw)) => match BackendKind::parse(raw) {
                    Some(kind) => overrides.backend = Some(kind),
                    None => {
                        eprintln!("❌ Unknown impl '{raw}', expected 'rust' or 'shell'");
                        return None;
                    }
                },
                _ => {
                    eprintln!("❌ Unknown argument: {arg}");
                    print_help();
                    return None;
                }
            }
        }

        Some(Args {
            mode,
            debug_mode,
            config_path,
            plan_path,
            overrides,
        })
    }
}

fn print_help() {
    println!("🤖 Android ADB Routine");
    println!();
    println!("USAGE:");
    println!("    android-adb-routine [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)              Run the standard round routine");
    println!("    --config=PATH           Load settings from a YAML file");
    println!("    --plan=PATH             Load the round plan from a YAML file");
    println!("    --device=ID             Device serial or host:port (default 127.0.0.1:16384)");
    println!("    --templates=DIR         Template directory (default ./ui/)");
    println!("    --threshold=F           Match threshold, lower is stricter (default 0.25)");
    println!("    --retries=N             Extra capture attempts per match (default 1)");
    println!("    --rounds=N              Round limit (default 999)");
    println!("    --click-delay-ms=N      Inter-action delay (default 500)");
    println!("    --process-delay-ms=N    Inter-stage delay (default 5000)");
    println!("    --impl=<shell|rust>     ADB implementation (default: shell)");
    println!("                            The shell implementation requires the ADB tool to be installed.");
    println!("    --screenshot, -s        Save one capture to screenshot.png and exit");
    println!("    --dump-plan             Print the round plan as YAML and exit");
    println!("    --debug                 Enable debug output");
    println!("    --help, -h              Show this help message");
    println!("    --version, -v           Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    android-adb-routine --device=127.0.0.1:16384 --rounds=10");
    println!("    android-adb-routine --impl=rust --screenshot");
    println!("    android-adb-routine --dump-plan > round.yaml");
    println!("    android-adb-routine --plan=round.yaml --debug");
}
