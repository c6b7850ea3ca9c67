use crate::config::CONFIG_FILENAME;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub config_path: PathBuf,
    /// Screenshot file used as the screen source
    pub screen: Option<PathBuf>,
    pub once: bool,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub no_macro: bool,
    pub import: Option<PathBuf>,
    pub clear_macro: Option<String>,
    pub macro_profile: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_FILENAME),
            screen: None,
            once: false,
            debug_mode: false,
            timeout_secs: None,
            log_file: None,
            no_macro: false,
            import: None,
            clear_macro: None,
            macro_profile: None,
        }
    }
}

impl Args {
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    /// Parse flags (program name excluded). Returns `None` after printing
    /// help or version, or on an invalid flag.
    pub fn parse_from(args: &[String]) -> Option<Self> {
        let mut parsed = Args::default();

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!(
                    "Screen Match Run v{} (c) {} Vigor Solutions",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_BUILD_YEAR")
                );
                return None;
            } else if arg == "--debug" {
                parsed.debug_mode = true;
            } else if arg == "--once" {
                parsed.once = true;
            } else if arg == "--no-macro" {
                parsed.no_macro = true;
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => parsed.timeout_secs = Some(secs),
                    Err(_) => {
                        eprintln!("❌ Invalid timeout value: {}", val);
                        return None;
                    }
                }
            } else if let Some(val) = arg.strip_prefix("--config=") {
                parsed.config_path = PathBuf::from(non_empty(arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--screen=") {
                parsed.screen = Some(PathBuf::from(non_empty(arg, val)?));
            } else if let Some(val) = arg.strip_prefix("--log-file=") {
                parsed.log_file = Some(PathBuf::from(non_empty(arg, val)?));
            } else if let Some(val) = arg.strip_prefix("--import=") {
                parsed.import = Some(PathBuf::from(non_empty(arg, val)?));
            } else if let Some(val) = arg.strip_prefix("--clear-macro=") {
                parsed.clear_macro = Some(non_empty(arg, val)?.to_string());
            } else if let Some(val) = arg.strip_prefix("--macro-profile=") {
                parsed.macro_profile = Some(non_empty(arg, val)?.to_string());
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(parsed)
    }

    /// Whether any config maintenance flag was given.
    pub fn has_admin_action(&self) -> bool {
        self.import.is_some() || self.clear_macro.is_some() || self.macro_profile.is_some()
    }
}

fn non_empty<'a>(arg: &str, val: &'a str) -> Option<&'a str> {
    if val.is_empty() {
        eprintln!("❌ Missing value for {}", arg);
        None
    } else {
        Some(val)
    }
}

fn print_help() {
    println!("🎯 Screen Match Run");
    println!();
    println!("USAGE:");
    println!("    screen-match-run [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --screen=PATH          Screenshot file used as the screen (re-read every scan)");
    println!("    --config=PATH          Config file (default: {})", CONFIG_FILENAME);
    println!("    --once                 Scan every template once, then exit");
    println!("    --no-macro             Do not replay the profile's macro");
    println!("    --import=PATH          Merge profiles and settings from another config file");
    println!("    --clear-macro=PROFILE  Delete the macro recorded for PROFILE");
    println!("    --macro-profile=NAME   Select the profile whose macro is replayed");
    println!("    --debug                Enable debug logging");
    println!("    --log-file=PATH        Write logs to PATH instead of stderr");
    println!("    --timeout=N            Auto-exit after N seconds");
    println!("    --help, -h             Show this help message");
    println!("    --version, -v          Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    screen-match-run --screen=screen.png --once");
    println!("    screen-match-run --screen=screen.png --timeout=60 --debug");
    println!("    screen-match-run --import=shared.json");
}
