use crate::core::space::Viewport;
use crate::game::timing_windows::JudgeWindows;
use ini::Ini;
use log::{info, warn};
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH: &str = "judgeline.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub viewport: Viewport,
    pub windows: JudgeWindows,
    pub auto_miss: bool,
    /// Added to every autoplay tap, to exercise the non-perfect grades.
    pub autoplay_offset_s: f32,
    pub frame_rate: f32,
    /// Pace autoplay against the wall clock instead of stepping it.
    pub realtime: bool,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            windows: JudgeWindows::default(),
            auto_miss: false,
            autoplay_offset_s: 0.0,
            frame_rate: 60.0,
            realtime: false,
            log_level: LogLevel::Info,
        }
    }
}

fn to_ini(cfg: &Config) -> Ini {
    let bool_str = |b: bool| if b { "1" } else { "0" };
    let mut conf = Ini::new();
    conf.with_section(Some("Viewport"))
        .set("Width", cfg.viewport.width.to_string())
        .set("Height", cfg.viewport.height.to_string());
    conf.with_section(Some("Judge"))
        .set("PerfectWindow", cfg.windows.perfect_s.to_string())
        .set("GoodWindow", cfg.windows.good_s.to_string())
        .set("BadWindow", cfg.windows.bad_s.to_string())
        .set("SpatialTolerance", cfg.windows.spatial_tolerance.to_string())
        .set("AutoMiss", bool_str(cfg.auto_miss));
    conf.with_section(Some("Autoplay"))
        .set("OffsetSeconds", cfg.autoplay_offset_s.to_string())
        .set("FrameRate", cfg.frame_rate.to_string())
        .set("Realtime", bool_str(cfg.realtime));
    conf.with_section(Some("Options"))
        .set("LogLevel", cfg.log_level.as_str());
    conf
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    to_ini(&Config::default()).write_to_file(path)
}

fn positive_f32(conf: &Ini, section: &str, key: &str, default: f32) -> f32 {
    conf.get_from(Some(section), key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

/// Builds a config from parsed INI data, falling back to defaults for any
/// missing or malformed key.
pub fn from_ini(conf: &Ini) -> Config {
    let default = Config::default();

    let viewport = Viewport::new(
        positive_f32(conf, "Viewport", "Width", default.viewport.width),
        positive_f32(conf, "Viewport", "Height", default.viewport.height),
    );
    let windows = JudgeWindows {
        perfect_s: positive_f32(conf, "Judge", "PerfectWindow", default.windows.perfect_s),
        good_s: positive_f32(conf, "Judge", "GoodWindow", default.windows.good_s),
        bad_s: positive_f32(conf, "Judge", "BadWindow", default.windows.bad_s),
        spatial_tolerance: positive_f32(
            conf,
            "Judge",
            "SpatialTolerance",
            default.windows.spatial_tolerance,
        ),
    }
    .sanitized();
    let auto_miss = conf
        .get_from(Some("Judge"), "AutoMiss")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map_or(default.auto_miss, |v| v != 0);
    let autoplay_offset_s = conf
        .get_from(Some("Autoplay"), "OffsetSeconds")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default.autoplay_offset_s);
    let frame_rate = positive_f32(conf, "Autoplay", "FrameRate", default.frame_rate);
    let realtime = conf
        .get_from(Some("Autoplay"), "Realtime")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map_or(default.realtime, |v| v != 0);
    let log_level = conf
        .get_from(Some("Options"), "LogLevel")
        .and_then(|v| LogLevel::from_str(v).ok())
        .unwrap_or(default.log_level);

    Config {
        viewport,
        windows,
        auto_miss,
        autoplay_offset_s,
        frame_rate,
        realtime,
        log_level,
    }
}

/// Reads the config at `path`, creating it with defaults first if missing.
/// Never fails: unreadable files fall back to defaults with a warning.
pub fn load<P: AsRef<Path>>(path: P) -> Config {
    let path = path.as_ref();
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(path) {
        Ok(conf) => {
            let cfg = from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using default values.", path.display());
            Config::default()
        }
    }
}
