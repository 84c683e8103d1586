//! Configuration data model

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub global: GlobalConfig,
    pub bar: BarConfig,
}

/// Global settings
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Pointer poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            poll_interval_ms: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string accepted by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Screen edge the bar is attached to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Edge {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::str::FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(format!("Unknown edge: {} (expected top/bottom/left/right)", s)),
        }
    }
}

/// Bar geometry and autohide behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct BarConfig {
    /// Edge the bar occupies
    pub edge: Edge,
    /// Bar thickness in pixels, measured inward from the edge
    pub thickness: i32,
    /// Extra pixels past the edge that count as the hover reveal zone
    pub reveal_margin: i32,
    /// Quiet period before a pending hide is applied, in milliseconds
    pub debounce_ms: u64,
    /// Show the bar again as soon as the overlap clears, without hover
    pub reveal_on_clear: bool,
    /// Monitor (output) name the bar lives on; `None` picks the focused one
    pub monitor: Option<String>,
    /// How show/hide decisions reach the bar process
    pub command: BarCommand,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            edge: Edge::Top,
            thickness: 32,
            reveal_margin: 5,
            debounce_ms: 300,
            reveal_on_clear: false,
            monitor: None,
            command: BarCommand::default(),
        }
    }
}

/// Control channel used to apply a visibility decision
#[derive(Debug, Clone, PartialEq)]
pub enum BarCommand {
    /// Send SIGUSR1 (waybar's visibility toggle) to every process whose
    /// comm matches `process`
    Signal { process: String },
    /// Run a shell command for each direction
    Exec { show: String, hide: String },
}

impl Default for BarCommand {
    fn default() -> Self {
        Self::Signal {
            process: "waybar".to_string(),
        }
    }
}
