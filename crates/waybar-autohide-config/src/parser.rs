//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "bar" => {
                config.bar = parse_bar(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

/// First positional (unnamed) argument of a node, as a string
fn first_string(node: &kdl::KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

/// First positional (unnamed) argument of a node, as an integer
fn first_i64(node: &kdl::KdlNode) -> Option<i64> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_i64())
}

/// First positional (unnamed) argument of a node, as a bool
fn first_bool(node: &kdl::KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}

/// Named property value of a node (`key="value"`), as a string
fn prop_string<'a>(node: &'a kdl::KdlNode, key: &str) -> Option<&'a str> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "poll-interval-ms" => {
                    if let Some(val) = first_i64(child) {
                        if val <= 0 {
                            return Err(ConfigError::Invalid {
                                message: format!("poll-interval-ms must be positive, got {}", val),
                            });
                        }
                        global.poll_interval_ms = val as u64;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_bar(node: &kdl::KdlNode) -> Result<BarConfig, ConfigError> {
    let mut bar = BarConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "edge" => {
                    if let Some(val) = first_string(child) {
                        bar.edge = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "thickness" => {
                    bar.thickness = positive_px(child, "thickness")?;
                }
                "reveal-margin" => {
                    bar.reveal_margin = non_negative_px(child, "reveal-margin")?;
                }
                "debounce-ms" => {
                    if let Some(val) = first_i64(child) {
                        if val < 0 {
                            return Err(ConfigError::Invalid {
                                message: format!("debounce-ms must not be negative, got {}", val),
                            });
                        }
                        bar.debounce_ms = val as u64;
                    }
                }
                "reveal-on-clear" => {
                    if let Some(val) = first_bool(child) {
                        bar.reveal_on_clear = val;
                    }
                }
                "monitor" => {
                    bar.monitor = first_string(child).map(|s| s.to_string());
                }
                "command" => {
                    bar.command = parse_command(child)?;
                }
                name => {
                    tracing::warn!("Unknown bar config option: {}", name);
                }
            }
        }
    }

    Ok(bar)
}

fn parse_command(node: &kdl::KdlNode) -> Result<BarCommand, ConfigError> {
    let children = node.children().ok_or_else(|| ConfigError::Invalid {
        message: "command requires a child node (signal or exec)".to_string(),
    })?;

    // Last entry wins if both are present, matching KDL's usual
    // override-by-repetition behaviour
    let mut command = None;

    for child in children.nodes() {
        match child.name().value() {
            "signal" => {
                let process = prop_string(child, "process")
                    .ok_or_else(|| ConfigError::MissingField {
                        field: "command signal process".to_string(),
                    })?
                    .to_string();
                command = Some(BarCommand::Signal { process });
            }
            "exec" => {
                let show = prop_string(child, "show")
                    .ok_or_else(|| ConfigError::MissingField {
                        field: "command exec show".to_string(),
                    })?
                    .to_string();
                let hide = prop_string(child, "hide")
                    .ok_or_else(|| ConfigError::MissingField {
                        field: "command exec hide".to_string(),
                    })?
                    .to_string();
                command = Some(BarCommand::Exec { show, hide });
            }
            name => {
                tracing::warn!("Unknown command type: {}", name);
            }
        }
    }

    command.ok_or_else(|| ConfigError::Invalid {
        message: "command requires a signal or exec child".to_string(),
    })
}

fn positive_px(node: &kdl::KdlNode, field: &str) -> Result<i32, ConfigError> {
    match first_i64(node) {
        Some(val) if val > 0 && val <= i32::MAX as i64 => Ok(val as i32),
        Some(val) => Err(ConfigError::Invalid {
            message: format!("{} must be a positive pixel count, got {}", field, val),
        }),
        None => Err(ConfigError::MissingField {
            field: field.to_string(),
        }),
    }
}

fn non_negative_px(node: &kdl::KdlNode, field: &str) -> Result<i32, ConfigError> {
    match first_i64(node) {
        Some(val) if val >= 0 && val <= i32::MAX as i64 => Ok(val as i32),
        Some(val) => Err(ConfigError::Invalid {
            message: format!("{} must not be negative, got {}", field, val),
        }),
        None => Err(ConfigError::MissingField {
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.bar.edge, Edge::Top);
        assert_eq!(config.bar.thickness, 32);
        assert_eq!(config.bar.debounce_ms, 300);
        assert!(!config.bar.reveal_on_clear);
        assert_eq!(config.global.poll_interval_ms, 80);
    }

    #[test]
    fn test_full_config() {
        let config = r#"
            global {
                log-level "debug"
                poll-interval-ms 50
            }
            bar {
                edge "bottom"
                thickness 28
                reveal-margin 10
                debounce-ms 500
                reveal-on-clear true
                monitor "DP-1"
                command {
                    signal process="waybar"
                }
            }
        "#;

        let config = parse_config_str(config).unwrap();

        assert_eq!(config.global.log_level, LogLevel::Debug);
        assert_eq!(config.global.poll_interval_ms, 50);
        assert_eq!(config.bar.edge, Edge::Bottom);
        assert_eq!(config.bar.thickness, 28);
        assert_eq!(config.bar.reveal_margin, 10);
        assert_eq!(config.bar.debounce_ms, 500);
        assert!(config.bar.reveal_on_clear);
        assert_eq!(config.bar.monitor.as_deref(), Some("DP-1"));
        assert_eq!(
            config.bar.command,
            BarCommand::Signal {
                process: "waybar".to_string()
            }
        );
    }

    #[test]
    fn test_exec_command() {
        let config = r#"
            bar {
                command {
                    exec show="waybar-msg show" hide="waybar-msg hide"
                }
            }
        "#;

        let config = parse_config_str(config).unwrap();

        assert_eq!(
            config.bar.command,
            BarCommand::Exec {
                show: "waybar-msg show".to_string(),
                hide: "waybar-msg hide".to_string(),
            }
        );
    }

    #[test]
    fn test_exec_command_missing_hide_is_error() {
        let config = r#"
            bar {
                command {
                    exec show="waybar-msg show"
                }
            }
        "#;

        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_unknown_edge_is_error() {
        let config = r#"
            bar {
                edge "sideways"
            }
        "#;

        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_negative_thickness_is_error() {
        let config = r#"
            bar {
                thickness -5
            }
        "#;

        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_negative_debounce_is_error() {
        let config = r#"
            bar {
                debounce-ms -1
            }
        "#;

        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        // Unknown nodes warn but must not fail the parse, so older configs
        // keep loading after options are removed
        let config = r#"
            shenanigans {
                foo "bar"
            }
            bar {
                edge "left"
                legacy-option 42
            }
        "#;

        let config = parse_config_str(config).unwrap();
        assert_eq!(config.bar.edge, Edge::Left);
    }

    #[test]
    fn test_malformed_kdl_is_parse_error() {
        let result = parse_config_str("bar { edge \"top\" ");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_edge_parsing_is_case_insensitive() {
        let config = r#"
            bar {
                edge "Bottom"
            }
        "#;

        let config = parse_config_str(config).unwrap();
        assert_eq!(config.bar.edge, Edge::Bottom);
    }
}
