use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::{FontId, LayoutConfig, ProximityThresholds, Rgba, StyleDefaults};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub layout: LayoutConfig,
    pub style: StyleDefaults,
    pub merge: ProximityThresholds,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    layout: Option<LayoutSettings>,
    spacing: Option<SpacingSettings>,
    style: Option<StyleSettings>,
    merge: Option<MergeSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSettings {
    text_padding: Option<i32>,
    bubble_shrink: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct SpacingSettings {
    h_char: Option<i32>,
    h_line: Option<i32>,
    v_char: Option<i32>,
    v_column: Option<i32>,
    h_manual_break_extra: Option<i32>,
    v_manual_break_extra: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct StyleSettings {
    font_name: Option<String>,
    font_size: Option<u32>,
    main_color: Option<String>,
    outline_color: Option<String>,
    outline_thickness: Option<u32>,
    background_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    max_vertical_diff_ratio: Option<f32>,
    max_horizontal_gap_ratio: Option<f32>,
    max_backtrack_ratio: Option<f32>,
}

/// Loads settings layered from the working directory, the home directory and
/// an optional explicit file; later layers win.
///
/// Calling this again is how a running caller reloads its configuration.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_toml(&content).with_context(|| {
                format!("failed to parse settings: {}", path.display())
            })?;
        }
    }

    Ok(settings)
}

impl Settings {
    /// Applies one TOML layer; unset or invalid values keep what is there.
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(layout) = incoming.layout {
            if let Some(padding) = layout.text_padding
                && padding >= 0
            {
                self.layout.text_padding = padding;
            }
            if let Some(shrink) = layout.bubble_shrink
                && shrink > 0.0
                && shrink <= 1.0
            {
                self.layout.bubble_shrink = shrink;
            }
        }
        if let Some(spacing) = incoming.spacing {
            let target = &mut self.layout.spacing;
            if let Some(value) = spacing.h_char {
                target.char_spacing_h = value;
            }
            if let Some(value) = spacing.h_line {
                target.line_spacing_h = value;
            }
            if let Some(value) = spacing.v_char {
                target.char_spacing_v = value;
            }
            if let Some(value) = spacing.v_column {
                target.col_spacing_v = value;
            }
            if let Some(value) = spacing.h_manual_break_extra {
                target.manual_break_extra_h = value;
            }
            if let Some(value) = spacing.v_manual_break_extra {
                target.manual_break_extra_v = value;
            }
        }
        if let Some(style) = incoming.style {
            if let Some(name) = style.font_name
                && !name.trim().is_empty()
            {
                self.style.font = FontId::new(name.trim());
            }
            if let Some(size) = style.font_size
                && size > 0
            {
                self.style.font_size_px = size;
            }
            if let Some(color) = style.main_color.as_deref().and_then(Rgba::parse) {
                self.style.main_color = color;
            }
            if let Some(color) = style.outline_color.as_deref().and_then(Rgba::parse) {
                self.style.outline_color = color;
            }
            if let Some(color) = style.background_color.as_deref().and_then(Rgba::parse) {
                self.style.background_color = color;
            }
            if let Some(thickness) = style.outline_thickness {
                self.style.outline_thickness = thickness;
            }
        }
        if let Some(merge) = incoming.merge {
            let positive = |value: Option<f32>| value.filter(|ratio| *ratio > 0.0);
            if let Some(ratio) = positive(merge.max_vertical_diff_ratio) {
                self.merge.max_vertical_diff_ratio = ratio;
            }
            if let Some(ratio) = positive(merge.max_horizontal_gap_ratio) {
                self.merge.max_horizontal_gap_ratio = ratio;
            }
            if let Some(ratio) = positive(merge.max_backtrack_ratio) {
                self.merge.max_backtrack_ratio = ratio;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".overlay-layout-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn bundled_defaults_match_built_in_defaults() {
        let mut settings = Settings::default();
        settings.merge_toml(DEFAULT_SETTINGS_TOML).expect("bundled settings");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn layers_override_and_ignore_invalid_values() {
        let mut settings = Settings::default();
        settings
            .merge_toml(
                r##"
[layout]
text_padding = -4
bubble_shrink = 0.8

[spacing]
h_line = -3
v_column = 6

[style]
font_name = "  "
font_size = 0
main_color = "#ff0000"
background_color = "not a colour"

[merge]
max_horizontal_gap_ratio = 2.0
max_backtrack_ratio = -1.0
"##,
            )
            .expect("parse");
        assert_eq!(settings.layout.text_padding, 3);
        assert_eq!(settings.layout.bubble_shrink, 0.8);
        assert_eq!(settings.layout.spacing.line_spacing_h, -3);
        assert_eq!(settings.layout.spacing.col_spacing_v, 6);
        assert_eq!(settings.style.font, FontId::new("msyh.ttc"));
        assert_eq!(settings.style.font_size_px, 24);
        assert_eq!(settings.style.main_color, Rgba::new(255, 0, 0, 255));
        assert_eq!(
            settings.style.background_color,
            StyleDefaults::DEFAULT_BACKGROUND_COLOR
        );
        assert_eq!(settings.merge.max_horizontal_gap_ratio, 2.0);
        assert_eq!(settings.merge.max_backtrack_ratio, 0.5);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut settings = Settings::default();
        assert!(settings.merge_toml("[spacing\nh_char = 1").is_err());
    }

    #[test]
    fn load_writes_home_file_and_applies_extra_path() {
        with_temp_home(|home| {
            let extra = home.join("custom.toml");
            fs::write(&extra, "[spacing]\nh_char = 2\n").expect("write custom");
            let settings = load_settings(Some(&extra)).expect("load settings");
            assert_eq!(settings.layout.spacing.char_spacing_h, 2);
            assert!(home.join(".overlay-layout-rust").join("settings.toml").exists());

            let missing = home.join("missing.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }
}
