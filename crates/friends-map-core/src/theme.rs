// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const THEME_ATTRIBUTE: &str = "data-theme";

/// Only the two explicit themes exist; the system colour scheme is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThemeVariable {
    BackgroundPrimary,
    BackgroundSecondary,
    TextPrimary,
    TextSecondary,
    BorderColor,
}

impl ThemeVariable {
    pub const ALL: [ThemeVariable; 5] = [
        ThemeVariable::BackgroundPrimary,
        ThemeVariable::BackgroundSecondary,
        ThemeVariable::TextPrimary,
        ThemeVariable::TextSecondary,
        ThemeVariable::BorderColor,
    ];

    pub fn css_name(self) -> &'static str {
        match self {
            ThemeVariable::BackgroundPrimary => "--bg-primary",
            ThemeVariable::BackgroundSecondary => "--bg-secondary",
            ThemeVariable::TextPrimary => "--text-primary",
            ThemeVariable::TextSecondary => "--text-secondary",
            ThemeVariable::BorderColor => "--border-color",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    /// Channels scaled to `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const DARK_VARIABLES: [(ThemeVariable, Rgb); 5] = [
    (ThemeVariable::BackgroundPrimary, Rgb::hex(0x1a1a1a)),
    (ThemeVariable::BackgroundSecondary, Rgb::hex(0x2d2d2d)),
    (ThemeVariable::TextPrimary, Rgb::hex(0xffffff)),
    (ThemeVariable::TextSecondary, Rgb::hex(0xcccccc)),
    (ThemeVariable::BorderColor, Rgb::hex(0x404040)),
];

const LIGHT_VARIABLES: [(ThemeVariable, Rgb); 5] = [
    (ThemeVariable::BackgroundPrimary, Rgb::hex(0xffffff)),
    (ThemeVariable::BackgroundSecondary, Rgb::hex(0xf8f9fa)),
    (ThemeVariable::TextPrimary, Rgb::hex(0x333333)),
    (ThemeVariable::TextSecondary, Rgb::hex(0x666666)),
    (ThemeVariable::BorderColor, Rgb::hex(0xe9ecef)),
];

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn variables(self) -> &'static [(ThemeVariable, Rgb); 5] {
        match self {
            Theme::Light => &LIGHT_VARIABLES,
            Theme::Dark => &DARK_VARIABLES,
        }
    }

    pub fn variable(self, variable: ThemeVariable) -> Rgb {
        self.variables()
            .iter()
            .find(|(v, _)| *v == variable)
            .map(|(_, rgb)| *rgb)
            .unwrap_or(Rgb::hex(0x000000))
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Receives the writes of [`apply_theme`].
pub trait StyleTarget {
    fn set_attribute(&mut self, name: &str, value: &str);
    fn set_variable(&mut self, variable: ThemeVariable, value: Rgb);
}

pub fn apply_theme<T: StyleTarget + ?Sized>(target: &mut T, theme: Theme) {
    target.set_attribute(THEME_ATTRIBUTE, theme.as_str());
    for (variable, value) in theme.variables() {
        target.set_variable(*variable, *value);
    }
    log::debug!("[Theme] Applied {}", theme);
}

/// Document-level attributes and style variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeDocument {
    attributes: BTreeMap<String, String>,
    variables: BTreeMap<ThemeVariable, Rgb>,
}

impl ThemeDocument {
    pub fn new(theme: Theme) -> Self {
        let mut document = Self::default();
        apply_theme(&mut document, theme);
        document
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn variable(&self, variable: ThemeVariable) -> Option<Rgb> {
        self.variables.get(&variable).copied()
    }

    pub fn theme(&self) -> Option<Theme> {
        self.attribute(THEME_ATTRIBUTE)?.parse().ok()
    }

    pub fn to_css(&self) -> String {
        let selector = match self.attribute(THEME_ATTRIBUTE) {
            Some(theme) => format!(":root[{}=\"{}\"]", THEME_ATTRIBUTE, theme),
            None => ":root".to_string(),
        };
        let mut css = format!("{} {{\n", selector);
        for (variable, value) in &self.variables {
            css.push_str(&format!("  {}: {};\n", variable.css_name(), value));
        }
        css.push('}');
        css
    }
}

impl StyleTarget for ThemeDocument {
    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn set_variable(&mut self, variable: ThemeVariable, value: Rgb) {
        self.variables.insert(variable, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        writes: Vec<(String, String)>,
    }

    impl StyleTarget for RecordingTarget {
        fn set_attribute(&mut self, name: &str, value: &str) {
            self.writes.push((name.to_string(), value.to_string()));
        }

        fn set_variable(&mut self, variable: ThemeVariable, value: Rgb) {
            self.writes
                .push((variable.css_name().to_string(), value.to_string()));
        }
    }

    #[test]
    fn test_dark_table() {
        let doc = ThemeDocument::new(Theme::Dark);
        assert_eq!(doc.attribute("data-theme"), Some("dark"));
        assert_eq!(
            doc.variable(ThemeVariable::BackgroundPrimary).unwrap().to_string(),
            "#1a1a1a"
        );
        assert_eq!(
            doc.variable(ThemeVariable::BorderColor).unwrap().to_string(),
            "#404040"
        );
    }

    #[test]
    fn test_light_table() {
        let doc = ThemeDocument::new(Theme::Light);
        assert_eq!(doc.theme(), Some(Theme::Light));
        assert_eq!(
            doc.variable(ThemeVariable::BackgroundSecondary).unwrap().to_string(),
            "#f8f9fa"
        );
        assert_eq!(Theme::Light.variable(ThemeVariable::TextSecondary), Rgb::hex(0x666666));
    }

    #[test]
    fn test_apply_writes_every_variable() {
        let mut target = RecordingTarget::default();
        apply_theme(&mut target, Theme::Dark);
        assert_eq!(target.writes.len(), 1 + ThemeVariable::ALL.len());
        assert_eq!(target.writes[0], ("data-theme".to_string(), "dark".to_string()));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut doc = ThemeDocument::new(Theme::Dark);
        let before = doc.clone();
        apply_theme(&mut doc, Theme::Dark);
        assert_eq!(doc, before);

        apply_theme(&mut doc, Theme::Light);
        assert_eq!(doc, ThemeDocument::new(Theme::Light));
    }

    #[test]
    fn test_toggle_and_parse() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle().toggle(), Theme::Dark);
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("auto".parse::<Theme>().is_err());
    }

    #[test]
    fn test_css_rendering() {
        let css = ThemeDocument::new(Theme::Light).to_css();
        assert!(css.starts_with(":root[data-theme=\"light\"] {"));
        assert!(css.contains("  --text-primary: #333333;\n"));
    }
}
