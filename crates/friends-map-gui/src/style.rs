// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use friends_map_core::theme::{self, Rgb, ThemeDocument, ThemeVariable};
use iced::widget::{button, container, text_input};
use iced::{Background, Border, Color, Shadow, Theme};

pub const ACCENT: Color = Color::from_rgb(0.23, 0.51, 0.96); // #3b82f6
pub const DANGER: Color = Color::from_rgb(0.86, 0.21, 0.27); // #dc3545
pub const SUCCESS: Color = Color::from_rgb(0.2, 0.7, 0.3); // #33b34d

/// Colors resolved from the theme variables currently written to the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background_primary: Color,
    pub background_secondary: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub border: Color,
    pub accent: Color,
}

fn color(rgb: Rgb) -> Color {
    let [r, g, b] = rgb.to_unit();
    Color::from_rgb(r, g, b)
}

impl Palette {
    pub fn from_document(document: &ThemeDocument) -> Self {
        // A document nobody applied a theme to renders in the default scheme
        let fallback = document.theme().unwrap_or_default();
        let resolve = |variable: ThemeVariable| {
            color(
                document
                    .variable(variable)
                    .unwrap_or_else(|| fallback.variable(variable)),
            )
        };
        Self {
            background_primary: resolve(ThemeVariable::BackgroundPrimary),
            background_secondary: resolve(ThemeVariable::BackgroundSecondary),
            text_primary: resolve(ThemeVariable::TextPrimary),
            text_secondary: resolve(ThemeVariable::TextSecondary),
            border: resolve(ThemeVariable::BorderColor),
            accent: ACCENT,
        }
    }

    pub fn iced_theme(&self, scheme: theme::Theme) -> Theme {
        Theme::custom(
            format!("Friends Map {}", scheme),
            iced::theme::Palette {
                background: self.background_primary,
                text: self.text_primary,
                primary: self.accent,
                success: SUCCESS,
                danger: DANGER,
            },
        )
    }
}

// Container Styles
pub fn container_header(p: Palette) -> impl Fn(&Theme) -> container::Style {
    move |_| container::Style {
        background: Some(Background::Color(p.background_secondary)),
        text_color: Some(p.text_primary),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: 0.0.into(),
        },
        ..Default::default()
    }
}

pub fn container_sidebar(p: Palette) -> impl Fn(&Theme) -> container::Style {
    move |_| container::Style {
        background: Some(Background::Color(p.background_primary)),
        text_color: Some(p.text_primary),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: 0.0.into(),
        },
        ..Default::default()
    }
}

pub fn container_card(p: Palette) -> impl Fn(&Theme) -> container::Style {
    move |_| container::Style {
        background: Some(Background::Color(p.background_primary)),
        text_color: Some(p.text_primary),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: 8.0.into(),
        },
        shadow: Shadow {
            color: Color::from_rgba(0.0, 0.0, 0.0, 0.3),
            offset: iced::Vector::new(0.0, 4.0),
            blur_radius: 12.0,
        },
        ..Default::default()
    }
}

// Button Styles
pub fn button_primary(p: Palette) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |_, status| {
        let base = button::Style {
            background: Some(Background::Color(p.accent)),
            text_color: Color::WHITE,
            border: Border {
                radius: 6.0.into(),
                ..Default::default()
            },
            shadow: Shadow::default(),
        };

        match status {
            button::Status::Hovered => button::Style {
                background: Some(Background::Color(Color::from_rgb(0.3, 0.6, 1.0))),
                shadow: Shadow {
                    color: Color::from_rgba(0.23, 0.51, 0.96, 0.5),
                    offset: iced::Vector::new(0.0, 2.0),
                    blur_radius: 8.0,
                },
                ..base
            },
            button::Status::Disabled => button::Style {
                background: Some(Background::Color(p.border)),
                text_color: p.text_secondary,
                ..base
            },
            _ => base,
        }
    }
}

pub fn button_danger(p: Palette) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |_, status| {
        let base = button::Style {
            background: Some(Background::Color(DANGER)),
            text_color: Color::WHITE,
            border: Border {
                radius: 6.0.into(),
                ..Default::default()
            },
            shadow: Shadow::default(),
        };

        match status {
            button::Status::Hovered => button::Style {
                background: Some(Background::Color(Color::from_rgb(0.95, 0.3, 0.35))),
                ..base
            },
            button::Status::Disabled => button::Style {
                background: Some(Background::Color(p.border)),
                ..base
            },
            _ => base,
        }
    }
}

pub fn button_secondary(p: Palette) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |_, status| {
        let base = button::Style {
            background: Some(Background::Color(p.background_secondary)),
            text_color: p.text_primary,
            border: Border {
                color: p.border,
                width: 1.0,
                radius: 6.0.into(),
            },
            shadow: Shadow::default(),
        };

        match status {
            button::Status::Hovered => button::Style {
                border: Border {
                    color: p.accent,
                    width: 1.0,
                    radius: 6.0.into(),
                },
                ..base
            },
            _ => base,
        }
    }
}

/// Friend rows in the sidebar list; `active` marks the selected friend.
pub fn button_friend_row(
    p: Palette,
    active: bool,
) -> impl Fn(&Theme, button::Status) -> button::Style {
    move |_, status| {
        let base = button::Style {
            background: Some(Background::Color(if active {
                Color { a: 0.15, ..p.accent }
            } else {
                p.background_primary
            })),
            text_color: p.text_primary,
            border: Border {
                color: if active { p.accent } else { p.border },
                width: 1.0,
                radius: 8.0.into(),
            },
            shadow: Shadow::default(),
        };

        match status {
            button::Status::Hovered => button::Style {
                background: Some(Background::Color(p.background_secondary)),
                border: Border {
                    color: p.accent,
                    width: 1.0,
                    radius: 8.0.into(),
                },
                ..base
            },
            _ => base,
        }
    }
}

pub fn search_input(p: Palette) -> impl Fn(&Theme, text_input::Status) -> text_input::Style {
    move |_, status| {
        let border_color = match status {
            text_input::Status::Focused => p.accent,
            _ => p.border,
        };
        text_input::Style {
            background: Background::Color(p.background_primary),
            border: Border {
                color: border_color,
                width: 1.0,
                radius: 6.0.into(),
            },
            icon: p.text_secondary,
            placeholder: p.text_secondary,
            value: p.text_primary,
            selection: Color { a: 0.3, ..p.accent },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_follows_document() {
        let dark = Palette::from_document(&ThemeDocument::new(theme::Theme::Dark));
        let light = Palette::from_document(&ThemeDocument::new(theme::Theme::Light));
        assert_ne!(dark.background_primary, light.background_primary);
        assert_eq!(light.background_primary, Color::WHITE);
    }

    #[test]
    fn test_empty_document_uses_default_scheme() {
        let palette = Palette::from_document(&ThemeDocument::default());
        assert_eq!(
            palette,
            Palette::from_document(&ThemeDocument::new(theme::Theme::default()))
        );
    }
}
