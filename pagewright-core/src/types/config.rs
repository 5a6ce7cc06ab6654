//! Formatting configuration shared by the preview and every export format

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FONT_SIZE_RANGE: (f32, f32) = (8.0, 36.0);
pub const LINE_HEIGHT_RANGE: (f32, f32) = (1.0, 3.0);
pub const PADDING_RANGE: (f32, f32) = (0.0, 200.0);
pub const PAGE_DIMENSION_RANGE: (f32, f32) = (200.0, 4000.0);

/// Where the page number is printed in the footer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageNumberAlignment {
    Left,
    #[default]
    Center,
    Right,
    /// No page numbers
    None,
}

impl PageNumberAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageNumberAlignment::Left => "left",
            PageNumberAlignment::Center => "center",
            PageNumberAlignment::Right => "right",
            PageNumberAlignment::None => "none",
        }
    }
}

impl fmt::Display for PageNumberAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageNumberAlignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(PageNumberAlignment::Left),
            "center" | "centre" => Ok(PageNumberAlignment::Center),
            "right" => Ok(PageNumberAlignment::Right),
            "none" | "off" => Ok(PageNumberAlignment::None),
            _ => Err(ConfigError::InvalidValue {
                field: "page_number_alignment".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Formatting configuration.
///
/// Persisted independently of any book. Sizes are CSS pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    pub font_family: String,
    pub font_size: f32,
    /// Line height multiplier
    pub line_height: f32,
    pub text_color: String,
    pub background_color: String,
    pub page_padding: f32,
    pub page_number_alignment: PageNumberAlignment,
    pub page_width: f32,
    pub page_height: f32,
    /// Custom running header; overrides the book title
    pub header_text: Option<String>,
    /// Use the book title as running header when no custom text is set
    pub title_in_header: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            font_family: "Georgia".to_string(),
            font_size: 12.0,
            line_height: 1.5,
            text_color: "#222222".to_string(),
            background_color: "#ffffff".to_string(),
            page_padding: 48.0,
            page_number_alignment: PageNumberAlignment::Center,
            page_width: 794.0,
            page_height: 1123.0,
            header_text: None,
            title_in_header: true,
        }
    }
}

impl Configuration {
    /// Keys accepted by [`Configuration::set_field`] and the settings store
    pub const FIELDS: &'static [&'static str] = &[
        "font_family",
        "font_size",
        "line_height",
        "text_color",
        "background_color",
        "page_padding",
        "page_number_alignment",
        "page_width",
        "page_height",
        "header_text",
        "title_in_header",
    ];

    /// Check every bounded field, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("font_size", self.font_size, FONT_SIZE_RANGE)?;
        check_range("line_height", self.line_height, LINE_HEIGHT_RANGE)?;
        check_range("page_padding", self.page_padding, PADDING_RANGE)?;
        check_range("page_width", self.page_width, PAGE_DIMENSION_RANGE)?;
        check_range("page_height", self.page_height, PAGE_DIMENSION_RANGE)?;
        check_color("text_color", &self.text_color)?;
        check_color("background_color", &self.background_color)?;
        if self.font_family.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "font_family".to_string(),
                value: self.font_family.clone(),
            });
        }
        Ok(())
    }

    /// Height of one line of body text
    pub fn line_band(&self) -> f32 {
        self.font_size * self.line_height
    }

    /// Width available to text inside the padding
    pub fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.page_padding).max(self.font_size)
    }

    /// Height available to page content once header and footer bands are reserved
    pub fn content_height(&self, has_header: bool) -> f32 {
        let mut height = self.page_height - 2.0 * self.page_padding;
        if has_header {
            height -= self.line_band();
        }
        if self.page_number_alignment != PageNumberAlignment::None {
            height -= self.line_band();
        }
        height.max(self.line_band())
    }

    /// Current value of a field rendered as a string
    pub fn get_field(&self, key: &str) -> Option<String> {
        let value = match key {
            "font_family" => self.font_family.clone(),
            "font_size" => self.font_size.to_string(),
            "line_height" => self.line_height.to_string(),
            "text_color" => self.text_color.clone(),
            "background_color" => self.background_color.clone(),
            "page_padding" => self.page_padding.to_string(),
            "page_number_alignment" => self.page_number_alignment.to_string(),
            "page_width" => self.page_width.to_string(),
            "page_height" => self.page_height.to_string(),
            "header_text" => self.header_text.clone().unwrap_or_default(),
            "title_in_header" => self.title_in_header.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Parse and assign a single field. The whole configuration is not
    /// re-validated; call [`Configuration::validate`] afterwards.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "font_family" => self.font_family = value.trim().to_string(),
            "font_size" => self.font_size = parse_number(key, value)?,
            "line_height" => self.line_height = parse_number(key, value)?,
            "text_color" => self.text_color = value.trim().to_string(),
            "background_color" => self.background_color = value.trim().to_string(),
            "page_padding" => self.page_padding = parse_number(key, value)?,
            "page_number_alignment" => self.page_number_alignment = value.parse()?,
            "page_width" => self.page_width = parse_number(key, value)?,
            "page_height" => self.page_height = parse_number(key, value)?,
            "header_text" => {
                self.header_text = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "title_in_header" => {
                self.title_in_header =
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            field: key.to_string(),
                            value: value.to_string(),
                        })?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Running header for a book with the given title
    pub fn running_header(&self, book_title: &str) -> Option<String> {
        match &self.header_text {
            Some(text) if !text.trim().is_empty() => Some(text.clone()),
            _ if self.title_in_header && !book_title.trim().is_empty() => {
                Some(book_title.to_string())
            }
            _ => None,
        }
    }
}

/// Parse `#RGB` or `#RRGGBB` into components
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut parts = hex.chars().map(|c| {
                let v = c.to_digit(16).unwrap_or(0) as u8;
                v * 16 + v
            });
            Some((parts.next()?, parts.next()?, parts.next()?))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

fn check_range(field: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_color(field: &'static str, value: &str) -> Result<(), ConfigError> {
    parse_hex_color(value)
        .map(|_| ())
        .ok_or_else(|| ConfigError::InvalidColor {
            field,
            value: value.to_string(),
        })
}

fn parse_number(field: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}
