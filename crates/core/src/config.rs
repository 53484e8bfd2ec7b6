//! Type-specific configuration carried by every field node.
//!
//! `FieldConfig` is keyed by field type: the variant *is* the node's type, so a
//! node's config can never disagree with it. Each variant wraps a settings
//! struct implementing [`FieldSettings`], whose `Default` is what the palette
//! hands out for a freshly dropped field.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field_type::FieldType;

/// Capability every per-type settings struct provides.
pub trait FieldSettings: Default + Clone + PartialEq {
    /// Structural check of the settings. Returns the reason on failure.
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSettings {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
}

impl FieldSettings for TextSettings {
    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(format!("minLength {min} exceeds maxLength {max}"));
            }
        }
        if matches!(&self.pattern, Some(p) if p.is_empty()) {
            return Err("pattern is empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberSettings {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl FieldSettings for NumberSettings {
    fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min {min} exceeds max {max}"));
            }
        }
        if matches!(self.step, Some(step) if step <= 0.0) {
            return Err("step must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceSettings {
    pub options: Vec<ChoiceOption>,
    pub allow_other: bool,
}

impl Default for ChoiceSettings {
    fn default() -> Self {
        Self {
            options: vec![
                ChoiceOption::new("Option 1", "option_1"),
                ChoiceOption::new("Option 2", "option_2"),
            ],
            allow_other: false,
        }
    }
}

impl FieldSettings for ChoiceSettings {
    fn validate(&self) -> Result<(), String> {
        if self.options.is_empty() {
            return Err("at least one option is required".into());
        }
        let mut seen = std::collections::HashSet::new();
        for option in &self.options {
            if option.value.is_empty() {
                return Err(format!("option {:?} has an empty value", option.label));
            }
            if !seen.insert(option.value.as_str()) {
                return Err(format!("duplicate option value {:?}", option.value));
            }
        }
        Ok(())
    }
}

/// Dates are ISO-8601 calendar strings (`YYYY-MM-DD`), so ordering them as
/// strings orders them as dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateSettings {
    pub min_date: Option<String>,
    pub max_date: Option<String>,
}

impl FieldSettings for DateSettings {
    fn validate(&self) -> Result<(), String> {
        for date in [&self.min_date, &self.max_date].into_iter().flatten() {
            if !is_iso_date(date) {
                return Err(format!("{date:?} is not a YYYY-MM-DD date"));
            }
        }
        if let (Some(min), Some(max)) = (&self.min_date, &self.max_date) {
            if min > max {
                return Err(format!("minDate {min} is after maxDate {max}"));
            }
        }
        Ok(())
    }
}

fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BooleanSettings {
    pub default_value: bool,
}

impl FieldSettings for BooleanSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SliderSettings {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default_value: Option<f64>,
}

impl Default for SliderSettings {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            step: 1.0,
            default_value: None,
        }
    }
}

impl FieldSettings for SliderSettings {
    fn validate(&self) -> Result<(), String> {
        if self.min >= self.max {
            return Err(format!("min {} must be below max {}", self.min, self.max));
        }
        if self.step <= 0.0 {
            return Err("step must be positive".into());
        }
        if let Some(value) = self.default_value {
            if value < self.min || value > self.max {
                return Err(format!("default {value} outside {}..={}", self.min, self.max));
            }
        }
        Ok(())
    }
}

pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingSettings {
    pub max: u8,
    pub low_label: Option<String>,
    pub high_label: Option<String>,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            max: 5,
            low_label: None,
            high_label: None,
        }
    }
}

impl FieldSettings for RatingSettings {
    fn validate(&self) -> Result<(), String> {
        if self.max == 0 || self.max > MAX_RATING {
            return Err(format!("max must be within 1..={MAX_RATING}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileSettings {
    /// Accepted MIME types or extensions; empty accepts anything.
    pub accept: Vec<String>,
    pub max_size_mb: u32,
    pub max_files: u32,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            max_size_mb: 10,
            max_files: 1,
        }
    }
}

impl FieldSettings for FileSettings {
    fn validate(&self) -> Result<(), String> {
        if self.max_size_mb == 0 {
            return Err("maxSizeMb must be positive".into());
        }
        if self.max_files == 0 {
            return Err("maxFiles must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageSettings {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
}

impl FieldSettings for ImageSettings {
    fn validate(&self) -> Result<(), String> {
        if self.width == Some(0) {
            return Err("width must be positive".into());
        }
        Ok(())
    }
}

/// Long-form content edited out of band by the rich-content editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RichTextSettings {
    pub content: String,
}

impl FieldSettings for RichTextSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorPaletteSettings {
    pub colors: Vec<String>,
    pub allow_custom: bool,
}

impl Default for ColorPaletteSettings {
    fn default() -> Self {
        Self {
            colors: ["#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#8b5cf6"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_custom: false,
        }
    }
}

impl FieldSettings for ColorPaletteSettings {
    fn validate(&self) -> Result<(), String> {
        if self.colors.is_empty() && !self.allow_custom {
            return Err("no colors to choose from".into());
        }
        match self.colors.iter().find(|c| !is_hex_color(c)) {
            Some(bad) => Err(format!("{bad:?} is not a #rrggbb color")),
            None => Ok(()),
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupSettings {
    pub collapsible: bool,
}

impl FieldSettings for GroupSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlexRowSettings {
    pub gap: u32,
    pub wrap: bool,
}

impl Default for FlexRowSettings {
    fn default() -> Self {
        Self { gap: 16, wrap: true }
    }
}

impl FieldSettings for FlexRowSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A condition block's rule lives on the node itself, not in its config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionBlockSettings {}

impl FieldSettings for ConditionBlockSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadingSettings {
    pub text: String,
}

impl FieldSettings for HeadingSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeparatorSettings {
    pub spacing: u32,
}

impl Default for SeparatorSettings {
    fn default() -> Self {
        Self { spacing: 16 }
    }
}

impl FieldSettings for SeparatorSettings {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepperSettings {
    pub steps: Vec<String>,
}

impl Default for StepperSettings {
    fn default() -> Self {
        Self {
            steps: vec!["Step 1".into(), "Step 2".into()],
        }
    }
}

impl FieldSettings for StepperSettings {
    fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("at least one step is required".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum FieldConfig {
    Text(TextSettings),
    Textarea(TextSettings),
    Email(TextSettings),
    Phone(TextSettings),
    Number(NumberSettings),
    Select(ChoiceSettings),
    Radio(ChoiceSettings),
    Checkbox(ChoiceSettings),
    Date(DateSettings),
    DateRange(DateSettings),
    Boolean(BooleanSettings),
    Slider(SliderSettings),
    StarRating(RatingSettings),
    EmojiRating(RatingSettings),
    ScaleRating(RatingSettings),
    FileUpload(FileSettings),
    Image(ImageSettings),
    RichText(RichTextSettings),
    ColorPalette(ColorPaletteSettings),
    Group(GroupSettings),
    FlexRow(FlexRowSettings),
    ConditionBlock(ConditionBlockSettings),
    Title(HeadingSettings),
    Subtitle(HeadingSettings),
    Separator(SeparatorSettings),
    Stepper(StepperSettings),
}

impl FieldConfig {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Textarea(_) => FieldType::Textarea,
            Self::Email(_) => FieldType::Email,
            Self::Phone(_) => FieldType::Phone,
            Self::Number(_) => FieldType::Number,
            Self::Select(_) => FieldType::Select,
            Self::Radio(_) => FieldType::Radio,
            Self::Checkbox(_) => FieldType::Checkbox,
            Self::Date(_) => FieldType::Date,
            Self::DateRange(_) => FieldType::DateRange,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Slider(_) => FieldType::Slider,
            Self::StarRating(_) => FieldType::StarRating,
            Self::EmojiRating(_) => FieldType::EmojiRating,
            Self::ScaleRating(_) => FieldType::ScaleRating,
            Self::FileUpload(_) => FieldType::FileUpload,
            Self::Image(_) => FieldType::Image,
            Self::RichText(_) => FieldType::RichText,
            Self::ColorPalette(_) => FieldType::ColorPalette,
            Self::Group(_) => FieldType::Group,
            Self::FlexRow(_) => FieldType::FlexRow,
            Self::ConditionBlock(_) => FieldType::ConditionBlock,
            Self::Title(_) => FieldType::Title,
            Self::Subtitle(_) => FieldType::Subtitle,
            Self::Separator(_) => FieldType::Separator,
            Self::Stepper(_) => FieldType::Stepper,
        }
    }

    /// The configuration a freshly created field of `field_type` starts with.
    pub fn defaults_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Self::Text(TextSettings::default()),
            FieldType::Textarea => Self::Textarea(TextSettings::default()),
            FieldType::Email => Self::Email(TextSettings {
                pattern: Some(r"^[^@\s]+@[^@\s]+\.[^@\s]+$".into()),
                ..TextSettings::default()
            }),
            FieldType::Phone => Self::Phone(TextSettings::default()),
            FieldType::Number => Self::Number(NumberSettings::default()),
            FieldType::Select => Self::Select(ChoiceSettings::default()),
            FieldType::Radio => Self::Radio(ChoiceSettings::default()),
            FieldType::Checkbox => Self::Checkbox(ChoiceSettings::default()),
            FieldType::Date => Self::Date(DateSettings::default()),
            FieldType::DateRange => Self::DateRange(DateSettings::default()),
            FieldType::Boolean => Self::Boolean(BooleanSettings::default()),
            FieldType::Slider => Self::Slider(SliderSettings::default()),
            FieldType::StarRating => Self::StarRating(RatingSettings::default()),
            FieldType::EmojiRating => Self::EmojiRating(RatingSettings::default()),
            FieldType::ScaleRating => Self::ScaleRating(RatingSettings {
                max: MAX_RATING,
                low_label: Some("Not likely".into()),
                high_label: Some("Very likely".into()),
            }),
            FieldType::FileUpload => Self::FileUpload(FileSettings::default()),
            FieldType::Image => Self::Image(ImageSettings::default()),
            FieldType::RichText => Self::RichText(RichTextSettings::default()),
            FieldType::ColorPalette => Self::ColorPalette(ColorPaletteSettings::default()),
            FieldType::Group => Self::Group(GroupSettings::default()),
            FieldType::FlexRow => Self::FlexRow(FlexRowSettings::default()),
            FieldType::ConditionBlock => Self::ConditionBlock(ConditionBlockSettings::default()),
            FieldType::Title => Self::Title(HeadingSettings {
                text: "Title".into(),
            }),
            FieldType::Subtitle => Self::Subtitle(HeadingSettings {
                text: "Subtitle".into(),
            }),
            FieldType::Separator => Self::Separator(SeparatorSettings::default()),
            FieldType::Stepper => Self::Stepper(StepperSettings::default()),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let result = match self {
            Self::Text(s) | Self::Textarea(s) | Self::Email(s) | Self::Phone(s) => s.validate(),
            Self::Number(s) => s.validate(),
            Self::Select(s) | Self::Radio(s) | Self::Checkbox(s) => s.validate(),
            Self::Date(s) | Self::DateRange(s) => s.validate(),
            Self::Boolean(s) => s.validate(),
            Self::Slider(s) => s.validate(),
            Self::StarRating(s) | Self::EmojiRating(s) | Self::ScaleRating(s) => s.validate(),
            Self::FileUpload(s) => s.validate(),
            Self::Image(s) => s.validate(),
            Self::RichText(s) => s.validate(),
            Self::ColorPalette(s) => s.validate(),
            Self::Group(s) => s.validate(),
            Self::FlexRow(s) => s.validate(),
            Self::ConditionBlock(s) => s.validate(),
            Self::Title(s) | Self::Subtitle(s) => s.validate(),
            Self::Separator(s) => s.validate(),
            Self::Stepper(s) => s.validate(),
        };
        result.map_err(|reason| CoreError::invalid_config(self.field_type(), reason))
    }

    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            Self::Select(s) | Self::Radio(s) | Self::Checkbox(s) => Some(&s.options),
            _ => None,
        }
    }

    pub fn rich_text_content(&self) -> Option<&str> {
        match self {
            Self::RichText(s) => Some(&s.content),
            _ => None,
        }
    }

    /// Returns false (and leaves the config alone) for non rich-text kinds.
    pub fn set_rich_text_content(&mut self, content: String) -> bool {
        match self {
            Self::RichText(s) => {
                s.content = content;
                true
            }
            _ => false,
        }
    }
}
