use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed catalog of field kinds a schema tree may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Phone,
    Number,
    Select,
    Radio,
    Checkbox,
    Date,
    DateRange,
    Boolean,
    Slider,
    StarRating,
    EmojiRating,
    ScaleRating,
    FileUpload,
    Image,
    RichText,
    ColorPalette,
    Group,
    FlexRow,
    ConditionBlock,
    Title,
    Subtitle,
    Separator,
    Stepper,
}

impl FieldType {
    /// Every kind, in palette order.
    pub const ALL: [FieldType; 26] = [
        Self::Text,
        Self::Textarea,
        Self::Email,
        Self::Phone,
        Self::Number,
        Self::Select,
        Self::Radio,
        Self::Checkbox,
        Self::Date,
        Self::DateRange,
        Self::Boolean,
        Self::Slider,
        Self::StarRating,
        Self::EmojiRating,
        Self::ScaleRating,
        Self::FileUpload,
        Self::Image,
        Self::RichText,
        Self::ColorPalette,
        Self::Group,
        Self::FlexRow,
        Self::ConditionBlock,
        Self::Title,
        Self::Subtitle,
        Self::Separator,
        Self::Stepper,
    ];

    /// Container kinds own an ordered `children` sequence.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Group | Self::FlexRow | Self::ConditionBlock)
    }

    /// Static layout kinds never collect a value.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::Title | Self::Subtitle | Self::Separator | Self::Stepper
        )
    }

    /// Kinds whose configuration is an option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    /// Whether a rendered field of this kind produces a submitted value.
    pub fn collects_value(&self) -> bool {
        !self.is_container() && !self.is_static()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::DateRange => "date_range",
            Self::Boolean => "boolean",
            Self::Slider => "slider",
            Self::StarRating => "star_rating",
            Self::EmojiRating => "emoji_rating",
            Self::ScaleRating => "scale_rating",
            Self::FileUpload => "file_upload",
            Self::Image => "image",
            Self::RichText => "rich_text",
            Self::ColorPalette => "color_palette",
            Self::Group => "group",
            Self::FlexRow => "flex_row",
            Self::ConditionBlock => "condition_block",
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Separator => "separator",
            Self::Stepper => "stepper",
        }
    }

    /// Human label shown in the palette and used as a new field's label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Textarea => "Long text",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Number => "Number",
            Self::Select => "Select",
            Self::Radio => "Radio",
            Self::Checkbox => "Checkbox",
            Self::Date => "Date",
            Self::DateRange => "Date range",
            Self::Boolean => "Yes / No",
            Self::Slider => "Slider",
            Self::StarRating => "Star rating",
            Self::EmojiRating => "Emoji rating",
            Self::ScaleRating => "Scale rating",
            Self::FileUpload => "File upload",
            Self::Image => "Image",
            Self::RichText => "Rich text",
            Self::ColorPalette => "Color palette",
            Self::Group => "Group",
            Self::FlexRow => "Row",
            Self::ConditionBlock => "Condition",
            Self::Title => "Title",
            Self::Subtitle => "Subtitle",
            Self::Separator => "Separator",
            Self::Stepper => "Stepper",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_containers() {
        let containers: Vec<_> = FieldType::ALL.iter().filter(|t| t.is_container()).collect();
        assert_eq!(
            containers,
            vec![&FieldType::Group, &FieldType::FlexRow, &FieldType::ConditionBlock]
        );
    }

    #[test]
    fn as_str_matches_serde_name() {
        for kind in FieldType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
