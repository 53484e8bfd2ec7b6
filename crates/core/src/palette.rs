use std::fmt;
use std::sync::Arc;

use crate::config::FieldConfig;
use crate::field_type::FieldType;
use crate::ids::FieldId;
use crate::node::{Field, FieldNode};
use crate::tree::FieldTree;

type ConfigFactory = Arc<dyn Fn() -> FieldConfig + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteSection {
    Inputs,
    Choices,
    Media,
    Layout,
}

/// One draggable item of the palette.
#[derive(Clone)]
pub struct PaletteEntry {
    pub field_type: FieldType,
    pub section: PaletteSection,
    factory: ConfigFactory,
}

impl PaletteEntry {
    pub fn new(
        field_type: FieldType,
        section: PaletteSection,
        factory: impl Fn() -> FieldConfig + Send + Sync + 'static,
    ) -> Self {
        Self {
            field_type,
            section,
            factory: Arc::new(factory),
        }
    }

    /// An entry handing out the built-in defaults for `field_type`.
    pub fn standard(field_type: FieldType) -> Self {
        Self::new(field_type, section_of(field_type), move || {
            FieldConfig::defaults_for(field_type)
        })
    }

    pub fn default_config(&self) -> FieldConfig {
        let config = (self.factory)();
        if config.field_type() == self.field_type {
            config
        } else {
            tracing::warn!(
                field_type = %self.field_type,
                produced = %config.field_type(),
                "palette factory produced a config of another type, using defaults"
            );
            FieldConfig::defaults_for(self.field_type)
        }
    }

    /// A new node of this entry's type with the given id.
    pub fn instantiate(&self, id: FieldId) -> FieldNode {
        let mut field = Field::new(id, self.default_config());
        if self.field_type != FieldType::Separator {
            field.label = Some(self.field_type.display_name().to_string());
        }
        FieldNode::new(field)
    }
}

impl fmt::Debug for PaletteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaletteEntry")
            .field("field_type", &self.field_type)
            .field("section", &self.section)
            .finish_non_exhaustive()
    }
}

fn section_of(field_type: FieldType) -> PaletteSection {
    match field_type {
        t if t.is_choice() => PaletteSection::Choices,
        FieldType::FileUpload | FieldType::Image | FieldType::RichText | FieldType::ColorPalette => {
            PaletteSection::Media
        }
        t if t.is_container() || t.is_static() => PaletteSection::Layout,
        _ => PaletteSection::Inputs,
    }
}

/// Closed, ordered catalog of the field kinds a user can drop.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    /// Every field kind with its built-in defaults.
    pub fn standard() -> Self {
        Self::new(FieldType::ALL.into_iter().map(PaletteEntry::standard).collect())
    }

    pub fn entry(&self, field_type: FieldType) -> Option<&PaletteEntry> {
        self.entries.iter().find(|e| e.field_type == field_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter()
    }

    pub fn section(&self, section: PaletteSection) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter().filter(move |e| e.section == section)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synthesizes a node of `field_type` whose id does not occur in `tree`.
    /// `None` if the palette does not offer that type.
    pub fn create_field(&self, field_type: FieldType, tree: &FieldTree) -> Option<FieldNode> {
        let entry = self.entry(field_type)?;
        let mut id = FieldId::generate();
        while tree.contains(&id) {
            id = FieldId::generate();
        }
        Some(entry.instantiate(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChoiceOption, ChoiceSettings};

    #[test]
    fn standard_palette_covers_every_type_in_order() {
        let palette = Palette::standard();
        let types: Vec<FieldType> = palette.iter().map(|e| e.field_type).collect();
        assert_eq!(types, FieldType::ALL.to_vec());
    }

    #[test]
    fn sections_partition_the_catalog() {
        let palette = Palette::standard();
        let total: usize = [
            PaletteSection::Inputs,
            PaletteSection::Choices,
            PaletteSection::Media,
            PaletteSection::Layout,
        ]
        .into_iter()
        .map(|s| palette.section(s).count())
        .sum();
        assert_eq!(total, palette.len());
        assert_eq!(palette.section(PaletteSection::Choices).count(), 3);
    }

    #[test]
    fn new_select_has_two_options_and_fresh_id() {
        let palette = Palette::standard();
        let tree = FieldTree::new();
        let node = palette.create_field(FieldType::Select, &tree).unwrap();
        assert_eq!(node.field.config.options().unwrap().len(), 2);
        assert!(!tree.contains(node.id()));
        assert!(node.children.is_none());
    }

    #[test]
    fn new_container_has_empty_children() {
        let palette = Palette::standard();
        let node = palette.create_field(FieldType::FlexRow, &FieldTree::new()).unwrap();
        assert_eq!(node.children, Some(Vec::new()));
    }

    #[test]
    fn custom_factory_is_used() {
        let palette = Palette::new(vec![PaletteEntry::new(
            FieldType::Radio,
            PaletteSection::Choices,
            || {
                FieldConfig::Radio(ChoiceSettings {
                    options: vec![ChoiceOption::new("Yes", "y"), ChoiceOption::new("No", "n")],
                    allow_other: false,
                })
            },
        )]);
        let node = palette.create_field(FieldType::Radio, &FieldTree::new()).unwrap();
        assert_eq!(node.field.config.options().unwrap()[0].value, "y");
        assert!(palette.create_field(FieldType::Text, &FieldTree::new()).is_none());
    }

    #[test]
    fn mismatched_factory_falls_back_to_defaults() {
        let entry = PaletteEntry::new(FieldType::Select, PaletteSection::Choices, || {
            FieldConfig::defaults_for(FieldType::Text)
        });
        assert_eq!(entry.default_config().field_type(), FieldType::Select);
    }
}
