//! Item definition attribute model

use super::opcode::{self, OPTION_SLOTS, STACK_VARIANT_SLOTS};

/// Worn model with its vertical offset (opcodes 23 and 25)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WornModel {
    /// Model id
    pub model_id: u16,
    /// Vertical offset applied when worn
    pub offset_y: i8,
}

/// One recolor table row (opcode 40)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recolor {
    /// Color replaced
    pub source: u16,
    /// Replacement color
    pub destination: u16,
}

/// Stack-size substitution (opcodes 100-109)
///
/// When a stack reaches `count`, the item is drawn as `item_id` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackVariant {
    /// Item drawn instead
    pub item_id: u16,
    /// Stack size from which the substitution applies
    pub count: u16,
}

/// Decoded item definition
///
/// Every attribute starts at the value the client assumes when its opcode
/// is absent, so the encoder can leave out anything still at its default.
/// Attributes without a neutral value are `Option`s; `None` means the opcode
/// is not present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    /// Inventory model (opcode 1, omitted when 0)
    pub model_id: u16,
    /// Display name (opcode 2)
    pub name: String,
    /// Examine text (opcode 3)
    pub examine: String,
    /// Icon zoom (opcode 4, default 2000)
    pub icon_zoom: u16,
    /// Icon pitch (opcode 5)
    pub icon_pitch: u16,
    /// Icon yaw (opcode 6)
    pub icon_yaw: u16,
    /// Icon x offset (opcode 7)
    pub icon_offset_x: i16,
    /// Icon y offset (opcode 8)
    pub icon_offset_y: i16,
    /// Value of the unused opcode 10, kept for exact re-encoding
    pub unused_10: u16,
    /// Stackable (opcode 11)
    pub stackable: bool,
    /// Shop value (opcode 12, default 1)
    pub cost: i32,
    /// Members-only (opcode 16)
    pub members: bool,
    /// Opcode 23
    pub male_model_0: Option<WornModel>,
    /// Opcode 24
    pub male_model_1: Option<u16>,
    /// Opcode 25
    pub female_model_0: Option<WornModel>,
    /// Opcode 26
    pub female_model_1: Option<u16>,
    /// Right-click options on the ground (opcodes 30-34)
    pub ground_options: [Option<String>; OPTION_SLOTS],
    /// Right-click options in the inventory (opcodes 35-39)
    pub inventory_options: [Option<String>; OPTION_SLOTS],
    /// Recolor table (opcode 40); `Some(vec![])` encodes an empty table
    pub recolors: Option<Vec<Recolor>>,
    /// Opcode 78
    pub male_model_2: Option<u16>,
    /// Opcode 79
    pub female_model_2: Option<u16>,
    /// Opcode 90
    pub male_head_model_0: Option<u16>,
    /// Opcode 91
    pub female_head_model_0: Option<u16>,
    /// Opcode 92
    pub male_head_model_1: Option<u16>,
    /// Opcode 93
    pub female_head_model_1: Option<u16>,
    /// Icon roll (opcode 95)
    pub icon_roll: u16,
    /// Template this item is derived from (opcode 97)
    pub linked_id: Option<u16>,
    /// Noted/certificate counterpart (opcode 98)
    pub certificate_id: Option<u16>,
    /// Stack-size substitutions (opcodes 100-109)
    pub stack_variants: [Option<StackVariant>; STACK_VARIANT_SLOTS],
    /// Model scale along x (opcode 110, default 128)
    pub scale_x: u16,
    /// Model scale along z (opcode 111, default 128)
    pub scale_z: u16,
    /// Model scale along y (opcode 112, default 128)
    pub scale_y: u16,
    /// Ambient light (opcode 113)
    pub light_ambient: i8,
    /// Light attenuation (opcode 114); stored divided by 5
    pub light_attenuation: i32,
    /// Team (opcode 115)
    pub team: u8,
}

impl Default for ItemDefinition {
    fn default() -> Self {
        Self {
            model_id: 0,
            name: String::new(),
            examine: String::new(),
            icon_zoom: 2000,
            icon_pitch: 0,
            icon_yaw: 0,
            icon_offset_x: 0,
            icon_offset_y: 0,
            unused_10: 0,
            stackable: false,
            cost: 1,
            members: false,
            male_model_0: None,
            male_model_1: None,
            female_model_0: None,
            female_model_1: None,
            ground_options: Default::default(),
            inventory_options: Default::default(),
            recolors: None,
            male_model_2: None,
            female_model_2: None,
            male_head_model_0: None,
            female_head_model_0: None,
            male_head_model_1: None,
            female_head_model_1: None,
            icon_roll: 0,
            linked_id: None,
            certificate_id: None,
            stack_variants: [None; STACK_VARIANT_SLOTS],
            scale_x: 128,
            scale_z: 128,
            scale_y: 128,
            light_ambient: 0,
            light_attenuation: 0,
            team: 0,
        }
    }
}

impl ItemDefinition {
    /// Copy with a different name.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Copy with a different examine text.
    #[must_use]
    pub fn with_examine(self, examine: impl Into<String>) -> Self {
        Self {
            examine: examine.into(),
            ..self
        }
    }

    /// Copy with a different cost.
    #[must_use]
    pub fn with_cost(self, cost: i32) -> Self {
        Self { cost, ..self }
    }

    /// Opcodes the encoder emits for this definition, in emission order
    ///
    /// The list is strictly ascending and excludes the terminator.
    pub fn opcodes(&self) -> Vec<u8> {
        let mut ops = Vec::new();
        let mut push_if = |cond: bool, op: u8| {
            if cond {
                ops.push(op);
            }
        };

        push_if(self.model_id != 0, opcode::MODEL_ID);
        push_if(!self.name.is_empty(), opcode::NAME);
        push_if(!self.examine.is_empty(), opcode::EXAMINE);
        push_if(self.icon_zoom != 2000, opcode::ICON_ZOOM);
        push_if(self.icon_pitch != 0, opcode::ICON_PITCH);
        push_if(self.icon_yaw != 0, opcode::ICON_YAW);
        push_if(self.icon_offset_x != 0, opcode::ICON_OFFSET_X);
        push_if(self.icon_offset_y != 0, opcode::ICON_OFFSET_Y);
        push_if(self.unused_10 != 0, opcode::UNUSED_10);
        push_if(self.stackable, opcode::STACKABLE);
        push_if(self.cost != 1, opcode::COST);
        push_if(self.members, opcode::MEMBERS);
        push_if(self.male_model_0.is_some(), opcode::MALE_MODEL_0);
        push_if(self.male_model_1.is_some(), opcode::MALE_MODEL_1);
        push_if(self.female_model_0.is_some(), opcode::FEMALE_MODEL_0);
        push_if(self.female_model_1.is_some(), opcode::FEMALE_MODEL_1);
        for (slot, option) in self.ground_options.iter().enumerate() {
            push_if(
                option.as_ref().is_some_and(|o| !o.is_empty()),
                opcode::GROUND_OPTION_FIRST + slot as u8,
            );
        }
        for (slot, option) in self.inventory_options.iter().enumerate() {
            push_if(
                option.as_ref().is_some_and(|o| !o.is_empty()),
                opcode::INVENTORY_OPTION_FIRST + slot as u8,
            );
        }
        push_if(self.recolors.is_some(), opcode::RECOLOR);
        push_if(self.male_model_2.is_some(), opcode::MALE_MODEL_2);
        push_if(self.female_model_2.is_some(), opcode::FEMALE_MODEL_2);
        push_if(self.male_head_model_0.is_some(), opcode::MALE_HEAD_MODEL_0);
        push_if(self.female_head_model_0.is_some(), opcode::FEMALE_HEAD_MODEL_0);
        push_if(self.male_head_model_1.is_some(), opcode::MALE_HEAD_MODEL_1);
        push_if(self.female_head_model_1.is_some(), opcode::FEMALE_HEAD_MODEL_1);
        push_if(self.icon_roll != 0, opcode::ICON_ROLL);
        push_if(self.linked_id.is_some(), opcode::LINKED_ID);
        push_if(self.certificate_id.is_some(), opcode::CERTIFICATE_ID);
        for (slot, variant) in self.stack_variants.iter().enumerate() {
            push_if(variant.is_some(), opcode::STACK_VARIANT_FIRST + slot as u8);
        }
        push_if(self.scale_x != 128, opcode::SCALE_X);
        push_if(self.scale_z != 128, opcode::SCALE_Z);
        push_if(self.scale_y != 128, opcode::SCALE_Y);
        push_if(self.light_ambient != 0, opcode::LIGHT_AMBIENT);
        push_if(self.light_attenuation != 0, opcode::LIGHT_ATTENUATION);
        push_if(self.team != 0, opcode::TEAM);

        ops
    }
}
