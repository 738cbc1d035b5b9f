use crate::param::ParamValue;

/// Palette grouping of a block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCategory {
    Event,
    Control,
    Action,
    Variable,
}

/// Kind of editor input a block parameter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Number,
    Select,
    Variable,
}

/// Default value of an input, const-friendly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Number(f64),
    Text(&'static str),
}

impl From<&DefaultValue> for ParamValue {
    fn from(default: &DefaultValue) -> ParamValue {
        match default {
            DefaultValue::Number(n) => ParamValue::Number(*n),
            DefaultValue::Text(s) => ParamValue::Text((*s).to_string()),
        }
    }
}

/// One input slot of a block definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
    pub label: Option<&'static str>,
    pub options: &'static [&'static str],
    pub default: Option<DefaultValue>,
}

impl InputSpec {
    const fn new(name: &'static str, kind: InputKind) -> Self {
        InputSpec {
            name,
            kind,
            label: None,
            options: &[],
            default: None,
        }
    }

    const fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    const fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    const fn default_number(mut self, n: f64) -> Self {
        self.default = Some(DefaultValue::Number(n));
        self
    }

    const fn default_text(mut self, s: &'static str) -> Self {
        self.default = Some(DefaultValue::Text(s));
        self
    }
}

/// Static description of one block type: what the palette shows, whether
/// instances nest children, and which inputs they carry. Loaded once and
/// shared as the authority on default parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDefinition {
    pub block_type: &'static str,
    pub category: BlockCategory,
    pub label: &'static str,
    pub has_children: bool,
    pub inputs: &'static [InputSpec],
}

const fn leaf(
    block_type: &'static str,
    category: BlockCategory,
    label: &'static str,
    inputs: &'static [InputSpec],
) -> BlockDefinition {
    BlockDefinition {
        block_type,
        category,
        label,
        has_children: false,
        inputs,
    }
}

const fn container(
    block_type: &'static str,
    category: BlockCategory,
    label: &'static str,
    inputs: &'static [InputSpec],
) -> BlockDefinition {
    BlockDefinition {
        block_type,
        category,
        label,
        has_children: true,
        inputs,
    }
}

const CONDITION_INPUTS: &[InputSpec] = &[
    InputSpec::new("condition_var", InputKind::Variable)
        .label("Variable")
        .default_text("score"),
    InputSpec::new("operator", InputKind::Select)
        .label("is")
        .options(&[">", "<", "==", "!="])
        .default_text(">"),
    InputSpec::new("value", InputKind::Number)
        .label("Value")
        .default_number(10.0),
];

/// Built-in block types, in palette order.
pub const BLOCK_DEFINITIONS: &[BlockDefinition] = &[
    leaf("start", BlockCategory::Event, "On Start", &[]),
    container(
        "repeat",
        BlockCategory::Control,
        "Repeat",
        &[InputSpec::new("times", InputKind::Number)
            .label("times")
            .default_number(3.0)],
    ),
    container("repeat_until", BlockCategory::Control, "Repeat Until", CONDITION_INPUTS),
    container("if", BlockCategory::Control, "If", CONDITION_INPUTS),
    leaf(
        "print",
        BlockCategory::Action,
        "Print",
        &[InputSpec::new("message", InputKind::Text).default_text("Hello!")],
    ),
    leaf(
        "move",
        BlockCategory::Action,
        "Move Avatar",
        &[InputSpec::new("direction", InputKind::Select)
            .options(&["Forward", "Back", "Left", "Right"])
            .default_text("Forward")],
    ),
    leaf(
        "wait",
        BlockCategory::Action,
        "Wait",
        &[InputSpec::new("seconds", InputKind::Number)
            .label("seconds")
            .default_number(1.0)],
    ),
    leaf(
        "set_var",
        BlockCategory::Variable,
        "Set Variable",
        &[
            InputSpec::new("name", InputKind::Variable)
                .label("Name")
                .default_text("score"),
            InputSpec::new("value", InputKind::Number)
                .label("to")
                .default_number(0.0),
        ],
    ),
    leaf(
        "change_var",
        BlockCategory::Variable,
        "Change Variable",
        &[
            InputSpec::new("name", InputKind::Variable)
                .label("Name")
                .default_text("score"),
            InputSpec::new("value", InputKind::Number)
                .label("by")
                .default_number(1.0),
        ],
    ),
];

/// Look up a block definition by its type tag.
pub fn definition(block_type: &str) -> Option<&'static BlockDefinition> {
    BLOCK_DEFINITIONS
        .iter()
        .find(|def| def.block_type == block_type)
}
