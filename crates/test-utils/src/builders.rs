#![allow(dead_code)]

use std::path::PathBuf;

use scriptrun::schema::{
    ChoiceConstraints, FieldKind, FieldSpec, FormSchema, IntegerConstraints, PathConstraints,
    RealConstraints, TextConstraints,
};
use scriptrun::task::TaskDescriptor;
use scriptrun::types::InputArgStyle;

/// Builder for `FieldSpec` to simplify test setup.
pub struct FieldBuilder {
    key: String,
    label: String,
    required: bool,
    kind: FieldKind,
}

impl FieldBuilder {
    fn new(key: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: String::new(),
            required: false,
            kind,
        }
    }

    pub fn text(key: &str) -> Self {
        Self::new(key, FieldKind::Text(TextConstraints::default()))
    }

    pub fn int(key: &str) -> Self {
        Self::new(key, FieldKind::Integer(IntegerConstraints::default()))
    }

    pub fn real(key: &str) -> Self {
        Self::new(key, FieldKind::Real(RealConstraints::default()))
    }

    pub fn choice(key: &str, options: &[&str]) -> Self {
        Self::new(
            key,
            FieldKind::Choice(ChoiceConstraints {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: None,
            }),
        )
    }

    pub fn checkbox(key: &str) -> Self {
        Self::new(key, FieldKind::Boolean { default: false })
    }

    pub fn path(key: &str) -> Self {
        Self::new(key, FieldKind::FilePath(PathConstraints::default()))
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the integer range.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        if let FieldKind::Integer(c) = &mut self.kind {
            c.min = min;
            c.max = max;
        }
        self
    }

    /// Set the default from text, interpreted per kind.
    pub fn default_value(mut self, value: &str) -> Self {
        match &mut self.kind {
            FieldKind::Text(c) => c.default = Some(value.to_string()),
            FieldKind::Integer(c) => c.default = value.parse().ok(),
            FieldKind::Real(c) => c.default = value.parse().ok(),
            FieldKind::Choice(c) => c.default = Some(value.to_string()),
            FieldKind::Boolean { default } => *default = value == "true",
            FieldKind::FilePath(c) => c.default = Some(value.to_string()),
        }
        self
    }

    pub fn build(self) -> FieldSpec {
        FieldSpec::new(self.key, self.label, self.required, self.kind)
            .expect("Failed to build valid field from builder")
    }
}

/// Builder for `TaskDescriptor`.
pub struct TaskBuilder {
    name: String,
    program: PathBuf,
    interpreter: Option<PathBuf>,
    input_style: InputArgStyle,
    fields: Vec<FieldSpec>,
    extra_args: Vec<String>,
}

impl TaskBuilder {
    pub fn new(name: &str, program: &str) -> Self {
        Self {
            name: name.to_string(),
            program: PathBuf::from(program),
            interpreter: None,
            input_style: InputArgStyle::default(),
            fields: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    pub fn interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = Some(PathBuf::from(interpreter));
        self
    }

    pub fn positional_input(mut self) -> Self {
        self.input_style = InputArgStyle::Positional;
        self
    }

    pub fn input_flag(mut self, flag: &str) -> Self {
        self.input_style = InputArgStyle::Flag(flag.to_string());
        self
    }

    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field.build());
        self
    }

    pub fn extra_arg(mut self, arg: &str) -> Self {
        self.extra_args.push(arg.to_string());
        self
    }

    pub fn build(self) -> TaskDescriptor {
        let schema = FormSchema::new(self.fields).expect("Failed to build valid schema from builder");
        TaskDescriptor::new(self.name, self.program)
            .with_interpreter(self.interpreter)
            .with_input_style(self.input_style)
            .with_schema(schema)
            .with_extra_args(self.extra_args)
    }
}

/// The "add two numbers" task: two required integers `--a` and `--b`.
pub fn adder_task(program: &str) -> TaskDescriptor {
    TaskBuilder::new("Add numbers", program)
        .field(FieldBuilder::int("--a").label("a").required())
        .field(FieldBuilder::int("--b").label("b").required())
        .build()
}
