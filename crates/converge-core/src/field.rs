use std::fmt;

use serde_json::Value;

/// Shape of a field's value.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Double,
    Boolean,
    Enum,
    /// A name, partial path or full self-link to another resource.
    Reference,
    /// Free-form string map such as labels.
    Map,
    Object(Schema),
    /// Ordered: elements are paired by position.
    List(Box<FieldKind>),
    /// Unordered: elements are paired by zero-diff matching.
    Set(Box<FieldKind>),
}

impl FieldKind {
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            FieldKind::Object(_) | FieldKind::List(_) | FieldKind::Set(_)
        )
    }
}

/// How two non-empty values of a field are judged equal.
#[derive(Clone, Copy, Default)]
pub enum Equality {
    /// Kind-driven: numeric for integers/doubles, name-normalized for
    /// references, exact otherwise.
    #[default]
    Default,
    /// `"automatic"` on either side matches any platform.
    CpuPlatform,
    /// `"80"` and `"80-80"` are the same range.
    PortRange,
    /// A literal address and a reference to an address resource are
    /// interchangeable.
    IpAddressOrReference,
    /// Resource-specific override; replaces structural comparison for
    /// objects too.
    Custom(fn(&Value, &Value) -> bool),
}

impl fmt::Debug for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Equality::Default => f.write_str("Default"),
            Equality::CpuPlatform => f.write_str("CpuPlatform"),
            Equality::PortRange => f.write_str("PortRange"),
            Equality::IpAddressOrReference => f.write_str("IpAddressOrReference"),
            Equality::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What a change to a field costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSelector {
    /// No in-place operation exists; the resource must be replaced.
    RequiresRecreate,
    /// One or more named update operations reconcile the field.
    Triggers(&'static [&'static str]),
}

/// One row of a resource's declarative field table.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Wire (JSON) name.
    pub name: &'static str,
    pub kind: FieldKind,
    pub equality: Equality,
    /// `None` on a nested field inherits the parent's selector.
    pub selector: Option<OperationSelector>,
    pub output_only: bool,
    pub server_default: bool,
    /// Filled into desired state (and fetched state) when unset.
    pub default: Option<Value>,
    pub required: bool,
    /// URL parameter rather than body field, e.g. `project`.
    pub parameter: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            equality: Equality::Default,
            selector: None,
            output_only: false,
            server_default: false,
            default: None,
            required: false,
            parameter: false,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn double(name: &'static str) -> Self {
        Self::new(name, FieldKind::Double)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn enumeration(name: &'static str) -> Self {
        Self::new(name, FieldKind::Enum)
    }

    pub fn reference(name: &'static str) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    pub fn map(name: &'static str) -> Self {
        Self::new(name, FieldKind::Map)
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldKind::Object(schema))
    }

    pub fn list(name: &'static str, element: FieldKind) -> Self {
        Self::new(name, FieldKind::List(Box::new(element)))
    }

    pub fn set(name: &'static str, element: FieldKind) -> Self {
        Self::new(name, FieldKind::Set(Box::new(element)))
    }

    pub fn equality(mut self, equality: Equality) -> Self {
        self.equality = equality;
        self
    }

    pub fn recreate(mut self) -> Self {
        self.selector = Some(OperationSelector::RequiresRecreate);
        self
    }

    pub fn triggers(mut self, operations: &'static [&'static str]) -> Self {
        self.selector = Some(OperationSelector::Triggers(operations));
        self
    }

    pub fn output_only(mut self) -> Self {
        self.output_only = true;
        self
    }

    pub fn server_default(mut self) -> Self {
        self.server_default = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn parameter(mut self) -> Self {
        self.parameter = true;
        self
    }

    /// Whether this field travels in request bodies.
    pub fn is_sent(&self) -> bool {
        !self.output_only && !self.parameter
    }
}

/// Ordered field table for one resource type or nested object.
///
/// Declaration order is diff order, so plans and diagnostics are
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every operation name any field (at any depth) can trigger, in
    /// declaration order without duplicates.
    pub fn operation_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        collect_operation_names(self, &mut names);
        names
    }
}

fn collect_operation_names(schema: &Schema, names: &mut Vec<&'static str>) {
    for field in &schema.fields {
        if let Some(OperationSelector::Triggers(ops)) = field.selector {
            for op in ops {
                if !names.contains(op) {
                    names.push(op);
                }
            }
        }
        let mut kind = &field.kind;
        while let FieldKind::List(inner) | FieldKind::Set(inner) = kind {
            kind = &**inner;
        }
        if let FieldKind::Object(nested) = kind {
            collect_operation_names(nested, names);
        }
    }
}
