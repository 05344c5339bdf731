//! Enum members and coercion of raw values onto them.
//!
//! Unlike primitive coercion, enum coercion is strict: a raw value that
//! matches no member by value or by name is an error.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::EnumDescriptor;
use crate::error::{RecfigError, Result};
use crate::value::{self, Value};

/// A resolved enum member.
#[derive(Clone)]
pub struct Member {
    descriptor: Arc<EnumDescriptor>,
    index: usize,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.descriptor.members()[self.index].name
    }

    /// The member's underlying value, which is what gets written out.
    pub fn value(&self) -> &Value {
        &self.descriptor.members()[self.index].value
    }

    pub fn enum_name(&self) -> &'static str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Arc<EnumDescriptor> {
        &self.descriptor
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.type_id() == other.descriptor.type_id() && self.index == other.index
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.enum_name(), self.name())
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Find the member `raw` refers to.
///
/// First match wins: an existing member of this enum, then a member whose
/// underlying value equals `raw`, then one whose value has the same text as
/// `raw` (`"2"` for `2`), then a member whose name matches the text of `raw`
/// ignoring case.
pub fn coerce(descriptor: &Arc<EnumDescriptor>, raw: &Value) -> Option<Member> {
    if let Value::Member(member) = raw
        && member.descriptor.type_id() == descriptor.type_id()
    {
        return Some(member.clone());
    }
    let index = descriptor.position_by_value(raw).or_else(|| {
        let text = value::scalar_text(raw)?;
        descriptor
            .position_by_text(&text)
            .or_else(|| descriptor.position_by_name(&text))
    })?;
    Some(Member {
        descriptor: Arc::clone(descriptor),
        index,
    })
}

/// Coerce a field value, failing with the field path when nothing matches.
pub(crate) fn coerce_field(descriptor: &Arc<EnumDescriptor>, raw: Value, path: &str) -> Result<Value> {
    match coerce(descriptor, &raw) {
        Some(member) => Ok(Value::Member(member)),
        None => Err(RecfigError::EnumConversion {
            path: path.to_string(),
            enum_name: descriptor.name(),
            raw: raw.to_string(),
            expected: descriptor
                .members()
                .iter()
                .map(|m| format!("{} ({})", m.name, m.value))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
