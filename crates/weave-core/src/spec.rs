//! Transient descriptions produced by component render functions.

use std::rc::Rc;

use crate::component::Component;
use crate::error::Error;
use crate::props::Props;
use crate::value::Value;

#[derive(Clone, Default, PartialEq, Debug)]
pub enum Spec {
    #[default]
    Null,
    Text(String),
    Component(Rc<ComponentSpec>),
    Host(Rc<HostSpec>),
    Array(Vec<Spec>),
}

#[derive(Clone, PartialEq, Debug)]
pub struct ComponentSpec {
    pub component: Component,
    pub props: Props,
    pub children: Vec<Spec>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct HostSpec {
    pub tag: String,
    pub props: Props,
    pub children: Vec<Spec>,
}

impl Spec {
    pub fn text(value: impl Into<String>) -> Self {
        Spec::Text(value.into())
    }

    pub fn array(items: impl IntoIterator<Item = Spec>) -> Self {
        Spec::Array(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Spec::Null)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Spec::Text(_))
    }

    pub fn key(&self) -> Option<&Value> {
        match self {
            Spec::Component(spec) => spec.props.key(),
            Spec::Host(spec) => spec.props.key(),
            _ => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Spec::Null => "null",
            Spec::Text(_) => "text",
            Spec::Component(_) => "component",
            Spec::Host(_) => "host",
            Spec::Array(_) => "array",
        }
    }
}

/// What [`make_spec`] builds: a component or a host tag.
#[derive(Clone, Debug)]
pub enum SpecTarget {
    Component(Component),
    Tag(String),
}

impl From<Component> for SpecTarget {
    fn from(component: Component) -> Self {
        SpecTarget::Component(component)
    }
}

impl From<&Component> for SpecTarget {
    fn from(component: &Component) -> Self {
        SpecTarget::Component(component.clone())
    }
}

impl From<&str> for SpecTarget {
    fn from(tag: &str) -> Self {
        SpecTarget::Tag(tag.to_owned())
    }
}

impl From<String> for SpecTarget {
    fn from(tag: String) -> Self {
        SpecTarget::Tag(tag)
    }
}

/// Builds a component spec or a host-node spec depending on `target`.
pub fn make_spec(
    target: impl Into<SpecTarget>,
    props: Props,
    children: impl IntoIterator<Item = Spec>,
) -> Spec {
    let children = children.into_iter().collect();
    match target.into() {
        SpecTarget::Component(component) => Spec::Component(Rc::new(ComponentSpec {
            component,
            props,
            children,
        })),
        SpecTarget::Tag(tag) => Spec::Host(Rc::new(HostSpec {
            tag,
            props,
            children,
        })),
    }
}

impl From<&str> for Spec {
    fn from(value: &str) -> Self {
        Spec::Text(value.to_owned())
    }
}

impl From<String> for Spec {
    fn from(value: String) -> Self {
        Spec::Text(value)
    }
}

impl From<i64> for Spec {
    fn from(value: i64) -> Self {
        Spec::Text(value.to_string())
    }
}

impl From<i32> for Spec {
    fn from(value: i32) -> Self {
        Spec::Text(value.to_string())
    }
}

impl From<f64> for Spec {
    fn from(value: f64) -> Self {
        Spec::Text(value.to_string())
    }
}

impl From<Vec<Spec>> for Spec {
    fn from(items: Vec<Spec>) -> Self {
        Spec::Array(items)
    }
}

impl From<Option<Spec>> for Spec {
    fn from(value: Option<Spec>) -> Self {
        value.unwrap_or(Spec::Null)
    }
}

impl TryFrom<Value> for Spec {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Spec::Null),
            Value::Node(spec) => Ok(spec),
            other => match other.to_text() {
                Some(text) => Ok(Spec::Text(text)),
                None => Err(Error::InvalidSpec {
                    found: other.kind_name(),
                }),
            },
        }
    }
}

/// Conversion applied to whatever a component render function returns.
pub trait IntoSpec {
    fn into_spec(self) -> Result<Spec, Error>;
}

impl IntoSpec for Spec {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(self)
    }
}

impl IntoSpec for Option<Spec> {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(self.unwrap_or(Spec::Null))
    }
}

impl IntoSpec for () {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(Spec::Null)
    }
}

impl IntoSpec for Vec<Spec> {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(Spec::Array(self))
    }
}

impl IntoSpec for &str {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(Spec::from(self))
    }
}

impl IntoSpec for String {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(Spec::Text(self))
    }
}

impl IntoSpec for i64 {
    fn into_spec(self) -> Result<Spec, Error> {
        Ok(Spec::from(self))
    }
}

impl IntoSpec for Value {
    fn into_spec(self) -> Result<Spec, Error> {
        Spec::try_from(self)
    }
}

impl IntoSpec for Result<Spec, Error> {
    fn into_spec(self) -> Result<Spec, Error> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callback;

    #[test]
    fn make_spec_distinguishes_tags_from_components() {
        let host = make_spec("div", Props::new(), [Spec::text("a")]);
        assert!(matches!(&host, Spec::Host(spec) if spec.tag == "div" && spec.children.len() == 1));

        let component = Component::new("Empty", |_: &crate::Props| Spec::Null);
        let spec = make_spec(&component, Props::new().with_key("k"), []);
        assert!(matches!(&spec, Spec::Component(_)));
        assert_eq!(spec.key(), Some(&Value::from("k")));
    }

    #[test]
    fn values_without_text_form_are_invalid_specs() {
        let err = Value::from(Callback::new(|_| {})).into_spec().unwrap_err();
        assert_eq!(err, Error::InvalidSpec { found: "callback" });
        assert_eq!(Value::from(7).into_spec(), Ok(Spec::text("7")));
        assert_eq!(Value::Null.into_spec(), Ok(Spec::Null));
    }
}
