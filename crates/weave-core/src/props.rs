use indexmap::IndexMap;

use crate::spec::Spec;
use crate::value::Value;

pub const KEY_PROP: &str = "key";
pub const REF_PROP: &str = "ref";
pub const CHILDREN_PROP: &str = "children";
pub const STYLE_PROP: &str = "style";

/// Ordered string-keyed property bag.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Props {
    values: IndexMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_key(self, key: impl Into<Value>) -> Self {
        self.with(KEY_PROP, key)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Identity hint used only when matching siblings.
    pub fn key(&self) -> Option<&Value> {
        self.get(KEY_PROP)
    }

    /// Children passed to a component, as an array spec.
    pub fn children(&self) -> Spec {
        match self.get(CHILDREN_PROP) {
            Some(Value::Node(spec)) => spec.clone(),
            _ => Spec::Null,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

/// Builds [`Props`] from `name => value` pairs.
#[macro_export]
macro_rules! props {
    () => {
        $crate::Props::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Props::new()$(.with($name, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_preserves_insertion_order() {
        let props = props! { "id" => "main", "tabIndex" => 2, "hidden" => false };
        let names: Vec<&str> = props.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["id", "tabIndex", "hidden"]);
        assert_eq!(props.get_str("id"), Some("main"));
        assert_eq!(props.get_int("tabIndex"), Some(2));
    }

    #[test]
    fn children_default_to_null() {
        assert!(Props::new().children().is_null());
        let props = Props::new().with(CHILDREN_PROP, Spec::text("x"));
        assert_eq!(props.children(), Spec::text("x"));
    }
}
