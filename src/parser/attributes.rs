use crate::dict::Symbol;

use super::QName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub attr_type: Symbol,
    pub value: String,
    /// The value before normalization, if it differs from `value`.
    pub non_normalized_value: Option<String>,
    pub specified: bool,
}

/// The attributes of one start tag, in document order.
#[derive(Debug, Clone, Default)]
pub struct XmlAttributes {
    attrs: Vec<XmlAttribute>,
}

impl XmlAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute and return its index.
    ///
    /// If an attribute with the same raw name is already present, nothing is
    /// added and the index of the present attribute is returned.
    pub fn add_attribute(&mut self, name: &QName, attr_type: Symbol, value: &str) -> usize {
        if let Some(index) = self.index_of(name.rawname()) {
            return index;
        }
        self.attrs.push(XmlAttribute {
            name: name.clone(),
            attr_type,
            value: value.to_owned(),
            non_normalized_value: None,
            specified: false,
        });
        self.attrs.len() - 1
    }

    pub fn remove_all(&mut self) {
        self.attrs.clear();
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn index_of(&self, rawname: &str) -> Option<usize> {
        self.attrs.iter().position(|attr| attr.name.rawname() == rawname)
    }

    pub fn get(&self, index: usize) -> Option<&XmlAttribute> {
        self.attrs.get(index)
    }

    pub fn get_value(&self, rawname: &str) -> Option<&str> {
        self.index_of(rawname).map(|index| self.attrs[index].value.as_str())
    }

    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(attr) = self.attrs.get_mut(index) {
            attr.value.clear();
            attr.value.push_str(value);
        }
    }

    pub fn set_non_normalized_value(&mut self, index: usize, value: Option<&str>) {
        if let Some(attr) = self.attrs.get_mut(index) {
            attr.non_normalized_value = value.map(|value| value.to_owned());
        }
    }

    /// The raw value if one was recorded, otherwise the normalized value.
    pub fn get_non_normalized_value(&self, index: usize) -> Option<&str> {
        self.attrs.get(index).map(|attr| {
            attr.non_normalized_value
                .as_deref()
                .unwrap_or(attr.value.as_str())
        })
    }

    pub fn set_specified(&mut self, index: usize, specified: bool) {
        if let Some(attr) = self.attrs.get_mut(index) {
            attr.specified = specified;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attrs.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn qname(raw: &str) -> QName {
        QName::new(None, Some(Rc::from(raw)), Some(Rc::from(raw)), None)
    }

    #[test]
    fn duplicates_are_not_added() {
        let cdata: Symbol = Rc::from("CDATA");
        let mut attrs = XmlAttributes::new();
        assert_eq!(attrs.add_attribute(&qname("a"), cdata.clone(), "1"), 0);
        assert_eq!(attrs.add_attribute(&qname("b"), cdata.clone(), "2"), 1);
        assert_eq!(attrs.add_attribute(&qname("a"), cdata, "3"), 0);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_value("a"), Some("1"));

        attrs.set_value(1, "x y");
        attrs.set_non_normalized_value(1, Some("x\ny"));
        assert_eq!(attrs.get_value("b"), Some("x y"));
        assert_eq!(attrs.get_non_normalized_value(1), Some("x\ny"));
        assert_eq!(attrs.get_non_normalized_value(0), Some("1"));
        attrs.remove_all();
        assert!(attrs.is_empty());
    }
}
