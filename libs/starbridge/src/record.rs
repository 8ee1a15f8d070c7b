use crate::directive::Directive;
use crate::reflect::{Reflect, Shape};

/// Static description of one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub directive: Directive<'static>,
    /// Declared with `#[star(embed)]`: flattened into the parent.
    pub embedded: bool,
    /// Only exported (`pub`) fields take part in conversion.
    pub exported: bool,
    pub shape: Shape,
}

impl Field {
    pub fn new(name: &'static str, directive: &'static str, shape: Shape) -> Self {
        Self {
            name,
            directive: Directive::parse(directive),
            embedded: false,
            exported: true,
            shape,
        }
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Skipped by both directions.
    pub fn is_ignored(&self) -> bool {
        self.directive.ignored || !self.exported
    }

    /// Embedded and not renamed: contributes its fields to the parent.
    pub fn flattens(&self) -> bool {
        self.embedded && self.directive.name.is_empty()
    }

    /// The dictionary key this field maps to.
    pub fn key(&self) -> &'static str {
        if self.directive.name.is_empty() {
            self.name
        } else {
            self.directive.name
        }
    }

    pub fn options(&self) -> &[&'static str] {
        &self.directive.options
    }
}

/// A structured value with named fields, normally implemented by
/// `#[derive(Record)]`.
///
/// `field` and `field_mut` index the same order as `fields`.
pub trait Record: Reflect {
    fn fields(&self) -> Vec<Field>;

    fn field(&self, index: usize) -> Option<&dyn Reflect>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}
