//! Field directives: `"name,opt1,opt2"`.

use std::fmt;

/// A parsed field directive.
///
/// The first comma-separated segment renames the field (empty means keep the
/// field name, `-` means skip the field). Remaining segments are conversion
/// options, one per nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive<'a> {
    pub name: &'a str,
    pub ignored: bool,
    pub options: Vec<&'a str>,
}

impl<'a> Directive<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let (name, rest) = match raw.split_once(',') {
            Some((name, rest)) => (name, Some(rest)),
            None => (raw, None),
        };
        let options = match rest {
            Some(rest) if !rest.is_empty() => rest.split(',').collect(),
            _ => Vec::new(),
        };
        Self {
            name,
            ignored: name == "-",
            options,
        }
    }
}

/// A recognized conversion option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOption {
    AsString,
    AsBytes,
    AsList,
    AsTuple,
    AsSet,
}

impl ShapeOption {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asstring" => Some(ShapeOption::AsString),
            "asbytes" => Some(ShapeOption::AsBytes),
            "aslist" => Some(ShapeOption::AsList),
            "astuple" => Some(ShapeOption::AsTuple),
            "asset" => Some(ShapeOption::AsSet),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeOption::AsString => "asstring",
            ShapeOption::AsBytes => "asbytes",
            ShapeOption::AsList => "aslist",
            ShapeOption::AsTuple => "astuple",
            ShapeOption::AsSet => "asset",
        }
    }
}

impl fmt::Display for ShapeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The option governing the current level, if recognized.
pub(crate) fn current(options: &[&str]) -> Option<ShapeOption> {
    options.first().and_then(|opt| ShapeOption::parse(opt))
}

/// Options for the level below: the current one is consumed.
pub(crate) fn inner<'o, 's>(options: &'o [&'s str]) -> &'o [&'s str] {
    options.get(1..).unwrap_or(&[])
}
