use crate::core::models::atom::Element;
use crate::core::models::molecule::MoleculeKind;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A molecule made of one central atom and `count` identical outer atoms that are
/// all covalently bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleTemplate {
    pub name: String,
    pub kind: MoleculeKind,
    pub central: Element,
    pub outer: Element,
    pub count: usize,
}

impl SimpleTemplate {
    pub fn new(name: &str, kind: MoleculeKind, central: Element, outer: Element, count: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            central,
            outer,
            count,
        }
    }

    /// Role name of the central atom, e.g. `"O"` for water.
    pub fn central_role(&self) -> String {
        self.central.symbol().to_string()
    }

    /// Role name of the `i`-th outer atom (zero-based), e.g. `"H1"`, `"H2"`.
    pub fn outer_role(&self, i: usize) -> String {
        format!("{}{}", self.outer.symbol(), i + 1)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    name: String,
    kind: String,
    central: String,
    outer: String,
    count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegistry {
    #[serde(default, rename = "template")]
    templates: Vec<RawTemplate>,
}

/// The ordered list of simple-molecule templates the assembler tries.
///
/// Order matters: earlier templates claim atoms first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRegistry {
    templates: Vec<SimpleTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self {
            templates: vec![
                SimpleTemplate::new("water", MoleculeKind::Water, Element::O, Element::H, 2),
                SimpleTemplate::new("hydronium", MoleculeKind::Hydronium, Element::O, Element::H, 3),
                SimpleTemplate::new("hydroxide", MoleculeKind::Hydroxide, Element::O, Element::H, 1),
                SimpleTemplate::new(
                    "sulfur-dioxide",
                    MoleculeKind::SulfurDioxide,
                    Element::S,
                    Element::O,
                    2,
                ),
            ],
        }
    }
}

impl TemplateRegistry {
    pub fn new(templates: Vec<SimpleTemplate>) -> Self {
        Self { templates }
    }

    /// Loads a registry from a TOML file made of `[[template]]` tables.
    pub fn load(path: &Path) -> Result<Self, TopologyLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TopologyLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            TopologyLoadError::Toml { source, .. } => TopologyLoadError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TopologyLoadError> {
        let raw: RawRegistry = toml::from_str(content).map_err(|e| TopologyLoadError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;
        let templates = raw
            .templates
            .into_iter()
            .map(Self::convert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    fn convert(raw: RawTemplate) -> Result<SimpleTemplate, TopologyLoadError> {
        let invalid = |reason: String| TopologyLoadError::InvalidTemplate {
            name: raw.name.clone(),
            reason,
        };
        let kind = MoleculeKind::from_str(&raw.kind)
            .map_err(|_| invalid(format!("unknown molecule kind '{}'", raw.kind)))?;
        let element = |label: &str| match Element::from_str(label) {
            Ok(Element::Other) | Err(_) => Err(invalid(format!("unsupported element '{label}'"))),
            Ok(e) => Ok(e),
        };
        let central = element(&raw.central)?;
        let outer = element(&raw.outer)?;
        if raw.count == 0 {
            return Err(invalid("outer atom count must be at least 1".to_string()));
        }
        match kind.simple_shape() {
            Some(shape) if shape != (central, outer, raw.count) => {
                let (c, o, n) = shape;
                return Err(invalid(format!(
                    "kind '{kind}' needs central {} with {n} x {}, found {} with {} x {}",
                    c.symbol(),
                    o.symbol(),
                    central.symbol(),
                    raw.count,
                    outer.symbol()
                )));
            }
            None if kind != MoleculeKind::Generic => {
                return Err(invalid(format!(
                    "kind '{kind}' is assembled by its own builder, not a template"
                )));
            }
            _ => {}
        }
        Ok(SimpleTemplate {
            name: raw.name,
            kind,
            central,
            outer,
            count: raw.count,
        })
    }

    pub fn templates(&self) -> &[SimpleTemplate] {
        &self.templates
    }

    pub fn get(&self, name: &str) -> Option<&SimpleTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Error)]
pub enum TopologyLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },
}
