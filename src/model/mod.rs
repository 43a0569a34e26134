//! Attribuutmodellen: de getypeerde schema's die bij het lezen uit
//! declaraties worden opgebouwd en bij het schrijven uit de data worden
//! afgeleid.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::graph::value::{AttrMap, AttrValue};

pub mod cast;

/// GEXF-primitieftypes zoals ze in `<attribute type="...">` voorkomen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    ListString,
    AnyUri,
}

impl PrimitiveType {
    /// Leest een type-tag uit het document. Onbekende tags gedragen zich
    /// als `string`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "integer" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "liststring" => Self::ListString,
            "anyURI" => Self::AnyUri,
            _ => Self::String,
        }
    }

    /// De tag waarmee dit type in een document wordt gedeclareerd.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::ListString => "liststring",
            Self::AnyUri => "anyURI",
        }
    }

    /// Bepaalt het minimale GEXF-type voor een waargenomen waarde.
    ///
    /// Numerieke waarden worden op hun feitelijke waarde geclassificeerd:
    /// een exact geheel getal binnen ±(2³¹−1) is `integer`, een geheel
    /// getal daarbuiten `long`, al het overige `double`.
    #[must_use]
    pub fn classify(value: &AttrValue) -> Self {
        match value {
            AttrValue::List(_) => Self::ListString,
            AttrValue::Boolean(_) => Self::Boolean,
            AttrValue::Text(_) => Self::String,
            AttrValue::Integer(_) => Self::Integer,
            AttrValue::Long(value) => {
                if i32::try_from(*value).is_ok() {
                    Self::Integer
                } else {
                    Self::Long
                }
            }
            AttrValue::Float(value) => Self::classify_number(f64::from(*value)),
            AttrValue::Double(value) => Self::classify_number(*value),
        }
    }

    fn classify_number(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 {
            if value.abs() <= f64::from(i32::MAX) {
                Self::Integer
            } else {
                Self::Long
            }
        } else {
            Self::Double
        }
    }

    /// Verbreedt dit type op basis van een nieuwe waarneming. Alleen
    /// `integer` en `long` hebben een gemeenschappelijk supertype
    /// (`long`); elk ander conflict verbreedt definitief naar `string`.
    #[must_use]
    pub fn widen(self, observed: Self) -> Self {
        if self == observed {
            self
        } else if matches!(
            (self, observed),
            (Self::Integer, Self::Long) | (Self::Long, Self::Integer)
        ) {
            Self::Long
        } else {
            Self::String
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Eén gedeclareerd of afgeleid attribuutveld.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Stabiele sleutel waarmee `for`/`id` in het document naar dit veld
    /// verwijzen.
    pub id: String,
    pub ty: PrimitiveType,
    /// Weergavenaam; de attributen op een node of edge worden onder deze
    /// naam opgeslagen.
    pub title: String,
    /// Standaardwaarde uit een `<default>`-element, reeds gecast.
    pub default: Option<AttrValue>,
}

/// Ruwe `<attribute>`-declaratie zoals het document die aanlevert; de
/// extractor maakt hier een [`FieldSpec`] van.
#[derive(Debug, Clone, Default)]
pub struct FieldDecl {
    pub id: Option<String>,
    pub for_id: Option<String>,
    pub ty: Option<String>,
    pub title: Option<String>,
    pub default: Option<String>,
}

/// Fouten bij het opbouwen of raadplegen van een attribuutmodel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Een declaratie of attvalue zonder `id` en zonder `for`.
    #[error("attribuutverwijzing zonder id of for")]
    MissingId,
    /// Een attvalue of default verwijst naar een veld dat niet in het
    /// model voorkomt.
    #[error("onbekend attribuutveld `{0}`")]
    UnknownField(String),
}

/// Geordend attribuutmodel met een index op veld-id.
#[derive(Debug, Clone, Default)]
pub struct AttributeModel {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl AttributeModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Voeg een veld toe. Een tweede declaratie met dezelfde id vervangt
    /// de eerdere, op dezelfde positie.
    pub fn insert(&mut self, spec: FieldSpec) {
        if let Some(idx) = self.index.get(&spec.id) {
            self.fields[*idx] = spec;
        } else {
            self.index.insert(spec.id.clone(), self.fields.len());
            self.fields.push(spec);
        }
    }

    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.index.get(id).and_then(|idx| self.fields.get(*idx))
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Bouwt het model en de defaults-map uit de declaraties van één klasse
/// (node of edge).
///
/// De id valt terug op `for`, het type op `string`, de titel op de id.
/// Een `<default>` wordt met het veldtype gecast en onder de **titel**
/// geregistreerd: defaults en expliciete waarden delen zo dezelfde
/// namespace op de node of edge.
pub fn extract_model(decls: &[FieldDecl]) -> Result<(AttributeModel, AttrMap), ModelError> {
    let mut model = AttributeModel::new();
    let mut defaults = AttrMap::new();

    for decl in decls {
        let id = decl
            .id
            .as_deref()
            .or(decl.for_id.as_deref())
            .ok_or(ModelError::MissingId)?;
        let ty = decl
            .ty
            .as_deref()
            .map_or(PrimitiveType::String, PrimitiveType::from_tag);
        let title = decl.title.as_deref().unwrap_or(id).to_owned();

        let default = decl
            .default
            .as_deref()
            .map(|text| cast::cast_from_text(ty, text));
        if let Some(value) = default.clone() {
            defaults.insert(title.clone(), value);
        }

        model.insert(FieldSpec {
            id: id.to_owned(),
            ty,
            title,
            default,
        });
    }

    Ok((model, defaults))
}

/// Leidt het minimale gemeenschappelijke model af uit de
/// attribuutverzamelingen van alle elementen van één klasse.
///
/// De volgorde van eerste waarneming blijft behouden en wordt de
/// declaratievolgorde in het weggeschreven document. Er worden geen
/// defaults afgeleid.
pub fn infer_model<'a, I>(maps: I) -> AttributeModel
where
    I: IntoIterator<Item = &'a AttrMap>,
{
    let mut model = AttributeModel::new();

    for map in maps {
        for (key, value) in map {
            let observed = PrimitiveType::classify(value);
            if let Some(idx) = model.index.get(key) {
                let current = model.fields[*idx].ty;
                model.fields[*idx].ty = current.widen(observed);
            } else {
                model.insert(FieldSpec {
                    id: key.clone(),
                    ty: observed,
                    title: key.clone(),
                    default: None,
                });
            }
        }
    }

    model
}
