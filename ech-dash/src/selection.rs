//! Control events decoded at the UI boundary
//!
//! The browser posts `{control, value}` pairs using the control ids of the
//! page. Everything past this module works with typed [`ControlEvent`]s.

use ech_common::events::WorkChannel;
use ech_common::{AggFunc, Error, Result, Tristate, Weights};
use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::graph::Signal;

/// Raw control update as posted by the UI
#[derive(Debug, Clone, Deserialize)]
pub struct ControlUpdate {
    pub control: String,
    #[serde(default)]
    pub value: Value,
}

impl ControlUpdate {
    pub fn new(control: &str, value: Value) -> Self {
        Self {
            control: control.to_string(),
            value,
        }
    }
}

/// A decoded user selection
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Year(Option<u16>),
    Weights(Option<Weights>),
    SumVar(Option<String>),
    By(Vec<String>),
    AggFunc(AggFunc),
    IsCategorical(Tristate),
    HouseholdLevel(bool),
    XAxis(Option<String>),
    Color(Option<String>),
    FacetCol(Option<String>),
    FacetRow(Option<String>),
    Search(Option<String>),
}

fn malformed(control: &str, value: &Value) -> Error {
    Error::MalformedSelection(format!("{}: unexpected value {}", control, value))
}

/// Null or empty string → None
fn optional_string(control: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(malformed(control, other)),
    }
}

fn required_string<'a>(control: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| malformed(control, value))
}

impl ControlEvent {
    /// Decode a raw update; malformed values are errors
    pub fn decode(update: &ControlUpdate) -> Result<Self> {
        let control = update.control.as_str();
        let value = &update.value;

        let event = match control {
            "year" => ControlEvent::Year(match value {
                Value::Null => None,
                Value::Number(n) => Some(
                    n.as_u64()
                        .and_then(|y| u16::try_from(y).ok())
                        .ok_or_else(|| malformed(control, value))?,
                ),
                Value::String(s) => Some(s.parse().map_err(|_| malformed(control, value))?),
                other => return Err(malformed(control, other)),
            }),
            "weights" => ControlEvent::Weights(
                optional_string(control, value)?
                    .map(|s| s.parse::<Weights>())
                    .transpose()?,
            ),
            "sumvar" => ControlEvent::SumVar(optional_string(control, value)?),
            "by" => ControlEvent::By(match value {
                Value::Null => Vec::new(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| malformed(control, item))
                    })
                    .collect::<Result<Vec<_>>>()?,
                other => return Err(malformed(control, other)),
            }),
            "aggfunc" => ControlEvent::AggFunc(required_string(control, value)?.parse()?),
            "is-categorical" => {
                ControlEvent::IsCategorical(Tristate::decode(required_string(control, value)?)?)
            }
            "household" => match Tristate::decode(required_string(control, value)?)? {
                Tristate::True => ControlEvent::HouseholdLevel(true),
                Tristate::False => ControlEvent::HouseholdLevel(false),
                Tristate::Auto => return Err(malformed(control, value)),
            },
            "x-axis" => ControlEvent::XAxis(optional_string(control, value)?),
            "color" => ControlEvent::Color(optional_string(control, value)?),
            "facet-col" => ControlEvent::FacetCol(optional_string(control, value)?),
            "facet-row" => ControlEvent::FacetRow(optional_string(control, value)?),
            "dictionary-search" => ControlEvent::Search(optional_string(control, value)?),
            other => {
                return Err(Error::MalformedSelection(format!("unknown control: {}", other)));
            }
        };
        Ok(event)
    }

    /// Production fallback for malformed tri-state controls
    ///
    /// Returns `None` for controls that have no safe default.
    pub fn normalized(update: &ControlUpdate) -> Option<Self> {
        match update.control.as_str() {
            "is-categorical" => Some(ControlEvent::IsCategorical(Tristate::Auto)),
            "household" => Some(ControlEvent::HouseholdLevel(false)),
            _ => None,
        }
    }

    /// Signal raised when this event is applied
    pub fn signal(&self) -> Signal {
        match self {
            ControlEvent::Year(_) => Signal::Year,
            ControlEvent::Weights(_) => Signal::Weights,
            ControlEvent::SumVar(_) => Signal::SumVar,
            ControlEvent::By(_) => Signal::By,
            ControlEvent::AggFunc(_) => Signal::AggFunc,
            ControlEvent::IsCategorical(_) => Signal::IsCategorical,
            ControlEvent::HouseholdLevel(_) => Signal::HouseholdLevel,
            ControlEvent::XAxis(_)
            | ControlEvent::Color(_)
            | ControlEvent::FacetCol(_)
            | ControlEvent::FacetRow(_) => Signal::AxisBindings,
            ControlEvent::Search(_) => Signal::SearchTerm,
        }
    }

    /// Control id this event came from; one in-flight request per control
    pub fn control(&self) -> &'static str {
        match self {
            ControlEvent::Year(_) => "year",
            ControlEvent::Weights(_) => "weights",
            ControlEvent::SumVar(_) => "sumvar",
            ControlEvent::By(_) => "by",
            ControlEvent::AggFunc(_) => "aggfunc",
            ControlEvent::IsCategorical(_) => "is-categorical",
            ControlEvent::HouseholdLevel(_) => "household",
            ControlEvent::XAxis(_) => "x-axis",
            ControlEvent::Color(_) => "color",
            ControlEvent::FacetCol(_) => "facet-col",
            ControlEvent::FacetRow(_) => "facet-row",
            ControlEvent::Search(_) => "dictionary-search",
        }
    }

    /// Long-running channel this event belongs to, if any
    pub fn channel(&self) -> Option<WorkChannel> {
        match self {
            ControlEvent::Year(_) | ControlEvent::Weights(_) => Some(WorkChannel::Load),
            ControlEvent::SumVar(_)
            | ControlEvent::By(_)
            | ControlEvent::AggFunc(_)
            | ControlEvent::IsCategorical(_)
            | ControlEvent::HouseholdLevel(_) => Some(WorkChannel::Summary),
            _ => None,
        }
    }
}
