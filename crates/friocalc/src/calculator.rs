//! BTU estimate and the calculator form that feeds it.

use crate::error::{AppError, AppResult};

/// BTU per square metre of floor area
const BTU_PER_M2: f64 = 600.0;
/// BTU per occupant
const BTU_PER_PERSON: f64 = 500.0;
/// BTU per heat-producing appliance
const BTU_PER_APPLIANCE: f64 = 1500.0;

/// Estimate the air-conditioning capacity for a room
pub fn compute_btu(area: f64, occupants: f64, appliances: f64) -> f64 {
    area * BTU_PER_M2 + occupants * BTU_PER_PERSON + appliances * BTU_PER_APPLIANCE
}

/// Format a number the way the form shows it: no fractional part when whole
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// One of the three numeric inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Area,
    People,
    Appliances,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Area => "Area",
            Field::People => "People",
            Field::Appliances => "Appliances",
        }
    }

    fn minimum(self) -> f64 {
        match self {
            Field::Area | Field::People => 1.0,
            Field::Appliances => 0.0,
        }
    }
}

/// Inputs parsed and checked against their minimums
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inputs {
    pub area: f64,
    pub people: f64,
    pub appliances: f64,
}

impl Inputs {
    /// Validate raw text inputs. Presence is checked for all fields first.
    pub fn parse(area: &str, people: &str, appliances: &str) -> AppResult<Self> {
        let raw = [
            (Field::Area, area.trim()),
            (Field::People, people.trim()),
            (Field::Appliances, appliances.trim()),
        ];

        if raw.iter().any(|(_, value)| value.is_empty()) {
            return Err(AppError::validation("Please fill in all fields."));
        }

        let mut parsed = [0.0; 3];
        for (slot, (field, value)) in parsed.iter_mut().zip(raw) {
            let number: f64 = value
                .parse()
                .ok()
                .filter(|n: &f64| n.is_finite())
                .ok_or_else(|| {
                    AppError::validation(format!("{} must be a number.", field.label()))
                })?;
            if number < field.minimum() {
                return Err(AppError::validation(format!(
                    "{} must be at least {}.",
                    field.label(),
                    format_number(field.minimum())
                )));
            }
            *slot = number;
        }

        Ok(Self {
            area: parsed[0],
            people: parsed[1],
            appliances: parsed[2],
        })
    }

    pub fn btu(&self) -> f64 {
        compute_btu(self.area, self.people, self.appliances)
    }
}

/// The calculator form: raw text fields, observation and last result
#[derive(Debug, Clone, Default)]
pub struct CalculatorForm {
    pub area: String,
    pub people: String,
    pub appliances: String,
    pub obs: String,
    calculated_btu: Option<f64>,
}

impl CalculatorForm {
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Area => self.area = value,
            Field::People => self.people = value,
            Field::Appliances => self.appliances = value,
        }
    }

    /// Compute and remember the BTU. On error the previous result is kept.
    pub fn calculate(&mut self) -> AppResult<f64> {
        let inputs = Inputs::parse(&self.area, &self.people, &self.appliances)?;
        let btu = inputs.btu();
        self.calculated_btu = Some(btu);
        Ok(btu)
    }

    pub fn calculated_btu(&self) -> Option<f64> {
        self.calculated_btu
    }

    /// Summary stored as the history entry's action.
    ///
    /// Returns `None` until a BTU has been calculated.
    pub fn summary(&self, username: &str) -> Option<String> {
        let btu = self.calculated_btu?;
        Some(format!(
            "{} calculated BTU: {} (Area: {}m², People: {}, Appliances: {})",
            username,
            format_number(btu),
            self.area.trim(),
            self.people.trim(),
            self.appliances.trim()
        ))
    }

    /// Observation to send along with the entry, if any
    pub fn observation(&self) -> Option<&str> {
        let obs = self.obs.trim();
        (!obs.is_empty()).then_some(obs)
    }

    /// Drop only the computed result (logout)
    pub fn clear_result(&mut self) {
        self.calculated_btu = None;
    }

    /// Clear every field after a successful save
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
