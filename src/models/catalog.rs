use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::required;
use crate::error::{Error, Result};
use crate::pricing;

/// A billable category of work, e.g. "Lobby Mural" or "Site Survey".
///
/// A project type has no price of its own. Its unit cost is the sum of its
/// resources' `hours_per_unit * rate_per_hour`, recomputed on every read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectType {
    pub id: Uuid,
    pub name: String,
}

/// A labor unit contributing to its project type's unit cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: Uuid,
    pub project_type_id: Uuid,
    pub name: String,
    /// Hours of this resource needed for one unit of the project type.
    pub hours_per_unit: f64,
    pub rate_per_hour: f64,
}

/// Input for creating a project type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectTypeInput {
    #[serde(default)]
    pub name: String,
}

impl CreateProjectTypeInput {
    /// Returns the trimmed name.
    pub fn validate(&self) -> Result<String> {
        required("Name", &self.name)
    }
}

/// Input for renaming a project type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectTypeInput {
    pub name: Option<String>,
}

/// Input for adding a resource to a project type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceInput {
    pub name: String,
    pub hours_per_unit: f64,
    pub rate_per_hour: f64,
}

impl CreateResourceInput {
    pub fn validate(&self) -> Result<CreateResourceInput> {
        Ok(CreateResourceInput {
            name: required("Name", &self.name)?,
            hours_per_unit: non_negative("Hours per unit", self.hours_per_unit)?,
            rate_per_hour: non_negative("Rate per hour", self.rate_per_hour)?,
        })
    }
}

/// Input for updating a resource. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResourceInput {
    pub name: Option<String>,
    pub hours_per_unit: Option<f64>,
    pub rate_per_hour: Option<f64>,
}

impl UpdateResourceInput {
    /// Merge onto an existing resource, validating every resulting field.
    pub fn apply(&self, existing: &Resource) -> Result<Resource> {
        let name = match &self.name {
            Some(name) => required("Name", name)?,
            None => existing.name.clone(),
        };
        let hours_per_unit = match self.hours_per_unit {
            Some(h) => non_negative("Hours per unit", h)?,
            None => existing.hours_per_unit,
        };
        let rate_per_hour = match self.rate_per_hour {
            Some(r) => non_negative("Rate per hour", r)?,
            None => existing.rate_per_hour,
        };

        Ok(Resource {
            id: existing.id,
            project_type_id: existing.project_type_id,
            name,
            hours_per_unit,
            rate_per_hour,
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{} must be a number greater than or equal to 0.",
            field
        )));
    }
    Ok(value)
}

/// A project type with its resources and current unit cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTypeWithResources {
    #[serde(flatten)]
    pub project_type: ProjectType,
    pub resources: Vec<Resource>,
    pub unit_cost: f64,
}

impl ProjectTypeWithResources {
    pub fn new(project_type: ProjectType, resources: Vec<Resource>) -> Self {
        let unit_cost = pricing::unit_cost(&resources);
        Self {
            project_type,
            resources,
            unit_cost,
        }
    }
}
