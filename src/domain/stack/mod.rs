// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stacks and the application that roots them

pub mod primary;
pub mod reachability;
pub mod regional_db;
pub mod validator;

use crate::domain::config::AppConf;
use crate::domain::model::network::MAX_AVAILABILITY_ZONES;
use crate::domain::model::{CfnOutput, CfnParameter, CfnResource, LogicalId};
use crate::shared::error::{Result, StackError};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub use self::primary::{build_primary_stack, PrimaryStack};
pub use self::reachability::{IngressSource, Reachability};
pub use self::regional_db::{build_regional_database_stack, RegionalDatabaseStack};
pub use self::validator::{Finding, Severity, StackValidator, ValidationReport};

fn stack_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid regex"))
}

fn logical_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,254}$").expect("valid regex"))
}

/// Deployment target of a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub account: Option<String>,
    pub region: String,
}

impl Environment {
    pub fn new(account: Option<String>, region: impl Into<String>) -> Self {
        Self {
            account,
            region: region.into(),
        }
    }

    /// First `count` zones of the region, `<region>a`, `<region>b`, ...
    pub fn availability_zones(&self, count: u32) -> Result<Vec<String>> {
        if count == 0 || count > MAX_AVAILABILITY_ZONES {
            return Err(StackError::config_error(format!(
                "{} availability zones requested in {}, at most {} are addressable",
                count, self.region, MAX_AVAILABILITY_ZONES
            )));
        }
        Ok((b'a'..)
            .take(count as usize)
            .map(|suffix| format!("{}{}", self.region, suffix as char))
            .collect())
    }
}

/// A named, independently deployable bundle of resource descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    name: String,
    description: Option<String>,
    env: Environment,
    resources: Vec<CfnResource>,
    parameters: BTreeMap<String, CfnParameter>,
    outputs: Vec<CfnOutput>,
}

impl Stack {
    pub fn new(name: &str, env: Environment) -> Result<Self> {
        if !stack_name_pattern().is_match(name) {
            return Err(StackError::config_error(format!(
                "Invalid stack name '{}': must start with a letter and contain only letters, digits and '-'",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            description: None,
            env,
            resources: Vec::new(),
            parameters: BTreeMap::new(),
            outputs: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Declares a resource; logical ids are unique per stack.
    pub fn add_resource(&mut self, resource: CfnResource) -> Result<LogicalId> {
        let id = resource.logical_id.clone();
        if !logical_id_pattern().is_match(id.as_str()) {
            return Err(StackError::config_error(format!(
                "Invalid logical id '{}' in stack '{}'",
                id, self.name
            )));
        }
        if self.resource(&id).is_some() {
            return Err(StackError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: id.to_string(),
            });
        }
        tracing::debug!(stack = %self.name, logical_id = %id, resource_type = %resource.resource_type, "declared resource");
        self.resources.push(resource);
        Ok(id)
    }

    /// Declares a parameter once; identical redeclarations share it.
    pub fn add_parameter(&mut self, parameter: CfnParameter) -> Result<String> {
        let name = parameter.name.clone();
        match self.parameters.get(&name) {
            Some(existing) if *existing != parameter => Err(StackError::ConflictingParameter {
                stack: self.name.clone(),
                parameter: name,
            }),
            Some(_) => Ok(name),
            None => {
                self.parameters.insert(name.clone(), parameter);
                Ok(name)
            }
        }
    }

    pub fn add_output(&mut self, output: CfnOutput) -> Result<()> {
        if self.outputs.iter().any(|o| o.name == output.name) {
            return Err(StackError::config_error(format!(
                "Duplicate output '{}' in stack '{}'",
                output.name, self.name
            )));
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&CfnResource> {
        self.resources.iter().find(|r| &r.logical_id == id)
    }

    pub fn resources(&self) -> &[CfnResource] {
        &self.resources
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a CfnResource> + 'a {
        self.resources.iter().filter(move |r| r.is_type(resource_type))
    }

    pub fn parameters(&self) -> &BTreeMap<String, CfnParameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &[CfnOutput] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&CfnOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Drops a declared resource. References to it fail at synthesis.
    pub fn remove(&mut self, id: &LogicalId) -> Option<CfnResource> {
        let pos = self.resources.iter().position(|r| &r.logical_id == id)?;
        Some(self.resources.remove(pos))
    }
}

/// Root context that owns every declared stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares both stacks from configuration.
    pub fn from_conf(conf: &AppConf) -> Result<Self> {
        let mut app = Self::new();
        build_primary_stack(&mut app, &conf.primary)?;
        build_regional_database_stack(&mut app, &conf.regional_database)?;
        Ok(app)
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stack(stack.name()).is_some() {
            return Err(StackError::DuplicateStack(stack.name().to_string()));
        }
        tracing::info!(
            stack = %stack.name(),
            region = %stack.env().region,
            resources = stack.resources().len(),
            "stack declared"
        );
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    pub fn stack_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.iter_mut().find(|s| s.name() == name)
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Stacks matching `names`, or all of them when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Stack>> {
        if names.is_empty() {
            return Ok(self.stacks.iter().collect());
        }
        names
            .iter()
            .map(|n| {
                self.stack(n)
                    .ok_or_else(|| StackError::StackNotFound(n.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Props;

    fn stack() -> Stack {
        Stack::new("Test", Environment::new(None, "us-east-1")).unwrap()
    }

    #[test]
    fn test_availability_zones() {
        let env = Environment::new(None, "me-south-1");
        assert_eq!(
            env.availability_zones(2).unwrap(),
            vec!["me-south-1a", "me-south-1b"]
        );
        assert_eq!(env.availability_zones(6).unwrap().last().unwrap(), "me-south-1f");
        assert!(env.availability_zones(7).is_err());
    }

    #[test]
    fn test_invalid_stack_name() {
        assert!(Stack::new("1stack", Environment::new(None, "us-east-1")).is_err());
        assert!(Stack::new("my_stack", Environment::new(None, "us-east-1")).is_err());
    }

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut stack = stack();
        let r = CfnResource::new(LogicalId::new("Vpc"), "AWS::EC2::VPC", Props::new());
        stack.add_resource(r.clone()).unwrap();
        let err = stack.add_resource(r).unwrap_err();
        assert!(matches!(err, StackError::DuplicateLogicalId { .. }));
    }

    #[test]
    fn test_parameter_redeclaration() {
        let mut stack = stack();
        let image = CfnParameter {
            name: "ImageId".to_string(),
            parameter_type: "String".to_string(),
            default: Some("/aws/image".to_string()),
            description: None,
        };
        assert_eq!(stack.add_parameter(image.clone()).unwrap(), "ImageId");
        assert_eq!(stack.add_parameter(image.clone()).unwrap(), "ImageId");
        assert_eq!(stack.parameters().len(), 1);

        let conflicting = CfnParameter {
            default: Some("/aws/other-image".to_string()),
            ..image
        };
        let err = stack.add_parameter(conflicting).unwrap_err();
        assert!(matches!(err, StackError::ConflictingParameter { ref parameter, .. } if parameter == "ImageId"));
        assert_eq!(
            stack.parameters()["ImageId"].default.as_deref(),
            Some("/aws/image")
        );
    }

    #[test]
    fn test_remove_resource() {
        let mut stack = stack();
        let id = stack
            .add_resource(CfnResource::new(LogicalId::new("Vpc"), "AWS::EC2::VPC", Props::new()))
            .unwrap();
        assert!(stack.remove(&id).is_some());
        assert!(stack.resource(&id).is_none());
        assert!(stack.remove(&id).is_none());
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut app = App::new();
        app.add_stack(stack()).unwrap();
        assert!(matches!(app.add_stack(stack()), Err(StackError::DuplicateStack(_))));
    }
}
