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

//! Structural checks over declared resources, run before synthesis.

use super::Stack;
use crate::domain::model::compute::is_previous_generation_family;
use crate::domain::model::{CfnResource, LogicalId, SubnetTier, Token, Value};
use crate::infrastructure::constants::{
    TAG_SUBNET_TYPE, TYPE_AUTO_SCALING_GROUP, TYPE_DB_INSTANCE, TYPE_DB_SUBNET_GROUP,
    TYPE_LAUNCH_TEMPLATE, TYPE_ROUTE, TYPE_ROUTE_TABLE_ASSOCIATION, TYPE_SCALABLE_TARGET,
    TYPE_SECURITY_GROUP, TYPE_SECURITY_GROUP_INGRESS, TYPE_SUBNET,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub stack: String,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    fn push(&mut self, severity: Severity, resource: &LogicalId, message: String) {
        self.findings.push(Finding {
            severity,
            resource: resource.to_string(),
            message,
        });
    }
}

fn ref_target(value: &Value) -> Option<&LogicalId> {
    match value.as_token()? {
        Token::Ref(id) => Some(id),
        Token::GetAtt { target, .. } => Some(target),
        _ => None,
    }
}

fn int_property(resource: &CfnResource, key: &str) -> Option<i64> {
    resource.property(key).and_then(|v| v.as_int())
}

fn tag_value<'a>(resource: &'a CfnResource, key: &str) -> Option<&'a str> {
    resource
        .property("Tags")?
        .as_list()?
        .iter()
        .find(|tag| tag.get("Key").and_then(|k| k.as_str()) == Some(key))
        .and_then(|tag| tag.get("Value"))
        .and_then(|v| v.as_str())
}

/// Tier of a declared subnet, read from its subnet-type tag.
fn subnet_tier(stack: &Stack, subnet: &LogicalId) -> Option<SubnetTier> {
    let resource = stack.resource(subnet)?;
    if !resource.is_type(TYPE_SUBNET) {
        return None;
    }
    tag_value(resource, TAG_SUBNET_TYPE).and_then(|t| t.parse().ok())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StackValidator;

impl StackValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, stack: &Stack) -> ValidationReport {
        let mut report = ValidationReport {
            stack: stack.name().to_string(),
            findings: Vec::new(),
        };

        self.validate_group_capacity(stack, &mut report);
        self.validate_scalable_targets(stack, &mut report);
        self.validate_databases(stack, &mut report);
        self.validate_subnet_groups(stack, &mut report);
        self.validate_isolated_routes(stack, &mut report);
        self.validate_ingress_rules(stack, &mut report);
        self.validate_instance_types(stack, &mut report);

        tracing::debug!(
            stack = %stack.name(),
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "stack validated"
        );
        report
    }

    fn validate_group_capacity(&self, stack: &Stack, report: &mut ValidationReport) {
        for group in stack.resources_of_type(TYPE_AUTO_SCALING_GROUP) {
            let min = int_property(group, "MinSize");
            let desired = int_property(group, "DesiredCapacity");
            let max = int_property(group, "MaxSize");
            match (min, max) {
                (Some(min), Some(max)) => {
                    let desired = desired.unwrap_or(min);
                    if max <= 0 || min > desired || desired > max {
                        report.push(
                            Severity::Error,
                            &group.logical_id,
                            format!(
                                "capacity must satisfy min <= desired <= max and max > 0, got {} <= {} <= {}",
                                min, desired, max
                            ),
                        );
                    }
                }
                _ => report.push(
                    Severity::Error,
                    &group.logical_id,
                    "MinSize and MaxSize must be set".to_string(),
                ),
            }
        }
    }

    fn validate_scalable_targets(&self, stack: &Stack, report: &mut ValidationReport) {
        for target in stack.resources_of_type(TYPE_SCALABLE_TARGET) {
            let min = int_property(target, "MinCapacity").unwrap_or(0);
            let max = int_property(target, "MaxCapacity").unwrap_or(0);
            if min > max || max <= 0 {
                report.push(
                    Severity::Error,
                    &target.logical_id,
                    format!("task scaling must satisfy min <= max and max > 0, got {}..{}", min, max),
                );
            }
        }
    }

    fn validate_databases(&self, stack: &Stack, report: &mut ValidationReport) {
        for db in stack.resources_of_type(TYPE_DB_INSTANCE) {
            let allocated = int_property(db, "AllocatedStorage");
            let max_allocated = int_property(db, "MaxAllocatedStorage");
            if let (Some(allocated), Some(max_allocated)) = (allocated, max_allocated) {
                if allocated > max_allocated {
                    report.push(
                        Severity::Error,
                        &db.logical_id,
                        format!(
                            "allocated storage ({} GiB) exceeds max allocated storage ({} GiB)",
                            allocated, max_allocated
                        ),
                    );
                }
            }

            if db.property("PubliclyAccessible").and_then(|v| v.as_bool()) == Some(true) {
                report.push(
                    Severity::Error,
                    &db.logical_id,
                    "database must not be publicly accessible".to_string(),
                );
            }

            if db.property("DeletionProtection").and_then(|v| v.as_bool()) != Some(true) {
                report.push(
                    Severity::Warning,
                    &db.logical_id,
                    "deletion protection is disabled; the instance is removed with the stack"
                        .to_string(),
                );
            }
        }
    }

    fn validate_subnet_groups(&self, stack: &Stack, report: &mut ValidationReport) {
        for group in stack.resources_of_type(TYPE_DB_SUBNET_GROUP) {
            let subnets = group
                .property("SubnetIds")
                .and_then(|v| v.as_list())
                .unwrap_or_default();
            if subnets.is_empty() {
                report.push(
                    Severity::Error,
                    &group.logical_id,
                    "database subnet group has no subnets".to_string(),
                );
            }
            for subnet in subnets.iter().filter_map(ref_target) {
                let tier = subnet_tier(stack, subnet);
                if tier != Some(SubnetTier::Isolated) {
                    report.push(
                        Severity::Error,
                        &group.logical_id,
                        format!(
                            "subnet '{}' is {}, database subnets must be isolated",
                            subnet,
                            tier.map(|t| t.as_str()).unwrap_or("unknown")
                        ),
                    );
                }
            }
        }
    }

    fn validate_isolated_routes(&self, stack: &Stack, report: &mut ValidationReport) {
        let isolated_tables: Vec<&LogicalId> = stack
            .resources_of_type(TYPE_ROUTE_TABLE_ASSOCIATION)
            .filter(|assoc| {
                assoc
                    .property("SubnetId")
                    .and_then(ref_target)
                    .and_then(|subnet| subnet_tier(stack, subnet))
                    == Some(SubnetTier::Isolated)
            })
            .filter_map(|assoc| assoc.property("RouteTableId").and_then(ref_target))
            .collect();

        for route in stack.resources_of_type(TYPE_ROUTE) {
            let table = route.property("RouteTableId").and_then(ref_target);
            if let Some(table) = table.filter(|t| isolated_tables.contains(t)) {
                report.push(
                    Severity::Error,
                    &route.logical_id,
                    format!("route table '{}' belongs to an isolated subnet and must have no routes", table),
                );
            }
        }
    }

    fn validate_ingress_rules(&self, stack: &Stack, report: &mut ValidationReport) {
        for rule in stack.resources_of_type(TYPE_SECURITY_GROUP_INGRESS) {
            for key in ["GroupId", "SourceSecurityGroupId"] {
                let Some(value) = rule.property(key) else {
                    continue;
                };
                let known = ref_target(value)
                    .and_then(|id| stack.resource(id))
                    .is_some_and(|r| r.is_type(TYPE_SECURITY_GROUP));
                if !known {
                    report.push(
                        Severity::Error,
                        &rule.logical_id,
                        format!("{} must reference a security group declared in this stack", key),
                    );
                }
            }
        }
    }

    fn validate_instance_types(&self, stack: &Stack, report: &mut ValidationReport) {
        for template in stack.resources_of_type(TYPE_LAUNCH_TEMPLATE) {
            let instance_type = template
                .property("LaunchTemplateData")
                .and_then(|d| d.get("InstanceType"))
                .and_then(|v| v.as_str());
            if let Some(instance_type) = instance_type {
                let family = instance_type.split('.').next().unwrap_or_default();
                if is_previous_generation_family(family) {
                    report.push(
                        Severity::Warning,
                        &template.logical_id,
                        format!("{} is a previous-generation instance type", instance_type),
                    );
                }
            }
        }
    }
}
