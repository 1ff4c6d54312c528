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

//! Reference checking and dependency ordering.

use crate::domain::model::{CfnResource, LogicalId, Token, Value};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::known_attributes;
use crate::shared::error::{Result, StackError};
use std::collections::{BTreeMap, BTreeSet};

/// `(dependent, dependency)`: the first resource is created after the second.
pub type Edge = (LogicalId, LogicalId);

/// Checks one token against the declarations of `stack`.
fn check_token(stack: &Stack, from: &str, token: &Token) -> Result<()> {
    match token {
        Token::Ref(target) => {
            if stack.resource(target).is_none() {
                return Err(StackError::unresolved(stack.name(), from, target.as_str()));
            }
        }
        Token::GetAtt { target, attribute } => {
            let resource = stack
                .resource(target)
                .ok_or_else(|| StackError::unresolved(stack.name(), from, target.as_str()))?;
            let known = known_attributes(&resource.resource_type);
            if !known.contains(&attribute.as_str()) {
                return Err(StackError::UnknownAttribute {
                    stack: stack.name().to_string(),
                    target: target.to_string(),
                    resource_type: resource.resource_type.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
        Token::Parameter(name) => {
            if !stack.parameters().contains_key(name) {
                return Err(StackError::UnknownParameter {
                    stack: stack.name().to_string(),
                    parameter: name.clone(),
                });
            }
        }
        Token::Pseudo(_) | Token::Join { .. } | Token::Base64(_) => {}
    }
    Ok(())
}

fn check_value(stack: &Stack, from: &str, value: &Value) -> Result<()> {
    let mut tokens = Vec::new();
    value.visit_tokens(&mut |t| tokens.push(t));
    for token in tokens {
        check_token(stack, from, token)?;
    }
    Ok(())
}

/// Every token and `DependsOn` entry must point at a declaration of the
/// same stack.
pub fn check_references(stack: &Stack) -> Result<()> {
    for resource in stack.resources() {
        let from = resource.logical_id.as_str();
        for (_, value) in resource.properties.iter() {
            check_value(stack, from, value)?;
        }
        for dependency in &resource.depends_on {
            if stack.resource(dependency).is_none() {
                return Err(StackError::unresolved(stack.name(), from, dependency.as_str()));
            }
        }
    }
    for output in stack.outputs() {
        check_value(stack, &output.name, &output.value)?;
    }
    Ok(())
}

/// Edges implied by tokens plus explicit `DependsOn`, without self loops.
pub fn dependency_edges(resources: &[CfnResource]) -> BTreeSet<Edge> {
    let mut edges = BTreeSet::new();
    for resource in resources {
        let from = &resource.logical_id;
        let targets = resource
            .referenced_ids()
            .into_iter()
            .chain(resource.depends_on.iter());
        for target in targets {
            if target != from {
                edges.insert((from.clone(), target.clone()));
            }
        }
    }
    edges
}

/// Creation order: dependencies first, ties broken by declaration order so
/// the same stack always yields the same order.
pub fn creation_order(stack: &Stack, edges: &BTreeSet<Edge>) -> Result<Vec<LogicalId>> {
    let resources = stack.resources();
    let position: BTreeMap<&LogicalId, usize> = resources
        .iter()
        .enumerate()
        .map(|(i, r)| (&r.logical_id, i))
        .collect();

    let mut pending = vec![0usize; resources.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); resources.len()];
    for (from, to) in edges {
        if let (Some(&f), Some(&t)) = (position.get(from), position.get(to)) {
            pending[f] += 1;
            dependents[t].push(f);
        }
    }

    let mut ready: BTreeSet<usize> = (0..resources.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(resources.len());
    while let Some(next) = ready.pop_first() {
        order.push(resources[next].logical_id.clone());
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != resources.len() {
        let members = (0..resources.len())
            .filter(|&i| pending[i] > 0)
            .map(|i| resources[i].logical_id.to_string())
            .collect();
        return Err(StackError::DependencyCycle {
            stack: stack.name().to_string(),
            members,
        });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CfnParameter, Props};
    use crate::domain::stack::Environment;

    fn stack() -> Stack {
        Stack::new("Resolve", Environment::new(None, "us-east-1")).unwrap()
    }

    fn declare(stack: &mut Stack, id: &str, resource_type: &str, props: Props) -> LogicalId {
        stack
            .add_resource(CfnResource::new(LogicalId::new(id), resource_type, props))
            .unwrap()
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let mut s = stack();
        let subnet_props = Props::new().with("VpcId", Token::reference(&LogicalId::new("Vpc")));
        declare(&mut s, "Subnet", "AWS::EC2::Subnet", subnet_props);
        declare(&mut s, "Vpc", "AWS::EC2::VPC", Props::new());
        declare(&mut s, "Cluster", "AWS::ECS::Cluster", Props::new());

        check_references(&s).unwrap();
        let edges = dependency_edges(s.resources());
        let order = creation_order(&s, &edges).unwrap();
        let names: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["Vpc", "Subnet", "Cluster"]);
    }

    #[test]
    fn test_dangling_reference() {
        let mut s = stack();
        declare(
            &mut s,
            "Subnet",
            "AWS::EC2::Subnet",
            Props::new().with("VpcId", Token::reference(&LogicalId::new("Missing"))),
        );
        let err = check_references(&s).unwrap_err();
        assert!(matches!(err, StackError::UnresolvedReference { ref target, .. } if target == "Missing"));
    }

    #[test]
    fn test_unknown_attribute() {
        let mut s = stack();
        let vpc = declare(&mut s, "Vpc", "AWS::EC2::VPC", Props::new());
        declare(
            &mut s,
            "Subnet",
            "AWS::EC2::Subnet",
            Props::new().with("VpcId", Token::get_att(&vpc, "NotAnAttribute")),
        );
        assert!(matches!(
            check_references(&s),
            Err(StackError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_parameter_must_be_declared() {
        let mut s = stack();
        let props = Props::new().with("ImageId", Token::Parameter("Image".to_string()));
        declare(&mut s, "Template", "AWS::EC2::LaunchTemplate", props);
        assert!(matches!(
            check_references(&s),
            Err(StackError::UnknownParameter { .. })
        ));

        s.add_parameter(CfnParameter {
            name: "Image".to_string(),
            parameter_type: "String".to_string(),
            default: None,
            description: None,
        })
        .unwrap();
        assert!(check_references(&s).is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let mut s = stack();
        let a = LogicalId::new("A");
        let b = LogicalId::new("B");
        s.add_resource(CfnResource::new(a.clone(), "AWS::EC2::VPC", Props::new()).depends_on(&b))
            .unwrap();
        s.add_resource(CfnResource::new(b.clone(), "AWS::EC2::VPC", Props::new()).depends_on(&a))
            .unwrap();
        declare(&mut s, "C", "AWS::EC2::VPC", Props::new());

        let edges = dependency_edges(s.resources());
        match creation_order(&s, &edges) {
            Err(StackError::DependencyCycle { members, .. }) => {
                assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
