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

//! Which peers may open connections to a security group, read from the
//! declared ingress rules of one stack.

use super::Stack;
use crate::domain::model::{LogicalId, Token, Value};
use crate::infrastructure::constants::{TYPE_SECURITY_GROUP, TYPE_SECURITY_GROUP_INGRESS};
use ipnet::Ipv4Net;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressSource {
    Group(LogicalId),
    Cidr(Ipv4Net),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IngressEdge {
    target: LogicalId,
    source: IngressSource,
    /// `None` means every port.
    ports: Option<(i64, i64)>,
}

impl IngressEdge {
    fn allows(&self, port: u16) -> bool {
        match self.ports {
            Some((from, to)) => from <= i64::from(port) && i64::from(port) <= to,
            None => true,
        }
    }
}

fn group_target(value: Option<&Value>) -> Option<LogicalId> {
    match value?.as_token()? {
        Token::GetAtt { target, .. } | Token::Ref(target) => Some(target.clone()),
        _ => None,
    }
}

/// Port range of a rule body; all-traffic rules have none.
fn port_range(rule: &Value) -> Option<(i64, i64)> {
    if rule.get("IpProtocol").and_then(|v| v.as_str()) == Some("-1") {
        return None;
    }
    let from = rule.get("FromPort").and_then(|v| v.as_int()).unwrap_or(0);
    let to = rule.get("ToPort").and_then(|v| v.as_int()).unwrap_or(from);
    Some((from, to))
}

fn rule_source(rule: &Value) -> Option<IngressSource> {
    if let Some(group) = group_target(rule.get("SourceSecurityGroupId")) {
        return Some(IngressSource::Group(group));
    }
    rule.get("CidrIp")
        .and_then(|v| v.as_str())
        .and_then(|cidr| cidr.parse().ok())
        .map(IngressSource::Cidr)
}

#[derive(Debug, Clone, Default)]
pub struct Reachability {
    edges: Vec<IngressEdge>,
}

impl Reachability {
    pub fn new(stack: &Stack) -> Self {
        let mut edges = Vec::new();

        for group in stack.resources_of_type(TYPE_SECURITY_GROUP) {
            let inline = group
                .property("SecurityGroupIngress")
                .and_then(|v| v.as_list())
                .unwrap_or_default();
            for rule in inline {
                if let Some(source) = rule_source(rule) {
                    edges.push(IngressEdge {
                        target: group.logical_id.clone(),
                        source,
                        ports: port_range(rule),
                    });
                }
            }
        }

        for rule in stack.resources_of_type(TYPE_SECURITY_GROUP_INGRESS) {
            let body = Value::Map(
                rule.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
            let target = group_target(rule.property("GroupId"));
            if let (Some(target), Some(source)) = (target, rule_source(&body)) {
                edges.push(IngressEdge {
                    target,
                    source,
                    ports: port_range(&body),
                });
            }
        }

        Self { edges }
    }

    pub fn can_reach(&self, source: &LogicalId, target: &LogicalId, port: u16) -> bool {
        self.edges.iter().any(|e| {
            &e.target == target && e.source == IngressSource::Group(source.clone()) && e.allows(port)
        })
    }

    /// Every peer allowed into `target` on `port`.
    pub fn ingress_sources(&self, target: &LogicalId, port: u16) -> Vec<IngressSource> {
        self.edges
            .iter()
            .filter(|e| &e.target == target && e.allows(port))
            .map(|e| e.source.clone())
            .collect()
    }

    /// True if some address range rule overlaps `cidr`.
    pub fn reachable_from_cidr(&self, cidr: &Ipv4Net, target: &LogicalId, port: u16) -> bool {
        self.ingress_sources(target, port).iter().any(|source| match source {
            IngressSource::Cidr(allowed) => {
                allowed.contains(&cidr.network()) || cidr.contains(&allowed.network())
            }
            IngressSource::Group(_) => false,
        })
    }

    /// True if any IPv4 address may connect.
    pub fn publicly_reachable(&self, target: &LogicalId, port: u16) -> bool {
        self.ingress_sources(target, port)
            .iter()
            .any(|source| matches!(source, IngressSource::Cidr(net) if net.prefix_len() == 0))
    }
}
