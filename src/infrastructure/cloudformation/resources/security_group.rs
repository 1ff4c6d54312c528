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

use crate::domain::model::{CfnResource, IngressRule, LogicalId, Peer, Port, Props, SecurityGroupProps, Token, Value};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{
    ANY_IPV4, DISALLOW_ALL_CIDR, DISALLOW_ALL_FROM_PORT, DISALLOW_ALL_TO_PORT,
    TYPE_SECURITY_GROUP, TYPE_SECURITY_GROUP_INGRESS,
};
use crate::shared::error::Result;

fn with_port_range(props: Props, port: &Port) -> Props {
    let props = props.with("IpProtocol", port.protocol());
    match port.range() {
        Some((from, to)) => props.with("FromPort", from).with("ToPort", to),
        None => props,
    }
}

pub struct SecurityGroupBuilder {
    id: String,
    vpc: LogicalId,
    props: SecurityGroupProps,
}

impl SecurityGroupBuilder {
    pub fn new(id: &str, vpc: &LogicalId, props: SecurityGroupProps) -> Self {
        Self {
            id: id.to_string(),
            vpc: vpc.clone(),
            props,
        }
    }

    /// Declares the group. Rules whose peer is another group become
    /// standalone ingress resources named after this group.
    pub fn build(&self, stack: &mut Stack) -> Result<LogicalId> {
        let egress = if self.props.allow_all_outbound {
            Props::new()
                .with("CidrIp", ANY_IPV4)
                .with("IpProtocol", "-1")
                .with("Description", "Allow all outbound traffic by default")
        } else {
            Props::new()
                .with("CidrIp", DISALLOW_ALL_CIDR)
                .with("IpProtocol", "icmp")
                .with("FromPort", DISALLOW_ALL_FROM_PORT)
                .with("ToPort", DISALLOW_ALL_TO_PORT)
                .with("Description", "Disallow all traffic")
        };

        let inline: Vec<Value> = self
            .props
            .ingress
            .iter()
            .filter_map(|rule| match &rule.peer {
                Peer::Ipv4(cidr) => Some(
                    with_port_range(
                        Props::new()
                            .with("CidrIp", cidr.to_string())
                            .with("Description", rule.description.as_str()),
                        &rule.port,
                    )
                    .into(),
                ),
                Peer::SecurityGroup(_) => None,
            })
            .collect();

        let mut props = Props::new()
            .with("GroupDescription", self.props.description.as_str())
            .with("VpcId", Token::reference(&self.vpc))
            .with("SecurityGroupEgress", vec![Value::from(egress)]);
        if !inline.is_empty() {
            props.insert("SecurityGroupIngress", inline);
        }

        let group = stack.add_resource(CfnResource::new(
            LogicalId::new(&self.id),
            TYPE_SECURITY_GROUP,
            props,
        ))?;

        for rule in &self.props.ingress {
            if let Peer::SecurityGroup(source) = &rule.peer {
                let rule_id = group.child(&format!("from{}{}", source, port_suffix(&rule.port)));
                IngressRuleBuilder::new(rule_id, &group, source, rule.port, &rule.description)
                    .build(stack)?;
            }
        }

        Ok(group)
    }
}

fn port_suffix(port: &Port) -> String {
    match port {
        Port::Tcp(p) => p.to_string(),
        Port::TcpRange(from, to) => format!("{}to{}", from, to),
        Port::AllTraffic => "All".to_string(),
    }
}

/// Standalone permission from one group to another.
pub struct IngressRuleBuilder {
    id: LogicalId,
    target: LogicalId,
    source: LogicalId,
    port: Port,
    description: String,
}

impl IngressRuleBuilder {
    pub fn new(
        id: LogicalId,
        target: &LogicalId,
        source: &LogicalId,
        port: Port,
        description: &str,
    ) -> Self {
        Self {
            id,
            target: target.clone(),
            source: source.clone(),
            port,
            description: description.to_string(),
        }
    }

    /// Logical id derived from both groups and the port.
    pub fn between(target: &LogicalId, source: &LogicalId, port: Port, description: &str) -> Self {
        let id = target.child(&format!("from{}{}", source, port_suffix(&port)));
        Self::new(id, target, source, port, description)
    }

    pub fn rule(&self) -> IngressRule {
        IngressRule {
            peer: Peer::SecurityGroup(self.source.clone()),
            port: self.port,
            description: self.description.clone(),
        }
    }

    pub fn build(&self, stack: &mut Stack) -> Result<LogicalId> {
        let props = with_port_range(
            Props::new()
                .with("GroupId", Token::get_att(&self.target, "GroupId"))
                .with("SourceSecurityGroupId", Token::get_att(&self.source, "GroupId"))
                .with("Description", self.description.as_str()),
            &self.port,
        );
        stack.add_resource(CfnResource::new(
            self.id.clone(),
            TYPE_SECURITY_GROUP_INGRESS,
            props,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::Environment;

    fn stack() -> Stack {
        Stack::new("Sg", Environment::new(None, "us-east-1")).unwrap()
    }

    #[test]
    fn test_restricted_group_blocks_egress() {
        let mut stack = stack();
        let vpc = LogicalId::new("Vpc");
        let sg = SecurityGroupBuilder::new("DbSg", &vpc, SecurityGroupProps::restricted("db"))
            .build(&mut stack)
            .unwrap();

        let resource = stack.resource(&sg).unwrap();
        let egress = resource.property("SecurityGroupEgress").unwrap().as_list().unwrap();
        assert_eq!(egress.len(), 1);
        assert_eq!(egress[0].get("CidrIp").and_then(|v| v.as_str()), Some(DISALLOW_ALL_CIDR));
        assert!(resource.property("SecurityGroupIngress").is_none());
    }

    #[test]
    fn test_group_peer_becomes_standalone_rule() {
        let mut stack = stack();
        let vpc = LogicalId::new("Vpc");
        let source = LogicalId::new("ServiceSg");
        let mut props = SecurityGroupProps::open_outbound("lb");
        props.ingress.push(IngressRule {
            peer: Peer::any_ipv4(),
            port: Port::Tcp(80),
            description: "Allow from anyone on port 80".to_string(),
        });
        props.ingress.push(IngressRule {
            peer: Peer::SecurityGroup(source.clone()),
            port: Port::Tcp(8080),
            description: "from service".to_string(),
        });

        let sg = SecurityGroupBuilder::new("LbSg", &vpc, props).build(&mut stack).unwrap();
        let inline = stack
            .resource(&sg)
            .unwrap()
            .property("SecurityGroupIngress")
            .unwrap()
            .as_list()
            .unwrap()
            .to_vec();
        assert_eq!(inline.len(), 1);

        let rules: Vec<_> = stack.resources_of_type(TYPE_SECURITY_GROUP_INGRESS).collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].logical_id.as_str(), "LbSgfromServiceSg8080");
        assert_eq!(rules[0].referenced_ids(), vec![&sg, &source]);
    }
}
