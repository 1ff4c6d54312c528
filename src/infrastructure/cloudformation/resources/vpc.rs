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

use crate::domain::model::{
    plan_subnets, tags, CfnResource, LogicalId, Props, SubnetPlan, SubnetTier, Token, Value,
    VpcProps,
};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{
    ANY_IPV4, TAG_NAME, TAG_SUBNET_NAME, TAG_SUBNET_TYPE, TYPE_EIP, TYPE_GATEWAY_ATTACHMENT,
    TYPE_INTERNET_GATEWAY, TYPE_NAT_GATEWAY, TYPE_ROUTE, TYPE_ROUTE_TABLE,
    TYPE_ROUTE_TABLE_ASSOCIATION, TYPE_SUBNET, TYPE_VPC,
};
use crate::shared::error::{Result, StackError};
use ipnet::Ipv4Net;

#[derive(Debug, Clone, PartialEq)]
pub struct SubnetHandle {
    pub subnet: LogicalId,
    pub route_table: LogicalId,
    pub tier: SubnetTier,
    pub config_name: String,
    pub availability_zone: String,
    pub cidr: Ipv4Net,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VpcHandle {
    pub vpc: LogicalId,
    pub cidr: Ipv4Net,
    pub subnets: Vec<SubnetHandle>,
    pub internet_gateway: Option<LogicalId>,
    pub nat_gateways: Vec<LogicalId>,
}

impl VpcHandle {
    pub fn subnets_in(&self, tier: SubnetTier) -> impl Iterator<Item = &SubnetHandle> {
        self.subnets.iter().filter(move |s| s.tier == tier)
    }

    /// `[Ref, ...]` of the subnets in a tier, or a placement error when the
    /// tier was not declared.
    pub fn subnet_refs(&self, tier: SubnetTier, consumer: &str) -> Result<Value> {
        let refs: Vec<Value> = self
            .subnets_in(tier)
            .map(|s| Token::reference(&s.subnet).into())
            .collect();
        if refs.is_empty() {
            return Err(StackError::invalid_placement(
                consumer,
                format!("network '{}' has no {} subnets", self.vpc, tier.as_str()),
            ));
        }
        Ok(Value::List(refs))
    }

    pub fn vpc_ref(&self) -> Value {
        Token::reference(&self.vpc).into()
    }
}

pub struct VpcBuilder {
    id: String,
    props: VpcProps,
}

impl VpcBuilder {
    pub fn new(id: &str, props: VpcProps) -> Self {
        Self {
            id: id.to_string(),
            props,
        }
    }

    pub fn build(&self, stack: &mut Stack) -> Result<VpcHandle> {
        self.props.validate()?;

        let zones = stack.env().availability_zones(self.props.max_azs)?;
        let plans = plan_subnets(&self.props, &zones)?;
        let vpc_id = LogicalId::new(&self.id);
        let name_tag = format!("{}/{}", stack.name(), self.id);

        stack.add_resource(CfnResource::new(
            vpc_id.clone(),
            TYPE_VPC,
            Props::new()
                .with("CidrBlock", self.props.cidr.to_string())
                .with("EnableDnsHostnames", true)
                .with("EnableDnsSupport", true)
                .with("InstanceTenancy", "default")
                .with("Tags", tags(&[(TAG_NAME, name_tag.as_str())])),
        ))?;

        let internet_gateway = if self.props.has_tier(SubnetTier::Public) {
            let igw = stack.add_resource(CfnResource::new(
                vpc_id.child("IGW"),
                TYPE_INTERNET_GATEWAY,
                Props::new().with("Tags", tags(&[(TAG_NAME, name_tag.as_str())])),
            ))?;
            let attachment = stack.add_resource(CfnResource::new(
                vpc_id.child("VPCGW"),
                TYPE_GATEWAY_ATTACHMENT,
                Props::new()
                    .with("VpcId", Token::reference(&vpc_id))
                    .with("InternetGatewayId", Token::reference(&igw)),
            ))?;
            Some((igw, attachment))
        } else {
            None
        };

        let mut subnets = Vec::with_capacity(plans.len());
        for plan in &plans {
            subnets.push(self.declare_subnet(stack, &vpc_id, plan)?);
        }

        let mut nat_gateways = Vec::new();
        if let Some((igw, attachment)) = &internet_gateway {
            let nat_count = self.props.nat_gateways.min(self.props.max_azs) as usize;
            for subnet in subnets.iter().filter(|s| s.tier == SubnetTier::Public) {
                let route = stack.add_resource(
                    CfnResource::new(
                        subnet.subnet.child("DefaultRoute"),
                        TYPE_ROUTE,
                        Props::new()
                            .with("RouteTableId", Token::reference(&subnet.route_table))
                            .with("DestinationCidrBlock", ANY_IPV4)
                            .with("GatewayId", Token::reference(igw)),
                    )
                    .depends_on(attachment),
                )?;

                if nat_gateways.len() < nat_count {
                    let eip = stack.add_resource(CfnResource::new(
                        subnet.subnet.child("EIP"),
                        TYPE_EIP,
                        Props::new()
                            .with("Domain", "vpc")
                            .with("Tags", tags(&[(TAG_NAME, name_tag.as_str())])),
                    ))?;
                    let nat = stack.add_resource(
                        CfnResource::new(
                            subnet.subnet.child("NATGateway"),
                            TYPE_NAT_GATEWAY,
                            Props::new()
                                .with("SubnetId", Token::reference(&subnet.subnet))
                                .with("AllocationId", Token::get_att(&eip, "AllocationId"))
                                .with("Tags", tags(&[(TAG_NAME, name_tag.as_str())])),
                        )
                        .depends_on(&route),
                    )?;
                    nat_gateways.push(nat);
                }
            }
        }

        for (i, subnet) in subnets
            .iter()
            .filter(|s| s.tier == SubnetTier::PrivateWithEgress)
            .enumerate()
        {
            let nat = &nat_gateways[i % nat_gateways.len()];
            stack.add_resource(CfnResource::new(
                subnet.subnet.child("DefaultRoute"),
                TYPE_ROUTE,
                Props::new()
                    .with("RouteTableId", Token::reference(&subnet.route_table))
                    .with("DestinationCidrBlock", ANY_IPV4)
                    .with("NatGatewayId", Token::reference(nat)),
            ))?;
        }

        tracing::debug!(
            vpc = %vpc_id,
            cidr = %self.props.cidr,
            subnets = subnets.len(),
            nat_gateways = nat_gateways.len(),
            "network fabric declared"
        );

        Ok(VpcHandle {
            vpc: vpc_id,
            cidr: self.props.cidr,
            subnets,
            internet_gateway: internet_gateway.map(|(igw, _)| igw),
            nat_gateways,
        })
    }

    fn declare_subnet(
        &self,
        stack: &mut Stack,
        vpc_id: &LogicalId,
        plan: &SubnetPlan,
    ) -> Result<SubnetHandle> {
        let position = format!("Subnet{}", plan.index);
        let scope = LogicalId::from_path(&[
            self.id.as_str(),
            plan.config_name.as_str(),
            position.as_str(),
        ]);
        let name_tag = format!(
            "{}/{}/{}Subnet{}",
            stack.name(),
            self.id,
            plan.config_name,
            plan.index
        );
        let subnet_tags = tags(&[
            (TAG_NAME, name_tag.as_str()),
            (TAG_SUBNET_NAME, plan.config_name.as_str()),
            (TAG_SUBNET_TYPE, plan.tier.as_str()),
        ]);

        let subnet = stack.add_resource(CfnResource::new(
            scope.child("Subnet"),
            TYPE_SUBNET,
            Props::new()
                .with("VpcId", Token::reference(vpc_id))
                .with("AvailabilityZone", plan.availability_zone.as_str())
                .with("CidrBlock", plan.cidr.to_string())
                .with("MapPublicIpOnLaunch", plan.tier == SubnetTier::Public)
                .with("Tags", subnet_tags.clone()),
        ))?;

        let route_table = stack.add_resource(CfnResource::new(
            scope.child("RouteTable"),
            TYPE_ROUTE_TABLE,
            Props::new()
                .with("VpcId", Token::reference(vpc_id))
                .with("Tags", subnet_tags),
        ))?;

        stack.add_resource(CfnResource::new(
            scope.child("RouteTableAssociation"),
            TYPE_ROUTE_TABLE_ASSOCIATION,
            Props::new()
                .with("RouteTableId", Token::reference(&route_table))
                .with("SubnetId", Token::reference(&subnet)),
        ))?;

        Ok(SubnetHandle {
            subnet,
            route_table,
            tier: plan.tier,
            config_name: plan.config_name.clone(),
            availability_zone: plan.availability_zone.clone(),
            cidr: plan.cidr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SubnetConfiguration;
    use crate::domain::stack::Environment;

    fn props() -> VpcProps {
        VpcProps {
            cidr: "10.0.0.0/16".parse().unwrap(),
            max_azs: 2,
            nat_gateways: 1,
            subnets: vec![
                SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                SubnetConfiguration::new("Application", SubnetTier::PrivateWithEgress, 24),
                SubnetConfiguration::new("Database", SubnetTier::Isolated, 24),
            ],
        }
    }

    fn stack() -> Stack {
        Stack::new("Net", Environment::new(None, "us-east-1")).unwrap()
    }

    #[test]
    fn test_three_tier_network() {
        let mut stack = stack();
        let vpc = VpcBuilder::new("Vpc", props()).build(&mut stack).unwrap();

        assert_eq!(vpc.subnets.len(), 6);
        assert!(vpc.internet_gateway.is_some());
        assert_eq!(vpc.nat_gateways.len(), 1);
        assert_eq!(stack.resources_of_type(TYPE_SUBNET).count(), 6);
        // two public default routes, two private default routes
        assert_eq!(stack.resources_of_type(TYPE_ROUTE).count(), 4);

        let first = &vpc.subnets[0];
        assert_eq!(first.subnet.as_str(), "VpcPublicSubnet1Subnet");
        assert_eq!(first.availability_zone, "us-east-1a");
    }

    #[test]
    fn test_isolated_route_tables_have_no_routes() {
        let mut stack = stack();
        let vpc = VpcBuilder::new("Vpc", props()).build(&mut stack).unwrap();

        for subnet in vpc.subnets_in(SubnetTier::Isolated) {
            let routes = stack
                .resources_of_type(TYPE_ROUTE)
                .filter(|r| {
                    r.property("RouteTableId")
                        .and_then(|v| v.as_token())
                        .and_then(|t| t.target())
                        == Some(&subnet.route_table)
                })
                .count();
            assert_eq!(routes, 0);
        }
    }

    #[test]
    fn test_isolated_only_network_has_no_gateway() {
        let mut stack = stack();
        let isolated = VpcProps {
            cidr: "10.20.0.0/16".parse().unwrap(),
            max_azs: 2,
            nat_gateways: 0,
            subnets: vec![SubnetConfiguration::new("Database", SubnetTier::Isolated, 24)],
        };
        let vpc = VpcBuilder::new("Vpc", isolated).build(&mut stack).unwrap();

        assert!(vpc.internet_gateway.is_none());
        assert_eq!(stack.resources_of_type(TYPE_INTERNET_GATEWAY).count(), 0);
        assert_eq!(stack.resources_of_type(TYPE_NAT_GATEWAY).count(), 0);
        assert!(vpc.subnet_refs(SubnetTier::Public, "Service").is_err());
    }
}
