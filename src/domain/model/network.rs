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

use crate::shared::error::{Result, StackError};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Smallest and largest subnet prefix the provider accepts.
const MIN_SUBNET_PREFIX: u8 = 16;
const MAX_SUBNET_PREFIX: u8 = 28;

/// Zone suffixes run `a` through `f`.
pub const MAX_AVAILABILITY_ZONES: u32 = 6;

/// Internet reachability class of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Routed to an internet gateway.
    Public,
    /// Outbound through NAT, no inbound from the internet.
    PrivateWithEgress,
    /// No route outside the VPC at all.
    Isolated,
}

impl SubnetTier {
    /// Value of the `aws-cdk:subnet-type` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetTier::Public => "Public",
            SubnetTier::PrivateWithEgress => "Private",
            SubnetTier::Isolated => "Isolated",
        }
    }
}

impl std::str::FromStr for SubnetTier {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Public" | "public" => Ok(SubnetTier::Public),
            "Private" | "private" | "private_with_egress" => Ok(SubnetTier::PrivateWithEgress),
            "Isolated" | "isolated" => Ok(SubnetTier::Isolated),
            _ => Err(StackError::config_error(format!("Invalid subnet tier: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetConfiguration {
    pub name: String,
    pub tier: SubnetTier,
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: &str, tier: SubnetTier, cidr_mask: u8) -> Self {
        Self {
            name: name.to_string(),
            tier,
            cidr_mask,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VpcProps {
    pub cidr: Ipv4Net,
    pub max_azs: u32,
    pub nat_gateways: u32,
    pub subnets: Vec<SubnetConfiguration>,
}

impl VpcProps {
    pub fn has_tier(&self, tier: SubnetTier) -> bool {
        self.subnets.iter().any(|s| s.tier == tier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_azs == 0 || self.max_azs > MAX_AVAILABILITY_ZONES {
            return Err(StackError::config_error(format!(
                "max_azs must be between 1 and {}, got {}",
                MAX_AVAILABILITY_ZONES, self.max_azs
            )));
        }
        if self.subnets.is_empty() {
            return Err(StackError::config_error(
                "at least one subnet configuration is required",
            ));
        }

        let mut names: Vec<&str> = self.subnets.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.subnets.len() {
            return Err(StackError::config_error("subnet configuration names must be unique"));
        }

        if self.has_tier(SubnetTier::PrivateWithEgress) {
            if !self.has_tier(SubnetTier::Public) {
                return Err(StackError::config_error(
                    "private subnets with egress need a public subnet tier to host NAT gateways",
                ));
            }
            if self.nat_gateways == 0 {
                return Err(StackError::config_error(
                    "private subnets with egress need at least one NAT gateway",
                ));
            }
        }

        Ok(())
    }
}

/// One subnet with its carved address range.
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetPlan {
    pub config_name: String,
    pub tier: SubnetTier,
    pub availability_zone: String,
    /// 1-based position within its configuration.
    pub index: usize,
    pub cidr: Ipv4Net,
}

/// Carves subnets out of the VPC range: configurations in declaration order,
/// one block per zone, each block aligned to its own size.
pub fn plan_subnets(props: &VpcProps, zones: &[String]) -> Result<Vec<SubnetPlan>> {
    let vpc = props.cidr.trunc();
    let vpc_start = u64::from(u32::from(vpc.network()));
    let vpc_end = u64::from(u32::from(vpc.broadcast()));
    let mut cursor = vpc_start;
    let mut plans = Vec::new();

    for config in &props.subnets {
        if config.cidr_mask < vpc.prefix_len()
            || config.cidr_mask < MIN_SUBNET_PREFIX
            || config.cidr_mask > MAX_SUBNET_PREFIX
        {
            return Err(StackError::config_error(format!(
                "subnet '{}' mask /{} must be between /{} and /{}",
                config.name,
                config.cidr_mask,
                vpc.prefix_len().max(MIN_SUBNET_PREFIX),
                MAX_SUBNET_PREFIX
            )));
        }

        let block = 1u64 << (32 - u32::from(config.cidr_mask));
        for (i, zone) in zones.iter().enumerate() {
            let start = cursor.div_ceil(block) * block;
            if start + block - 1 > vpc_end {
                return Err(StackError::CidrExhausted(format!(
                    "no room for /{} subnet '{}' in {} after {} subnets",
                    config.cidr_mask,
                    config.name,
                    vpc,
                    plans.len()
                )));
            }
            let network = Ipv4Addr::from(start as u32);
            let cidr = Ipv4Net::new(network, config.cidr_mask)
                .map_err(|e| StackError::config_error(e.to_string()))?;
            plans.push(SubnetPlan {
                config_name: config.name.clone(),
                tier: config.tier,
                availability_zone: zone.clone(),
                index: i + 1,
                cidr,
            });
            cursor = start + block;
        }
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<String> {
        vec!["us-east-1a".to_string(), "us-east-1b".to_string()]
    }

    fn three_tier() -> VpcProps {
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

    #[test]
    fn test_zone_count_bounds() {
        let mut props = three_tier();
        props.max_azs = MAX_AVAILABILITY_ZONES;
        assert!(props.validate().is_ok());
        props.max_azs = 8;
        assert!(matches!(props.validate(), Err(StackError::ConfigError(_))));
        props.max_azs = 0;
        assert!(props.validate().is_err());
    }

    #[test]
    fn test_three_tiers_carved_sequentially() {
        let plans = plan_subnets(&three_tier(), &zones()).unwrap();
        let cidrs: Vec<String> = plans.iter().map(|p| p.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec![
                "10.0.0.0/24",
                "10.0.1.0/24",
                "10.0.2.0/24",
                "10.0.3.0/24",
                "10.0.4.0/24",
                "10.0.5.0/24"
            ]
        );
        assert_eq!(plans[4].tier, SubnetTier::Isolated);
        assert_eq!(plans[5].index, 2);
    }

    #[test]
    fn test_mixed_masks_are_aligned() {
        let mut props = three_tier();
        props.subnets[0].cidr_mask = 26;
        let plans = plan_subnets(&props, &zones()).unwrap();
        assert_eq!(plans[0].cidr.to_string(), "10.0.0.0/26");
        assert_eq!(plans[1].cidr.to_string(), "10.0.0.64/26");
        assert_eq!(plans[2].cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_exhausted_range_is_rejected() {
        let mut props = three_tier();
        props.cidr = "10.0.0.0/22".parse().unwrap();
        let err = plan_subnets(&props, &zones()).unwrap_err();
        assert!(matches!(err, StackError::CidrExhausted(_)));
    }

    #[test]
    fn test_private_tier_requires_public_tier() {
        let mut props = three_tier();
        props.subnets.remove(0);
        assert!(props.validate().is_err());
    }
}
