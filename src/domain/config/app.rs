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

//! Declared values of both stacks, loadable from TOML

use crate::domain::model::{
    AutoScalingGroupProps, CapacityBounds, DatabaseEngine, DatabaseInstanceProps, InstanceType,
    MachineImage, RemovalPolicy, ScalingTrigger, StorageBounds, SubnetConfiguration, SubnetTier,
    VpcProps,
};
use crate::shared::error::{Result, StackError};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

// ============================================================================
// Application
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConf {
    pub primary: PrimaryStackConf,
    pub regional_database: RegionalDatabaseConf,
}

impl AppConf {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            StackError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Tables in `content` are merged over the defaults key by key, so a
    /// partial `[regional_database.network]` keeps the regional values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let overrides: toml::Table = toml::from_str(content)?;
        let mut merged = match toml::Value::try_from(Self::default()) {
            Ok(toml::Value::Table(table)) => table,
            Ok(_) => toml::Table::new(),
            Err(e) => {
                return Err(StackError::config_error(format!(
                    "Failed to encode default configuration: {}",
                    e
                )))
            }
        };
        merge_tables(&mut merged, overrides);
        Ok(toml::Value::Table(merged).try_into()?)
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, toml::Value::Table(incoming));
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

// ============================================================================
// Shared pieces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConf {
    pub cidr: Ipv4Net,
    pub max_azs: u32,
    pub nat_gateways: u32,
    pub subnets: Vec<SubnetConf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetConf {
    pub name: String,
    pub tier: SubnetTier,
    #[serde(default = "default_cidr_mask")]
    pub cidr_mask: u8,
}

fn default_cidr_mask() -> u8 {
    24
}

impl NetworkConf {
    pub fn to_props(&self) -> VpcProps {
        VpcProps {
            cidr: self.cidr,
            max_azs: self.max_azs,
            nat_gateways: self.nat_gateways,
            subnets: self
                .subnets
                .iter()
                .map(|s| SubnetConfiguration::new(&s.name, s.tier, s.cidr_mask))
                .collect(),
        }
    }
}

impl SubnetConf {
    fn new(name: &str, tier: SubnetTier) -> Self {
        Self {
            name: name.to_string(),
            tier,
            cidr_mask: default_cidr_mask(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConf {
    /// `postgres`, `mysql` or `sqlserver-se`
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub max_allocated_storage: u32,
    pub multi_az: bool,
    pub deletion_protection: bool,
    pub removal_policy: RemovalPolicy,
    pub backup_retention_days: u32,
}

impl DatabaseConf {
    /// Instance props for the isolated tier.
    pub fn to_props(&self) -> Result<DatabaseInstanceProps> {
        Ok(DatabaseInstanceProps {
            engine: DatabaseEngine::from_name(&self.engine, &self.engine_version)?,
            instance_class: self.instance_class.clone(),
            storage: StorageBounds::new(self.allocated_storage, self.max_allocated_storage)?,
            subnet_tier: SubnetTier::Isolated,
            multi_az: self.multi_az,
            deletion_protection: self.deletion_protection,
            removal_policy: self.removal_policy,
            backup_retention_days: self.backup_retention_days,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConf {
    pub name: String,
    pub role: String,
    pub instance_type: String,
    pub min: u32,
    pub desired: u32,
    pub max: u32,
    /// `cpu` or `memory`; fixed pools leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_on: Option<String>,
    #[serde(default = "default_target_percent")]
    pub target_percent: u8,
}

fn default_target_percent() -> u8 {
    70
}

impl PoolConf {
    fn scaled(name: &str, role: &str, instance_type: &str, bounds: (u32, u32, u32), on: &str) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
            instance_type: instance_type.to_string(),
            min: bounds.0,
            desired: bounds.1,
            max: bounds.2,
            scale_on: Some(on.to_string()),
            target_percent: default_target_percent(),
        }
    }

    pub fn trigger(&self) -> Result<Option<ScalingTrigger>> {
        let target_percent = self.target_percent;
        match self.scale_on.as_deref() {
            None => Ok(None),
            Some("cpu") => Ok(Some(ScalingTrigger::Cpu { target_percent })),
            Some("memory") => Ok(Some(ScalingTrigger::Memory { target_percent })),
            Some(other) => Err(StackError::config_error(format!(
                "Invalid scale_on '{}' for pool {}: expected cpu or memory",
                other, self.name
            ))),
        }
    }

    /// Pool props placed in the private tier.
    pub fn to_props(&self, machine_image: MachineImage) -> Result<AutoScalingGroupProps> {
        Ok(AutoScalingGroupProps {
            role: self.role.clone(),
            instance_type: InstanceType::new(&self.instance_type)?,
            machine_image,
            capacity: CapacityBounds::new(self.min, self.desired, self.max)?,
            subnet_tier: SubnetTier::PrivateWithEgress,
            triggers: self.trigger()?.into_iter().collect(),
        })
    }

    fn fixed(name: &str, role: &str, instance_type: &str, count: u32) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
            instance_type: instance_type.to_string(),
            min: count,
            desired: count,
            max: count,
            scale_on: None,
            target_percent: default_target_percent(),
        }
    }
}

// ============================================================================
// Primary application stack
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryStackConf {
    pub stack_name: String,
    pub description: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub network: NetworkConf,
    pub cluster_name: String,
    pub container_insights: bool,
    pub database: DatabaseConf,
    pub service: ServiceConf,
    pub pools: Vec<PoolConf>,
    pub secondary_cluster: SecondaryClusterConf,
}

impl Default for PrimaryStackConf {
    fn default() -> Self {
        Self {
            stack_name: "PrimaryApplicationStack".to_string(),
            description: "Demo application: network, container service, database and compute pools"
                .to_string(),
            region: "us-east-1".to_string(),
            account: None,
            network: NetworkConf {
                cidr: Ipv4Net::new(std::net::Ipv4Addr::new(10, 0, 0, 0), 16)
                    .unwrap_or_default(),
                max_azs: 2,
                nat_gateways: 1,
                subnets: vec![
                    SubnetConf::new("Public", SubnetTier::Public),
                    SubnetConf::new("Application", SubnetTier::PrivateWithEgress),
                    SubnetConf::new("Database", SubnetTier::Isolated),
                ],
            },
            cluster_name: "DemoCluster".to_string(),
            container_insights: true,
            database: DatabaseConf::default(),
            service: ServiceConf::default(),
            pools: vec![
                PoolConf::scaled("WebTier", "web", "t2.medium", (2, 2, 8), "cpu"),
                PoolConf::scaled("AppTier", "application", "m4.large", (2, 4, 12), "cpu"),
                PoolConf::scaled("WorkerTier", "worker", "c4.xlarge", (1, 3, 10), "cpu"),
                PoolConf::scaled("MemoryTier", "memory", "r4.large", (1, 2, 6), "memory"),
            ],
            secondary_cluster: SecondaryClusterConf::default(),
        }
    }
}

impl Default for NetworkConf {
    fn default() -> Self {
        PrimaryStackConf::default().network
    }
}

impl Default for DatabaseConf {
    fn default() -> Self {
        Self {
            engine: "postgres".to_string(),
            engine_version: "15.4".to_string(),
            instance_class: "db.t3.micro".to_string(),
            allocated_storage: 20,
            max_allocated_storage: 100,
            multi_az: false,
            deletion_protection: false,
            removal_policy: RemovalPolicy::Delete,
            backup_retention_days: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConf {
    pub image: String,
    pub container_port: u16,
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub cpu_target_percent: u8,
    pub memory_target_percent: u8,
    pub health_check_path: String,
    pub healthy_http_codes: String,
}

impl Default for ServiceConf {
    fn default() -> Self {
        Self {
            image: "amazon/amazon-ecs-sample".to_string(),
            container_port: 80,
            cpu: 256,
            memory_mib: 512,
            desired_count: 2,
            min_capacity: 2,
            max_capacity: 10,
            cpu_target_percent: 70,
            memory_target_percent: 70,
            health_check_path: "/".to_string(),
            healthy_http_codes: "200".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryClusterConf {
    pub cluster_name: String,
    pub pools: Vec<PoolConf>,
}

impl Default for SecondaryClusterConf {
    fn default() -> Self {
        Self {
            cluster_name: "demo-secondary-cluster".to_string(),
            pools: vec![
                PoolConf::fixed("SecondaryM4", "secondary", "m4.large", 2),
                PoolConf::fixed("SecondaryC4", "secondary", "c4.large", 1),
            ],
        }
    }
}

// ============================================================================
// Regional database stack
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalDatabaseConf {
    pub stack_name: String,
    pub description: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub network: NetworkConf,
    pub database: DatabaseConf,
}

impl Default for RegionalDatabaseConf {
    fn default() -> Self {
        Self {
            stack_name: "RegionalDatabaseStack".to_string(),
            description: "Multi-AZ SQL Server database in an isolated network (Bahrain)".to_string(),
            region: "me-south-1".to_string(),
            account: None,
            network: NetworkConf {
                cidr: Ipv4Net::new(std::net::Ipv4Addr::new(10, 20, 0, 0), 16)
                    .unwrap_or_default(),
                max_azs: 2,
                nat_gateways: 0,
                subnets: vec![SubnetConf::new("Database", SubnetTier::Isolated)],
            },
            database: DatabaseConf {
                engine: "sqlserver-se".to_string(),
                engine_version: "15.00".to_string(),
                instance_class: "db.m5.2xlarge".to_string(),
                allocated_storage: 200,
                max_allocated_storage: 1000,
                multi_az: true,
                deletion_protection: false,
                removal_policy: RemovalPolicy::Delete,
                backup_retention_days: 7,
            },
        }
    }
}
