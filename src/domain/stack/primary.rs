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

//! Primary application stack: network, cluster, database, public service,
//! compute pools and a secondary cluster with fixed pools.

use super::{App, Environment, Stack};
use crate::domain::config::{PoolConf, PrimaryStackConf};
use crate::domain::model::{
    CfnOutput, ClusterProps, HealthCheck, LoadBalancedServiceProps, LogicalId, MachineImage,
    Port, ScalingTrigger, SecurityGroupProps, TaskScaling, Value,
};
use crate::infrastructure::cloudformation::resources::{
    AutoScalingGroupBuilder, AutoScalingGroupHandle, ClusterBuilder, ClusterHandle,
    DatabaseBuilder, DatabaseHandle, IngressRuleBuilder, LoadBalancedServiceBuilder,
    LoadBalancedServiceHandle, SecurityGroupBuilder, VpcBuilder, VpcHandle,
};
use crate::shared::error::Result;
use std::collections::BTreeMap;

/// Handles into the declared primary stack.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryStack {
    pub stack_name: String,
    pub vpc: VpcHandle,
    pub cluster: ClusterHandle,
    pub database_security_group: LogicalId,
    pub database: DatabaseHandle,
    pub service: LoadBalancedServiceHandle,
    /// Standalone rule letting the service tasks reach the database port.
    pub database_ingress: LogicalId,
    pub pools: Vec<AutoScalingGroupHandle>,
    pub secondary_cluster: ClusterHandle,
    pub secondary_pools: Vec<AutoScalingGroupHandle>,
}

fn build_pools(
    stack: &mut Stack,
    pools: &[PoolConf],
    image: MachineImage,
    vpc: &VpcHandle,
    cluster: Option<&ClusterHandle>,
) -> Result<Vec<AutoScalingGroupHandle>> {
    let mut handles = Vec::with_capacity(pools.len());
    for pool in pools {
        let props = pool.to_props(image)?;
        if props.instance_type.is_previous_generation() {
            tracing::debug!(
                pool = %pool.name,
                instance_type = %props.instance_type.as_str(),
                "pool uses a previous-generation instance type"
            );
        }
        let mut builder = AutoScalingGroupBuilder::new(&pool.name, props, vpc);
        if let Some(cluster) = cluster {
            builder = builder.join_cluster(cluster);
        }
        handles.push(builder.build(stack)?);
    }
    Ok(handles)
}

pub fn build_primary_stack(app: &mut App, conf: &PrimaryStackConf) -> Result<PrimaryStack> {
    let env = Environment::new(conf.account.clone(), conf.region.as_str());
    let mut stack = Stack::new(&conf.stack_name, env)?.with_description(conf.description.as_str());

    let vpc = VpcBuilder::new("Vpc", conf.network.to_props()).build(&mut stack)?;

    let cluster = ClusterBuilder::new(
        "Cluster",
        ClusterProps {
            cluster_name: Some(conf.cluster_name.clone()),
            container_insights: conf.container_insights,
        },
    )
    .build(&mut stack)?;

    let database_security_group = SecurityGroupBuilder::new(
        "DatabaseSecurityGroup",
        &vpc.vpc,
        SecurityGroupProps::restricted("Database access, granted per rule"),
    )
    .build(&mut stack)?;

    let database = DatabaseBuilder::new(
        "Database",
        conf.database.to_props()?,
        &vpc,
        vec![database_security_group.clone()],
    )
    .build(&mut stack)?;

    let service_conf = &conf.service;
    let environment = BTreeMap::from([
        ("DB_HOST".to_string(), Value::from(database.endpoint_address())),
        ("DB_PORT".to_string(), Value::from(database.endpoint_port())),
    ]);
    let service = LoadBalancedServiceBuilder::new(
        "Service",
        LoadBalancedServiceProps {
            image: service_conf.image.clone(),
            container_name: "web".to_string(),
            container_port: service_conf.container_port,
            cpu: service_conf.cpu,
            memory_mib: service_conf.memory_mib,
            desired_count: service_conf.desired_count,
            public_load_balancer: true,
            environment,
            health_check: HealthCheck {
                path: service_conf.health_check_path.clone(),
                healthy_http_codes: service_conf.healthy_http_codes.clone(),
                ..HealthCheck::default()
            },
            scaling: Some(TaskScaling {
                min_capacity: service_conf.min_capacity,
                max_capacity: service_conf.max_capacity,
                triggers: vec![
                    ScalingTrigger::Cpu {
                        target_percent: service_conf.cpu_target_percent,
                    },
                    ScalingTrigger::Memory {
                        target_percent: service_conf.memory_target_percent,
                    },
                ],
            }),
        },
        &cluster,
        &vpc,
    )
    .build(&mut stack)?;

    // The only way into the database
    let database_ingress = IngressRuleBuilder::between(
        &database_security_group,
        &service.service_security_group,
        Port::Tcp(database.port),
        "Allow the load-balanced service to reach the database",
    )
    .build(&mut stack)?;

    let pools = build_pools(&mut stack, &conf.pools, MachineImage::AmazonLinux2, &vpc, None)?;

    let secondary_cluster = ClusterBuilder::new(
        "SecondaryCluster",
        ClusterProps {
            cluster_name: Some(conf.secondary_cluster.cluster_name.clone()),
            container_insights: false,
        },
    )
    .build(&mut stack)?;
    let secondary_pools = build_pools(
        &mut stack,
        &conf.secondary_cluster.pools,
        MachineImage::EcsOptimizedAmazonLinux2,
        &vpc,
        Some(&secondary_cluster),
    )?;

    stack.add_output(
        CfnOutput::new("LoadBalancerDns", service.load_balancer_dns())
            .description("Public DNS name of the load balancer"),
    )?;
    stack.add_output(
        CfnOutput::new("VpcId", vpc.vpc_ref())
            .description("Network ID")
            .export(format!("{}-VpcId", conf.stack_name)),
    )?;
    stack.add_output(
        CfnOutput::new("DatabaseEndpoint", database.endpoint_address())
            .description("Database endpoint address"),
    )?;
    let web_pool = conf
        .pools
        .iter()
        .position(|p| p.role == "web")
        .and_then(|i| pools.get(i))
        .or_else(|| pools.first());
    if let Some(web_pool) = web_pool {
        stack.add_output(
            CfnOutput::new("WebTierAsgName", web_pool.name_ref())
                .description("Name of the web tier auto scaling group"),
        )?;
    }
    stack.add_output(
        CfnOutput::new("SecondaryClusterName", secondary_cluster.name_ref())
            .description("Name of the secondary container cluster"),
    )?;

    let handle = PrimaryStack {
        stack_name: conf.stack_name.clone(),
        vpc,
        cluster,
        database_security_group,
        database,
        service,
        database_ingress,
        pools,
        secondary_cluster,
        secondary_pools,
    };
    app.add_stack(stack)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SubnetTier;
    use crate::infrastructure::constants::{TYPE_AUTO_SCALING_GROUP, TYPE_ECS_CLUSTER};

    fn build() -> (App, PrimaryStack) {
        let mut app = App::new();
        let handle = build_primary_stack(&mut app, &PrimaryStackConf::default()).unwrap();
        (app, handle)
    }

    #[test]
    fn test_declares_every_component() {
        let (app, handle) = build();
        let stack = app.stack(&handle.stack_name).unwrap();

        assert_eq!(handle.vpc.subnets.len(), 6);
        assert_eq!(handle.pools.len(), 4);
        assert_eq!(handle.secondary_pools.len(), 2);
        assert_eq!(stack.resources_of_type(TYPE_ECS_CLUSTER).count(), 2);
        assert_eq!(stack.resources_of_type(TYPE_AUTO_SCALING_GROUP).count(), 6);

        let outputs: Vec<&str> = stack.outputs().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            outputs,
            vec![
                "LoadBalancerDns",
                "VpcId",
                "DatabaseEndpoint",
                "WebTierAsgName",
                "SecondaryClusterName"
            ]
        );
        assert_eq!(
            stack.output("VpcId").and_then(|o| o.export_name.as_deref()),
            Some("PrimaryApplicationStack-VpcId")
        );
    }

    #[test]
    fn test_service_environment_points_at_database() {
        let (app, handle) = build();
        let stack = app.stack(&handle.stack_name).unwrap();
        let task = stack.resource(&handle.service.task_definition).unwrap();
        assert!(task.referenced_ids().contains(&&handle.database.instance));
    }

    #[test]
    fn test_database_in_isolated_subnets() {
        let (app, handle) = build();
        let stack = app.stack(&handle.stack_name).unwrap();
        let group = stack.resource(&handle.database.subnet_group).unwrap();
        let isolated: Vec<&LogicalId> = handle
            .vpc
            .subnets_in(SubnetTier::Isolated)
            .map(|s| &s.subnet)
            .collect();
        let referenced = group.referenced_ids();
        assert_eq!(referenced, isolated);
    }

    #[test]
    fn test_secondary_pools_are_fixed() {
        let (app, handle) = build();
        let stack = app.stack(&handle.stack_name).unwrap();
        for pool in &handle.secondary_pools {
            let group = stack.resource(&pool.group).unwrap();
            let min = group.property("MinSize").and_then(|v| v.as_int());
            let max = group.property("MaxSize").and_then(|v| v.as_int());
            assert_eq!(min, max);
            assert!(pool.scaling_policies.is_empty());
        }
    }
}
