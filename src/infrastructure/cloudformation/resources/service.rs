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

use super::cluster::ClusterHandle;
use super::iam::declare_service_role;
use super::security_group::{IngressRuleBuilder, SecurityGroupBuilder};
use super::vpc::VpcHandle;
use crate::domain::model::{
    CfnResource, IngressRule, LoadBalancedServiceProps, LogicalId, Peer, Port, Props, Pseudo,
    ScalingTrigger, SecurityGroupProps, SubnetTier, Token, Value,
};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{
    HEALTH_CHECK_GRACE_PERIOD, LAUNCH_TYPE_FARGATE, LISTENER_PORT, LOG_RETENTION_DAYS,
    METRIC_ECS_CPU, METRIC_ECS_MEMORY, NETWORK_MODE_AWSVPC, POLICY_ECS_TASK_EXECUTION,
    PRINCIPAL_ECS_TASKS, TYPE_APP_SCALING_POLICY, TYPE_ECS_SERVICE, TYPE_ECS_TASK_DEFINITION,
    TYPE_LISTENER, TYPE_LOAD_BALANCER, TYPE_LOG_GROUP, TYPE_SCALABLE_TARGET, TYPE_TARGET_GROUP,
};
use crate::shared::error::Result;

/// Logical ids of everything a load-balanced service declares.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancedServiceHandle {
    pub load_balancer: LogicalId,
    pub load_balancer_security_group: LogicalId,
    pub target_group: LogicalId,
    pub listener: LogicalId,
    pub task_definition: LogicalId,
    pub service: LogicalId,
    /// Group carried by the running tasks.
    pub service_security_group: LogicalId,
    pub scalable_target: Option<LogicalId>,
    pub container_port: u16,
}

impl LoadBalancedServiceHandle {
    pub fn load_balancer_dns(&self) -> Token {
        Token::get_att(&self.load_balancer, "DNSName")
    }
}

pub struct LoadBalancedServiceBuilder {
    id: String,
    props: LoadBalancedServiceProps,
    cluster: ClusterHandle,
    vpc: VpcHandle,
}

impl LoadBalancedServiceBuilder {
    pub fn new(
        id: &str,
        props: LoadBalancedServiceProps,
        cluster: &ClusterHandle,
        vpc: &VpcHandle,
    ) -> Self {
        Self {
            id: id.to_string(),
            props,
            cluster: cluster.clone(),
            vpc: vpc.clone(),
        }
    }

    pub fn build(&self, stack: &mut Stack) -> Result<LoadBalancedServiceHandle> {
        self.props.validate()?;

        let scope = LogicalId::new(&self.id);
        let (lb_tier, task_tier) = if self.props.public_load_balancer {
            (SubnetTier::Public, SubnetTier::PrivateWithEgress)
        } else {
            (SubnetTier::PrivateWithEgress, SubnetTier::PrivateWithEgress)
        };
        let lb_subnets = self.vpc.subnet_refs(lb_tier, &self.id)?;
        let task_subnets = self.vpc.subnet_refs(task_tier, &self.id)?;

        // Load balancer and its listener
        let mut lb_sg_props = SecurityGroupProps::open_outbound(&format!(
            "Automatically created Security Group for ELB {}",
            self.id
        ));
        lb_sg_props.ingress.push(IngressRule {
            peer: Peer::any_ipv4(),
            port: Port::Tcp(LISTENER_PORT),
            description: format!("Allow from anyone on port {}", LISTENER_PORT),
        });
        let lb_sg = SecurityGroupBuilder::new(
            scope.child("LBSecurityGroup").as_str(),
            &self.vpc.vpc,
            lb_sg_props,
        )
        .build(stack)?;

        let scheme = if self.props.public_load_balancer {
            "internet-facing"
        } else {
            "internal"
        };
        let load_balancer = stack.add_resource(CfnResource::new(
            scope.child("LB"),
            TYPE_LOAD_BALANCER,
            Props::new()
                .with("Type", "application")
                .with("Scheme", scheme)
                .with("Subnets", lb_subnets)
                .with("SecurityGroups", vec![Value::from(Token::get_att(&lb_sg, "GroupId"))]),
        ))?;

        let health = &self.props.health_check;
        let target_group = stack.add_resource(CfnResource::new(
            scope.child("TargetGroup"),
            TYPE_TARGET_GROUP,
            Props::new()
                .with("Port", LISTENER_PORT)
                .with("Protocol", "HTTP")
                .with("TargetType", "ip")
                .with("VpcId", self.vpc.vpc_ref())
                .with("HealthCheckPath", health.path.as_str())
                .with("HealthCheckIntervalSeconds", health.interval_seconds)
                .with("HealthyThresholdCount", health.healthy_threshold)
                .with("UnhealthyThresholdCount", health.unhealthy_threshold)
                .with(
                    "Matcher",
                    Props::new().with("HttpCode", health.healthy_http_codes.as_str()),
                ),
        ))?;

        let forward = Props::new()
            .with("Type", "forward")
            .with("TargetGroupArn", Token::reference(&target_group));
        let listener = stack.add_resource(CfnResource::new(
            scope.child("PublicListener"),
            TYPE_LISTENER,
            Props::new()
                .with("LoadBalancerArn", Token::reference(&load_balancer))
                .with("Port", LISTENER_PORT)
                .with("Protocol", "HTTP")
                .with("DefaultActions", vec![Value::from(forward)]),
        ))?;

        // Task definition
        let task_role = declare_service_role(
            stack,
            scope.child("TaskRole"),
            PRINCIPAL_ECS_TASKS,
            &[],
        )?;
        let execution_role = declare_service_role(
            stack,
            scope.child("ExecutionRole"),
            PRINCIPAL_ECS_TASKS,
            &[POLICY_ECS_TASK_EXECUTION],
        )?;
        let log_group = stack.add_resource(CfnResource::new(
            scope.child("LogGroup"),
            TYPE_LOG_GROUP,
            Props::new().with("RetentionInDays", LOG_RETENTION_DAYS),
        ))?;

        let environment: Vec<Value> = self
            .props
            .environment
            .iter()
            .map(|(name, value)| {
                Props::new()
                    .with("Name", name.as_str())
                    .with("Value", value.clone())
                    .into()
            })
            .collect();

        let log_options = Props::new()
            .with("awslogs-group", Token::reference(&log_group))
            .with("awslogs-stream-prefix", self.id.as_str())
            .with("awslogs-region", Token::Pseudo(Pseudo::Region));
        let container = Props::new()
            .with("Name", self.props.container_name.as_str())
            .with("Image", self.props.image.as_str())
            .with("Essential", true)
            .with(
                "PortMappings",
                vec![Value::from(
                    Props::new()
                        .with("ContainerPort", self.props.container_port)
                        .with("Protocol", "tcp"),
                )],
            )
            .with("Environment", environment)
            .with(
                "LogConfiguration",
                Props::new()
                    .with("LogDriver", "awslogs")
                    .with("Options", log_options),
            );

        let task_definition = stack.add_resource(CfnResource::new(
            scope.child("TaskDef"),
            TYPE_ECS_TASK_DEFINITION,
            Props::new()
                .with("Family", self.id.as_str())
                .with("Cpu", self.props.cpu.to_string())
                .with("Memory", self.props.memory_mib.to_string())
                .with("NetworkMode", NETWORK_MODE_AWSVPC)
                .with("RequiresCompatibilities", vec![Value::from(LAUNCH_TYPE_FARGATE)])
                .with("TaskRoleArn", Token::get_att(&task_role, "Arn"))
                .with("ExecutionRoleArn", Token::get_att(&execution_role, "Arn"))
                .with("ContainerDefinitions", vec![Value::from(container)]),
        ))?;

        // Service and the group its tasks carry
        let service_sg = SecurityGroupBuilder::new(
            scope.child("ServiceSecurityGroup").as_str(),
            &self.vpc.vpc,
            SecurityGroupProps::open_outbound(&format!("{}/Service/SecurityGroup", self.id)),
        )
        .build(stack)?;
        IngressRuleBuilder::between(
            &service_sg,
            &lb_sg,
            Port::Tcp(self.props.container_port),
            "Load balancer to target",
        )
        .build(stack)?;

        let network = Props::new().with(
            "AwsvpcConfiguration",
            Props::new()
                .with("AssignPublicIp", "DISABLED")
                .with("Subnets", task_subnets)
                .with(
                    "SecurityGroups",
                    vec![Value::from(Token::get_att(&service_sg, "GroupId"))],
                ),
        );
        let lb_binding = Props::new()
            .with("ContainerName", self.props.container_name.as_str())
            .with("ContainerPort", self.props.container_port)
            .with("TargetGroupArn", Token::reference(&target_group));

        let service = stack.add_resource(
            CfnResource::new(
                scope.child("Service"),
                TYPE_ECS_SERVICE,
                Props::new()
                    .with("Cluster", self.cluster.name_ref())
                    .with("DesiredCount", self.props.desired_count)
                    .with("LaunchType", LAUNCH_TYPE_FARGATE)
                    .with("TaskDefinition", Token::reference(&task_definition))
                    .with("HealthCheckGracePeriodSeconds", HEALTH_CHECK_GRACE_PERIOD)
                    .with("LoadBalancers", vec![Value::from(lb_binding)])
                    .with("NetworkConfiguration", network),
            )
            .depends_on(&listener),
        )?;

        let scalable_target = match &self.props.scaling {
            Some(scaling) => Some(self.declare_task_scaling(
                stack,
                &scope,
                &service,
                scaling.min_capacity,
                scaling.max_capacity,
                &scaling.triggers,
            )?),
            None => None,
        };

        tracing::debug!(
            service = %service,
            desired = self.props.desired_count,
            "load-balanced service declared"
        );

        Ok(LoadBalancedServiceHandle {
            load_balancer,
            load_balancer_security_group: lb_sg,
            target_group,
            listener,
            task_definition,
            service,
            service_security_group: service_sg,
            scalable_target,
            container_port: self.props.container_port,
        })
    }

    fn declare_task_scaling(
        &self,
        stack: &mut Stack,
        scope: &LogicalId,
        service: &LogicalId,
        min: u32,
        max: u32,
        triggers: &[ScalingTrigger],
    ) -> Result<LogicalId> {
        let resource_id = Token::join(
            "/",
            vec![
                "service".into(),
                self.cluster.name_ref(),
                Token::get_att(service, "Name").into(),
            ],
        );
        let target = stack.add_resource(CfnResource::new(
            scope.child("TaskCountTarget"),
            TYPE_SCALABLE_TARGET,
            Props::new()
                .with("MinCapacity", min)
                .with("MaxCapacity", max)
                .with("ResourceId", resource_id)
                .with("ScalableDimension", "ecs:service:DesiredCount")
                .with("ServiceNamespace", "ecs"),
        ))?;

        for trigger in triggers {
            let metric = match trigger {
                ScalingTrigger::Cpu { .. } => METRIC_ECS_CPU,
                ScalingTrigger::Memory { .. } => METRIC_ECS_MEMORY,
            };
            let policy_id = scope.child(&format!("TaskCountTarget{}Scaling", trigger.name()));
            let config = Props::new()
                .with(
                    "PredefinedMetricSpecification",
                    Props::new().with("PredefinedMetricType", metric),
                )
                .with("TargetValue", i64::from(trigger.target_percent()));
            stack.add_resource(CfnResource::new(
                policy_id.clone(),
                TYPE_APP_SCALING_POLICY,
                Props::new()
                    .with("PolicyName", policy_id.as_str())
                    .with("PolicyType", "TargetTrackingScaling")
                    .with("ScalingTargetId", Token::reference(&target))
                    .with("TargetTrackingScalingPolicyConfiguration", config),
            ))?;
        }

        Ok(target)
    }
}
