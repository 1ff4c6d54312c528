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
use super::security_group::SecurityGroupBuilder;
use super::vpc::VpcHandle;
use crate::domain::model::{
    AutoScalingGroupProps, CfnParameter, CfnResource, LogicalId, Props, ScalingTrigger,
    SecurityGroupProps, Token, Value,
};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{
    AGENT_CONFIG_PATH, METRIC_AGENT_MEMORY, METRIC_AGENT_NAMESPACE, METRIC_ASG_CPU,
    POLICY_CLOUDWATCH_AGENT, POLICY_ECS_FOR_EC2, POLICY_SSM_MANAGED_INSTANCE, PRINCIPAL_EC2, SSM_IMAGE_PARAMETER_TYPE, TAG_NAME, TAG_ROLE,
    TYPE_ASG_SCALING_POLICY, TYPE_AUTO_SCALING_GROUP, TYPE_INSTANCE_PROFILE,
    TYPE_LAUNCH_TEMPLATE,
};
use crate::shared::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct AutoScalingGroupHandle {
    pub group: LogicalId,
    pub launch_template: LogicalId,
    pub security_group: LogicalId,
    pub role: LogicalId,
    pub instance_profile: LogicalId,
    pub scaling_policies: Vec<LogicalId>,
}

impl AutoScalingGroupHandle {
    pub fn name_ref(&self) -> Value {
        Token::reference(&self.group).into()
    }
}

pub struct AutoScalingGroupBuilder {
    id: String,
    props: AutoScalingGroupProps,
    vpc: VpcHandle,
    cluster: Option<ClusterHandle>,
}

impl AutoScalingGroupBuilder {
    pub fn new(id: &str, props: AutoScalingGroupProps, vpc: &VpcHandle) -> Self {
        Self {
            id: id.to_string(),
            props,
            vpc: vpc.clone(),
            cluster: None,
        }
    }

    /// Instances register with `cluster` through their boot script.
    pub fn join_cluster(mut self, cluster: &ClusterHandle) -> Self {
        self.cluster = Some(cluster.clone());
        self
    }

    pub fn build(&self, stack: &mut Stack) -> Result<AutoScalingGroupHandle> {
        for trigger in &self.props.triggers {
            trigger.validate()?;
        }
        let subnets = self.vpc.subnet_refs(self.props.subnet_tier, &self.id)?;
        let scope = LogicalId::new(&self.id);

        let image = self.props.machine_image;
        let image_parameter = stack.add_parameter(CfnParameter {
            name: image.parameter_name().to_string(),
            parameter_type: SSM_IMAGE_PARAMETER_TYPE.to_string(),
            default: Some(image.parameter_path().to_string()),
            description: None,
        })?;

        let security_group = SecurityGroupBuilder::new(
            scope.child("InstanceSecurityGroup").as_str(),
            &self.vpc.vpc,
            SecurityGroupProps::open_outbound(&format!("{}/InstanceSecurityGroup", self.id)),
        )
        .build(stack)?;

        let mut policies = vec![POLICY_SSM_MANAGED_INSTANCE];
        if self.cluster.is_some() {
            policies.push(POLICY_ECS_FOR_EC2);
        }
        if self.publishes_memory() {
            policies.push(POLICY_CLOUDWATCH_AGENT);
        }
        let role = declare_service_role(stack, scope.child("InstanceRole"), PRINCIPAL_EC2, &policies)?;
        let instance_profile = stack.add_resource(CfnResource::new(
            scope.child("InstanceProfile"),
            TYPE_INSTANCE_PROFILE,
            Props::new().with("Roles", vec![Value::from(Token::reference(&role))]),
        ))?;

        let mut data = Props::new()
            .with("ImageId", Token::Parameter(image_parameter))
            .with("InstanceType", self.props.instance_type.as_str())
            .with(
                "IamInstanceProfile",
                Props::new().with("Arn", Token::get_att(&instance_profile, "Arn")),
            )
            .with(
                "SecurityGroupIds",
                vec![Value::from(Token::get_att(&security_group, "GroupId"))],
            );
        if let Some(user_data) = self.user_data() {
            data.insert("UserData", user_data);
        }

        let launch_template = stack.add_resource(
            CfnResource::new(
                scope.child("LaunchTemplate"),
                TYPE_LAUNCH_TEMPLATE,
                Props::new().with("LaunchTemplateData", data),
            )
            .depends_on(&role),
        )?;

        let capacity = self.props.capacity;
        let tag_list: Vec<Value> = [(TAG_NAME, self.id.as_str()), (TAG_ROLE, self.props.role.as_str())]
            .iter()
            .map(|(key, value)| {
                Props::new()
                    .with("Key", *key)
                    .with("Value", *value)
                    .with("PropagateAtLaunch", true)
                    .into()
            })
            .collect();

        let group = stack.add_resource(CfnResource::new(
            scope.child("ASG"),
            TYPE_AUTO_SCALING_GROUP,
            Props::new()
                .with("MinSize", capacity.min().to_string())
                .with("MaxSize", capacity.max().to_string())
                .with("DesiredCapacity", capacity.desired().to_string())
                .with(
                    "LaunchTemplate",
                    Props::new()
                        .with("LaunchTemplateId", Token::reference(&launch_template))
                        .with(
                            "Version",
                            Token::get_att(&launch_template, "LatestVersionNumber"),
                        ),
                )
                .with("VPCZoneIdentifier", subnets)
                .with("Tags", tag_list),
        ))?;

        let mut scaling_policies = Vec::new();
        for trigger in &self.props.triggers {
            let policy = stack.add_resource(CfnResource::new(
                scope.child(&format!("ScalingPolicy{}", trigger.name())),
                TYPE_ASG_SCALING_POLICY,
                Props::new()
                    .with("AutoScalingGroupName", Token::reference(&group))
                    .with("PolicyType", "TargetTrackingScaling")
                    .with(
                        "TargetTrackingConfiguration",
                        tracking_configuration(trigger, &group),
                    ),
            ))?;
            scaling_policies.push(policy);
        }

        tracing::debug!(
            group = %group,
            instance_type = %self.props.instance_type.as_str(),
            min = capacity.min(),
            desired = capacity.desired(),
            max = capacity.max(),
            "auto scaling group declared"
        );

        Ok(AutoScalingGroupHandle {
            group,
            launch_template,
            security_group,
            role,
            instance_profile,
            scaling_policies,
        })
    }
}

impl AutoScalingGroupBuilder {
    fn publishes_memory(&self) -> bool {
        self.props
            .triggers
            .iter()
            .any(|t| matches!(t, ScalingTrigger::Memory { .. }))
    }

    /// Boot script: cluster registration and the memory metrics agent, as
    /// needed. `None` when neither applies.
    fn user_data(&self) -> Option<Value> {
        let mut parts: Vec<Value> = vec!["#!/bin/bash\n".into()];
        if let Some(cluster) = &self.cluster {
            parts.push("echo ECS_CLUSTER=".into());
            parts.push(cluster.name_ref());
            parts.push(" >> /etc/ecs/ecs.config\n".into());
        }
        if self.publishes_memory() {
            parts.push(memory_agent_script().into());
        }
        if parts.len() == 1 {
            return None;
        }
        Some(Token::Base64(Box::new(Token::join("", parts).into())).into())
    }
}

/// Installs the CloudWatch agent and publishes memory usage per group.
fn memory_agent_script() -> String {
    let config = format!(
        concat!(
            r#"{{"metrics":{{"namespace":"{namespace}","#,
            r#""append_dimensions":{{"AutoScalingGroupName":"${{aws:AutoScalingGroupName}}"}},"#,
            r#""aggregation_dimensions":[["AutoScalingGroupName"]],"#,
            r#""metrics_collected":{{"mem":{{"measurement":["{metric}"]}}}}}}}}"#
        ),
        namespace = METRIC_AGENT_NAMESPACE,
        metric = METRIC_AGENT_MEMORY,
    );
    format!(
        "yum install -y amazon-cloudwatch-agent\n\
         cat > {path} <<'CONF'\n{config}\nCONF\n\
         /opt/aws/amazon-cloudwatch-agent/bin/amazon-cloudwatch-agent-ctl \
         -a fetch-config -m ec2 -s -c file:{path}\n",
        path = AGENT_CONFIG_PATH,
        config = config,
    )
}

/// CPU has a predefined metric; memory comes from the instance agent and
/// is published per group.
fn tracking_configuration(trigger: &ScalingTrigger, group: &LogicalId) -> Props {
    let target = i64::from(trigger.target_percent());
    match trigger {
        ScalingTrigger::Cpu { .. } => Props::new()
            .with(
                "PredefinedMetricSpecification",
                Props::new().with("PredefinedMetricType", METRIC_ASG_CPU),
            )
            .with("TargetValue", target),
        ScalingTrigger::Memory { .. } => Props::new()
            .with(
                "CustomizedMetricSpecification",
                Props::new()
                    .with("MetricName", METRIC_AGENT_MEMORY)
                    .with("Namespace", METRIC_AGENT_NAMESPACE)
                    .with("Statistic", "Average")
                    .with(
                        "Dimensions",
                        vec![Value::from(
                            Props::new()
                                .with("Name", "AutoScalingGroupName")
                                .with("Value", Token::reference(group)),
                        )],
                    ),
            )
            .with("TargetValue", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        CapacityBounds, ClusterProps, InstanceType, MachineImage, SubnetConfiguration,
        SubnetTier, VpcProps,
    };
    use crate::domain::stack::Environment;
    use crate::infrastructure::cloudformation::resources::{ClusterBuilder, VpcBuilder};

    fn setup() -> (Stack, VpcHandle) {
        let mut stack = Stack::new("Asg", Environment::new(None, "us-east-1")).unwrap();
        let vpc = VpcBuilder::new(
            "Vpc",
            VpcProps {
                cidr: "10.0.0.0/16".parse().unwrap(),
                max_azs: 2,
                nat_gateways: 1,
                subnets: vec![
                    SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                    SubnetConfiguration::new("Application", SubnetTier::PrivateWithEgress, 24),
                ],
            },
        )
        .build(&mut stack)
        .unwrap();
        (stack, vpc)
    }

    fn props(role: &str, triggers: Vec<ScalingTrigger>) -> AutoScalingGroupProps {
        AutoScalingGroupProps {
            role: role.to_string(),
            instance_type: InstanceType::new("t2.medium").unwrap(),
            machine_image: MachineImage::AmazonLinux2,
            capacity: CapacityBounds::new(2, 2, 8).unwrap(),
            subnet_tier: SubnetTier::PrivateWithEgress,
            triggers,
        }
    }

    #[test]
    fn test_group_capacity_and_policy() {
        let (mut stack, vpc) = setup();
        let handle = AutoScalingGroupBuilder::new(
            "WebTier",
            props("web", vec![ScalingTrigger::Cpu { target_percent: 70 }]),
            &vpc,
        )
        .build(&mut stack)
        .unwrap();

        let group = stack.resource(&handle.group).unwrap();
        assert_eq!(group.property("MinSize").and_then(|v| v.as_int()), Some(2));
        assert_eq!(group.property("DesiredCapacity").and_then(|v| v.as_int()), Some(2));
        assert_eq!(group.property("MaxSize").and_then(|v| v.as_int()), Some(8));
        assert_eq!(handle.scaling_policies.len(), 1);
        assert_eq!(stack.parameters().len(), 1);

        let template = stack.resource(&handle.launch_template).unwrap();
        assert!(template
            .property("LaunchTemplateData")
            .and_then(|d| d.get("UserData"))
            .is_none());
    }

    #[test]
    fn test_memory_trigger_uses_agent_metric() {
        let (mut stack, vpc) = setup();
        let handle = AutoScalingGroupBuilder::new(
            "MemoryTier",
            props("memory", vec![ScalingTrigger::Memory { target_percent: 70 }]),
            &vpc,
        )
        .build(&mut stack)
        .unwrap();

        let policy = stack.resource(&handle.scaling_policies[0]).unwrap();
        let metric = policy
            .property("TargetTrackingConfiguration")
            .and_then(|c| c.get("CustomizedMetricSpecification"))
            .unwrap();
        assert_eq!(metric.get("Namespace").and_then(|v| v.as_str()), Some("CWAgent"));
        assert_eq!(metric.get("MetricName").and_then(|v| v.as_str()), Some("mem_used_percent"));

        let dimension = metric
            .get("Dimensions")
            .and_then(|d| d.as_list())
            .and_then(|d| d.first())
            .unwrap();
        assert_eq!(
            dimension.get("Name").and_then(|v| v.as_str()),
            Some("AutoScalingGroupName")
        );
        assert_eq!(
            dimension.get("Value").and_then(|v| v.as_token()),
            Some(&Token::reference(&handle.group))
        );
        assert!(policy.referenced_ids().contains(&&handle.group));
    }

    #[test]
    fn test_memory_pool_runs_metrics_agent() {
        let (mut stack, vpc) = setup();
        let handle = AutoScalingGroupBuilder::new(
            "MemoryTier",
            props("memory", vec![ScalingTrigger::Memory { target_percent: 70 }]),
            &vpc,
        )
        .build(&mut stack)
        .unwrap();

        let role = stack.resource(&handle.role).unwrap();
        let policies = format!("{:?}", role.property("ManagedPolicyArns"));
        assert!(policies.contains("CloudWatchAgentServerPolicy"));

        let template = stack.resource(&handle.launch_template).unwrap();
        let user_data = format!(
            "{:?}",
            template
                .property("LaunchTemplateData")
                .and_then(|d| d.get("UserData"))
                .unwrap()
        );
        assert!(user_data.contains("amazon-cloudwatch-agent-ctl"));
        assert!(user_data.contains("mem_used_percent"));
    }

    #[test]
    fn test_cpu_pool_has_no_agent_policy() {
        let (mut stack, vpc) = setup();
        let handle = AutoScalingGroupBuilder::new(
            "WebTier",
            props("web", vec![ScalingTrigger::Cpu { target_percent: 70 }]),
            &vpc,
        )
        .build(&mut stack)
        .unwrap();
        let role = stack.resource(&handle.role).unwrap();
        let policies = format!("{:?}", role.property("ManagedPolicyArns"));
        assert!(!policies.contains("CloudWatchAgentServerPolicy"));
    }

    #[test]
    fn test_cluster_member_gets_join_script() {
        let (mut stack, vpc) = setup();
        let cluster = ClusterBuilder::new("Secondary", ClusterProps::default())
            .build(&mut stack)
            .unwrap();
        let mut p = props("secondary", vec![]);
        p.capacity = CapacityBounds::fixed(2).unwrap();
        let handle = AutoScalingGroupBuilder::new("SecondaryM4", p, &vpc)
            .join_cluster(&cluster)
            .build(&mut stack)
            .unwrap();

        let template = stack.resource(&handle.launch_template).unwrap();
        assert!(template.referenced_ids().contains(&&cluster.cluster));
        assert!(handle.scaling_policies.is_empty());
    }
}
