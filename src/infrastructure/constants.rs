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

/// Template format
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Resource types
pub const TYPE_VPC: &str = "AWS::EC2::VPC";
pub const TYPE_SUBNET: &str = "AWS::EC2::Subnet";
pub const TYPE_ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
pub const TYPE_ROUTE: &str = "AWS::EC2::Route";
pub const TYPE_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
pub const TYPE_INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
pub const TYPE_GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
pub const TYPE_EIP: &str = "AWS::EC2::EIP";
pub const TYPE_NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
pub const TYPE_SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
pub const TYPE_SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";
pub const TYPE_LAUNCH_TEMPLATE: &str = "AWS::EC2::LaunchTemplate";
pub const TYPE_ECS_CLUSTER: &str = "AWS::ECS::Cluster";
pub const TYPE_ECS_SERVICE: &str = "AWS::ECS::Service";
pub const TYPE_ECS_TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
pub const TYPE_DB_INSTANCE: &str = "AWS::RDS::DBInstance";
pub const TYPE_DB_SUBNET_GROUP: &str = "AWS::RDS::DBSubnetGroup";
pub const TYPE_LOAD_BALANCER: &str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
pub const TYPE_TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
pub const TYPE_LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
pub const TYPE_SCALABLE_TARGET: &str = "AWS::ApplicationAutoScaling::ScalableTarget";
pub const TYPE_APP_SCALING_POLICY: &str = "AWS::ApplicationAutoScaling::ScalingPolicy";
pub const TYPE_AUTO_SCALING_GROUP: &str = "AWS::AutoScaling::AutoScalingGroup";
pub const TYPE_ASG_SCALING_POLICY: &str = "AWS::AutoScaling::ScalingPolicy";
pub const TYPE_IAM_ROLE: &str = "AWS::IAM::Role";
pub const TYPE_INSTANCE_PROFILE: &str = "AWS::IAM::InstanceProfile";
pub const TYPE_LOG_GROUP: &str = "AWS::Logs::LogGroup";

/// Attributes each resource type exposes to `GetAtt`.
pub const RESOURCE_ATTRIBUTES: &[(&str, &[&str])] = &[
    (TYPE_VPC, &["CidrBlock", "DefaultSecurityGroup", "VpcId"]),
    (TYPE_SUBNET, &["AvailabilityZone", "SubnetId", "VpcId"]),
    (TYPE_EIP, &["AllocationId", "PublicIp"]),
    (TYPE_SECURITY_GROUP, &["GroupId", "VpcId"]),
    (TYPE_LAUNCH_TEMPLATE, &["LatestVersionNumber", "DefaultVersionNumber", "LaunchTemplateId"]),
    (TYPE_ECS_CLUSTER, &["Arn"]),
    (TYPE_ECS_SERVICE, &["Name", "ServiceArn"]),
    (TYPE_ECS_TASK_DEFINITION, &["TaskDefinitionArn"]),
    (TYPE_DB_INSTANCE, &["Endpoint.Address", "Endpoint.Port", "DBInstanceArn"]),
    (TYPE_LOAD_BALANCER, &["DNSName", "LoadBalancerArn", "LoadBalancerFullName", "CanonicalHostedZoneID"]),
    (TYPE_TARGET_GROUP, &["TargetGroupArn", "TargetGroupFullName"]),
    (TYPE_LISTENER, &["ListenerArn"]),
    (TYPE_IAM_ROLE, &["Arn", "RoleId"]),
    (TYPE_INSTANCE_PROFILE, &["Arn"]),
    (TYPE_LOG_GROUP, &["Arn"]),
];

pub fn known_attributes(resource_type: &str) -> &'static [&'static str] {
    RESOURCE_ATTRIBUTES
        .iter()
        .find(|(ty, _)| *ty == resource_type)
        .map(|(_, attrs)| *attrs)
        .unwrap_or(&[])
}

/// Network configuration
pub const ANY_IPV4: &str = "0.0.0.0/0";
/// Egress rule that matches nothing; replaces the implicit allow-all.
pub const DISALLOW_ALL_CIDR: &str = "255.255.255.255/32";
pub const DISALLOW_ALL_FROM_PORT: i64 = 252;
pub const DISALLOW_ALL_TO_PORT: i64 = 86;

/// Tags
pub const TAG_NAME: &str = "Name";
pub const TAG_ROLE: &str = "Role";
pub const TAG_SUBNET_NAME: &str = "aws-cdk:subnet-name";
pub const TAG_SUBNET_TYPE: &str = "aws-cdk:subnet-type";

/// Service principals
pub const PRINCIPAL_ECS_TASKS: &str = "ecs-tasks.amazonaws.com";
pub const PRINCIPAL_EC2: &str = "ec2.amazonaws.com";

/// Managed policies (suffix after `arn:<partition>:iam::aws:policy/`)
pub const POLICY_ECS_TASK_EXECUTION: &str = "service-role/AmazonECSTaskExecutionRolePolicy";
pub const POLICY_ECS_FOR_EC2: &str = "service-role/AmazonEC2ContainerServiceforEC2Role";
pub const POLICY_SSM_MANAGED_INSTANCE: &str = "AmazonSSMManagedInstanceCore";
pub const POLICY_CLOUDWATCH_AGENT: &str = "CloudWatchAgentServerPolicy";

/// Container service defaults
pub const CONTAINER_INSIGHTS_SETTING: &str = "containerInsights";
pub const LAUNCH_TYPE_FARGATE: &str = "FARGATE";
pub const NETWORK_MODE_AWSVPC: &str = "awsvpc";
pub const LISTENER_PORT: u16 = 80;
pub const HEALTH_CHECK_GRACE_PERIOD: i64 = 60;
pub const LOG_RETENTION_DAYS: i64 = 30;

/// Scaling metrics
pub const METRIC_ECS_CPU: &str = "ECSServiceAverageCPUUtilization";
pub const METRIC_ECS_MEMORY: &str = "ECSServiceAverageMemoryUtilization";
pub const METRIC_ASG_CPU: &str = "ASGAverageCPUUtilization";
pub const METRIC_AGENT_NAMESPACE: &str = "CWAgent";
pub const METRIC_AGENT_MEMORY: &str = "mem_used_percent";
pub const AGENT_CONFIG_PATH: &str = "/opt/aws/amazon-cloudwatch-agent/etc/amazon-cloudwatch-agent.json";

/// Database defaults
pub const DB_STORAGE_TYPE: &str = "gp2";

/// Parameter type for public image ids
pub const SSM_IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";

/// Assembly layout
pub const DEFAULT_OUTPUT_DIR: &str = "stack.out";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "1.0";
